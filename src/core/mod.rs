//! Core type definitions and errors shared by every subsystem

pub mod error;
pub mod types;

pub use error::{Result, SimError};
pub use types::{Cell, Side, UnitId};
