//! Commander AI: army style classification, threat ranking, order issue

pub mod commander;
pub mod orders;
pub mod targeting;

pub use commander::{ArmyStyle, Commander};
pub use orders::{OrderKind, TacticalOrder};
