//! Shieldwall - deterministic round-based tactical battle simulation
//!
//! Two armies on a discrete grid: units path toward enemies, resolve
//! melee/ranged/magic combat, and react to morale, fear, and siege
//! conditions. Given a fixed seed, every round is reproducible.

pub mod ai;
pub mod battle;
pub mod battlefield;
pub mod combat;
pub mod constants;
pub mod core;
pub mod units;
