//! Combat resolution: attacks, spells, morale

pub mod attack;
pub mod morale;
pub mod spells;
