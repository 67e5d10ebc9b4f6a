//! Battlefield: terrain grid, occupancy, pathfinding, movement decisions

pub mod grid;
pub mod maps;
pub mod movement;
pub mod pathfinding;
pub mod terrain;

pub use grid::Battlefield;
pub use movement::MoveDecision;
pub use terrain::{CellKind, SiegeLayout, TempWall};
