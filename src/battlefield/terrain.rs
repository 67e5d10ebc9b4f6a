//! Terrain cell kinds and the siege layout descriptor

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Cell, Side};

/// What occupies a grid cell besides units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    /// Permanently impassable (rocks, towers).
    Obstacle,
    /// Fortress wall segment. Impassable, cannot be damaged.
    Wall,
    /// Breachable wall segment. Impassable until its hit points reach zero.
    Gate,
    /// Elevated walkway behind the wall. Passable; grants a save bonus.
    Rampart,
    /// Access between ground level and the ramparts. Passable.
    Stairs,
}

impl CellKind {
    /// Passable for movement, before gate damage is considered.
    pub fn base_passable(self) -> bool {
        matches!(self, CellKind::Empty | CellKind::Rampart | CellKind::Stairs)
    }
}

/// Fortification metadata for siege maps. Gate hit points live here rather
/// than in the grid so the grid stays a plain terrain raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiegeLayout {
    /// Column of the fortress wall.
    pub wall_x: i32,
    /// Remaining hit points per gate cell. BTreeMap so iteration order is
    /// fixed by cell coordinates.
    pub gates: BTreeMap<Cell, i32>,
    /// d6 threshold a gate "saves" incoming hits on.
    pub gate_save: i32,
    /// The army defending the fortress.
    pub defender: Side,
}

impl SiegeLayout {
    pub fn gate_destroyed(&self, cell: Cell) -> bool {
        self.gates.get(&cell).is_some_and(|hp| *hp <= 0)
    }

    pub fn any_gate_destroyed(&self) -> bool {
        self.gates.values().any(|hp| *hp <= 0)
    }

    pub fn all_gates_destroyed(&self) -> bool {
        self.gates.values().all(|hp| *hp <= 0)
    }

    /// Intact gate cells, in coordinate order.
    pub fn intact_gates(&self) -> impl Iterator<Item = (Cell, i32)> + '_ {
        self.gates
            .iter()
            .filter(|(_, hp)| **hp > 0)
            .map(|(c, hp)| (*c, *hp))
    }

    /// Destroyed gate cells, in coordinate order.
    pub fn breaches(&self) -> impl Iterator<Item = Cell> + '_ {
        self.gates
            .iter()
            .filter(|(_, hp)| **hp <= 0)
            .map(|(c, _)| *c)
    }
}

/// A force-wall segment raised by a spell; blocks its cell until expiry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TempWall {
    pub cell: Cell,
    pub rounds_left: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_passability() {
        assert!(CellKind::Empty.base_passable());
        assert!(CellKind::Rampart.base_passable());
        assert!(CellKind::Stairs.base_passable());
        assert!(!CellKind::Wall.base_passable());
        assert!(!CellKind::Gate.base_passable());
        assert!(!CellKind::Obstacle.base_passable());
    }

    #[test]
    fn test_gate_state_queries() {
        let mut gates = BTreeMap::new();
        gates.insert(Cell::new(10, 5), 10);
        gates.insert(Cell::new(10, 6), 0);
        let layout = SiegeLayout {
            wall_x: 10,
            gates,
            gate_save: 3,
            defender: Side::Right,
        };
        assert!(layout.gate_destroyed(Cell::new(10, 6)));
        assert!(!layout.gate_destroyed(Cell::new(10, 5)));
        assert!(layout.any_gate_destroyed());
        assert!(!layout.all_gates_destroyed());
        assert_eq!(layout.breaches().collect::<Vec<_>>(), vec![Cell::new(10, 6)]);
        assert_eq!(layout.intact_gates().count(), 1);
    }
}
