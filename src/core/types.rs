//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Unique identifier for units: the unit's slot in the battle roster.
///
/// Units are never removed from the roster vector (death and flight are
/// flags), so identity order doubles as the stable tie-break order the
/// commander AI relies on for deterministic target scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which army a unit belongs to. Left deploys on the west edge and flees
/// west; Right deploys east and flees east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// X coordinate of this side's flee edge.
    pub fn flee_x(self, width: i32) -> i32 {
        match self {
            Side::Left => 0,
            Side::Right => width - 1,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// A grid cell. Ordered by (x, y) so ordered collections of cells iterate
/// deterministically.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn chebyshev(&self, other: &Cell) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// The 8 surrounding cells, in a fixed scan order.
    pub fn neighbors8(&self) -> [Cell; 8] {
        let (x, y) = (self.x, self.y);
        [
            Cell::new(x - 1, y - 1),
            Cell::new(x - 1, y),
            Cell::new(x - 1, y + 1),
            Cell::new(x, y - 1),
            Cell::new(x, y + 1),
            Cell::new(x + 1, y - 1),
            Cell::new(x + 1, y),
            Cell::new(x + 1, y + 1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_distance() {
        let a = Cell::new(0, 0);
        let b = Cell::new(3, 4);
        assert_eq!(a.manhattan(&b), 7);
        assert_eq!(b.manhattan(&a), 7);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = Cell::new(0, 0);
        let b = Cell::new(3, 4);
        assert_eq!(a.chebyshev(&b), 4);
    }

    #[test]
    fn test_neighbors8_excludes_center() {
        let c = Cell::new(5, 5);
        let n = c.neighbors8();
        assert_eq!(n.len(), 8);
        assert!(!n.contains(&c));
        for cell in n {
            assert_eq!(c.chebyshev(&cell), 1);
        }
    }

    #[test]
    fn test_flee_edges() {
        assert_eq!(Side::Left.flee_x(40), 0);
        assert_eq!(Side::Right.flee_x(40), 39);
    }

    #[test]
    fn test_cell_ordering_is_x_then_y() {
        let mut cells = vec![Cell::new(2, 0), Cell::new(1, 9), Cell::new(1, 2)];
        cells.sort();
        assert_eq!(
            cells,
            vec![Cell::new(1, 2), Cell::new(1, 9), Cell::new(2, 0)]
        );
    }
}
