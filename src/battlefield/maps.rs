//! Stock map generators

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::battlefield::grid::Battlefield;
use crate::battlefield::terrain::{CellKind, SiegeLayout};
use crate::constants::{GATE_HP, GATE_SAVE, GATE_SPAN, WALL_X_DEN, WALL_X_NUM};
use crate::core::error::Result;
use crate::core::types::{Cell, Side};

/// Open field with a scattering of rocks through the middle. Obstacles stay
/// out of the deployment columns so both armies always fit.
pub fn open_field(width: i32, height: i32, seed: u64) -> Result<Battlefield> {
    let mut field = Battlefield::new(width, height)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let count = (width * height) / 60;
    let (lo, hi) = (width / 3, width * 2 / 3);
    for _ in 0..count {
        let c = Cell::new(rng.gen_range(lo..hi), rng.gen_range(1..height - 1));
        field.set_kind(c, CellKind::Obstacle);
    }
    Ok(field)
}

/// Fortress map: a wall two-thirds of the way across, a gate span in the
/// middle, ramparts and stairs behind it, and towers anchoring the corners.
/// The `defender` army starts behind the wall.
pub fn siege_field(width: i32, height: i32, defender: Side) -> Result<Battlefield> {
    let mut field = Battlefield::new(width, height)?;
    let wall_x = match defender {
        Side::Right => width * WALL_X_NUM / WALL_X_DEN,
        Side::Left => width - width * WALL_X_NUM / WALL_X_DEN,
    };
    let inward: i32 = match defender {
        Side::Right => 1,
        Side::Left => -1,
    };

    for y in 0..height {
        field.set_kind(Cell::new(wall_x, y), CellKind::Wall);
    }

    let mut gates = BTreeMap::new();
    let gate_top = (height - GATE_SPAN) / 2;
    for y in gate_top..gate_top + GATE_SPAN {
        let c = Cell::new(wall_x, y);
        field.set_kind(c, CellKind::Gate);
        gates.insert(c, GATE_HP);
    }

    // Ramparts run along the inside of the wall, stairs at both ends.
    for y in 1..height - 1 {
        field.set_kind(Cell::new(wall_x + inward, y), CellKind::Rampart);
    }
    field.set_kind(Cell::new(wall_x + inward, 0), CellKind::Stairs);
    field.set_kind(Cell::new(wall_x + inward, height - 1), CellKind::Stairs);

    // Towers on the fortress corners.
    for c in [
        Cell::new(wall_x, 0),
        Cell::new(wall_x, height - 1),
    ] {
        field.set_kind(c, CellKind::Obstacle);
    }

    field.siege = Some(SiegeLayout {
        wall_x,
        gates,
        gate_save: GATE_SAVE,
        defender,
    });
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_field_is_reproducible() {
        let a = open_field(40, 30, 5).unwrap();
        let b = open_field(40, 30, 5).unwrap();
        for x in 0..40 {
            for y in 0..30 {
                let c = Cell::new(x, y);
                assert_eq!(a.kind(c), b.kind(c));
            }
        }
    }

    #[test]
    fn test_siege_field_layout() {
        let f = siege_field(40, 30, Side::Right).unwrap();
        let siege = f.siege.as_ref().unwrap();
        assert_eq!(siege.wall_x, 26);
        assert_eq!(siege.gates.len(), GATE_SPAN as usize);
        for (c, hp) in &siege.gates {
            assert_eq!(c.x, 26);
            assert_eq!(*hp, GATE_HP);
            assert!(!f.is_passable(*c));
        }
        // Wall is solid outside the gate span.
        assert_eq!(f.kind(Cell::new(26, 2)), CellKind::Wall);
        // Ramparts behind the wall are passable and distinct.
        assert_eq!(f.kind(Cell::new(27, 5)), CellKind::Rampart);
        assert!(f.is_passable(Cell::new(27, 5)));
        assert_eq!(f.kind(Cell::new(27, 0)), CellKind::Stairs);
    }
}
