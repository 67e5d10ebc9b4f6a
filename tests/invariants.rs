//! Property tests for the battlefield layer

use std::collections::HashSet;

use proptest::prelude::*;

use shieldwall::battlefield::pathfinding::find_path;
use shieldwall::battlefield::{Battlefield, CellKind};
use shieldwall::constants::PATH_NODE_BUDGET;
use shieldwall::core::types::{Cell, UnitId};
use shieldwall::units::Footprint;

const W: i32 = 16;
const H: i32 = 16;

fn cell() -> impl Strategy<Value = Cell> {
    (0..W, 0..H).prop_map(|(x, y)| Cell::new(x, y))
}

proptest! {
    /// Any returned path is a chain of adjacent, passable cells that starts
    /// next to the origin and ends on the goal.
    #[test]
    fn path_is_a_valid_walk(
        start in cell(),
        goal in cell(),
        obstacles in proptest::collection::hash_set(cell(), 0..40),
    ) {
        let mut f = Battlefield::new(W, H).unwrap();
        for c in &obstacles {
            if *c != start && *c != goal {
                f.set_kind(*c, CellKind::Obstacle);
            }
        }
        let path = find_path(&f, start, goal, &HashSet::new(), &HashSet::new(), PATH_NODE_BUDGET);
        if !path.is_empty() {
            prop_assert_eq!(*path.last().unwrap(), goal);
            prop_assert!(!path.contains(&start));
            let mut prev = start;
            for c in &path {
                prop_assert_eq!(prev.chebyshev(c), 1, "gap between {:?} and {:?}", prev, c);
                prop_assert!(f.is_passable(*c));
                prev = *c;
            }
        }
    }

    /// Reserved cells are hard obstacles: no path ever steps on one.
    #[test]
    fn reserved_cells_never_entered(
        start in cell(),
        goal in cell(),
        reserved in proptest::collection::hash_set(cell(), 0..30),
    ) {
        let f = Battlefield::new(W, H).unwrap();
        let mut reserved = reserved;
        reserved.remove(&start);
        let path = find_path(&f, start, goal, &HashSet::new(), &reserved, PATH_NODE_BUDGET);
        for c in &path {
            prop_assert!(!reserved.contains(c), "path entered reserved {:?}", c);
        }
    }

    /// Ally-occupied cells cost extra but stay traversable, so a path must
    /// still exist whenever one exists without allies.
    #[test]
    fn ally_penalty_never_disconnects(
        start in cell(),
        goal in cell(),
        allies in proptest::collection::hash_set(cell(), 0..30),
    ) {
        let f = Battlefield::new(W, H).unwrap();
        let clear = find_path(&f, start, goal, &HashSet::new(), &HashSet::new(), PATH_NODE_BUDGET);
        let crowded = find_path(&f, start, goal, &allies, &HashSet::new(), PATH_NODE_BUDGET);
        prop_assert_eq!(clear.is_empty(), crowded.is_empty());
    }

    /// A multi-cell unit always owns exactly its footprint, wherever it has
    /// been moved.
    #[test]
    fn footprint_moves_are_atomic(anchors in proptest::collection::vec(cell(), 1..20)) {
        let mut f = Battlefield::new(W, H).unwrap();
        let id = UnitId(0);
        let fp = Footprint::Large;
        let mut current: Option<Cell> = None;
        for anchor in anchors {
            if f.can_place(fp, anchor, Some(id)) {
                f.move_unit(id, fp, anchor);
                current = Some(anchor);
            }
            if let Some(cur) = current {
                let owned: Vec<Cell> = f
                    .occupied_cells()
                    .filter(|(_, o)| *o == id)
                    .map(|(c, _)| c)
                    .collect();
                prop_assert_eq!(owned.len(), fp.cells(cur).len());
                for c in owned {
                    prop_assert!(fp.cells(cur).contains(&c));
                }
            }
        }
    }
}
