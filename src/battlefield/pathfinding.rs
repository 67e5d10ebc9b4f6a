//! A* pathfinding over the battlefield grid
//!
//! Eight-way movement with a chebyshev heuristic. Ally-occupied cells are
//! soft obstacles (cost penalty, steeper near the goal where crowding is
//! worst); reserved destination cells are hard obstacles so two units never
//! path into the same square. Search effort is capped by a node budget.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use ordered_float::OrderedFloat;

use crate::battlefield::grid::Battlefield;
use crate::constants::{
    ALLY_PENALTY_FAR, ALLY_PENALTY_NEAR, CROWD_RADIUS, DIAGONAL_STEP_COST, ORTHOGONAL_STEP_COST,
};
use crate::core::types::Cell;

/// Find a path from `start` to `goal`, excluding `start` and including
/// `goal`. Returns an empty vec when no path is found within `node_budget`
/// expansions. Ties between equal f-costs break by insertion order, so the
/// result is fully determined by the inputs.
pub fn find_path(
    field: &Battlefield,
    start: Cell,
    goal: Cell,
    ally_cells: &HashSet<Cell>,
    reserved: &HashSet<Cell>,
    node_budget: usize,
) -> Vec<Cell> {
    if start == goal || !field.is_passable(goal) || reserved.contains(&goal) {
        return Vec::new();
    }

    let mut frontier: BinaryHeap<Reverse<(OrderedFloat<f32>, u64, Cell)>> = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, f32> = HashMap::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0.0);
    frontier.push(Reverse((
        OrderedFloat(start.chebyshev(&goal) as f32),
        seq,
        start,
    )));

    let mut expanded = 0usize;
    while let Some(Reverse((_, _, current))) = frontier.pop() {
        if current == goal {
            return reconstruct(&came_from, start, goal);
        }
        expanded += 1;
        if expanded > node_budget {
            return Vec::new();
        }
        let current_g = g_score[&current];

        for neighbor in current.neighbors8() {
            if neighbor != goal && (!field.is_passable(neighbor) || reserved.contains(&neighbor)) {
                continue;
            }

            let diagonal = neighbor.x != current.x && neighbor.y != current.y;
            let mut step = if diagonal {
                DIAGONAL_STEP_COST
            } else {
                ORTHOGONAL_STEP_COST
            };
            if neighbor != goal && ally_cells.contains(&neighbor) {
                step += if neighbor.chebyshev(&goal) <= CROWD_RADIUS {
                    ALLY_PENALTY_NEAR
                } else {
                    ALLY_PENALTY_FAR
                };
            }

            let tentative = current_g + step;
            if g_score.get(&neighbor).map_or(true, |g| tentative < *g) {
                g_score.insert(neighbor, tentative);
                came_from.insert(neighbor, current);
                seq += 1;
                let f = tentative + neighbor.chebyshev(&goal) as f32;
                frontier.push(Reverse((OrderedFloat(f), seq, neighbor)));
            }
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from.get(&current) {
        if *prev == start {
            break;
        }
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}
