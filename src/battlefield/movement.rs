//! Per-unit movement decisions
//!
//! Each round, every unit gets one `MoveDecision` computed against the
//! current field plus the set of cells already reserved by units that moved
//! earlier in the same round. Decisions are staged by the orchestrator and
//! applied in a batch, so no unit observes a half-updated occupancy map.

use std::collections::HashSet;

use crate::ai::targeting::{select_tactical_move_target, MoveGoal};
use crate::battlefield::grid::Battlefield;
use crate::battlefield::pathfinding::find_path;
use crate::battlefield::terrain::CellKind;
use crate::constants::{MIN_FLEE_SPEED, PATH_NODE_BUDGET};
use crate::core::types::{Cell, Side, UnitId};
use crate::units::{nearest_enemy, AttackKind, Unit};

/// Where a unit wants to end the movement phase, and who it intends to
/// attack from there (informational; the attack phase re-targets).
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveDecision {
    pub dest: Option<Cell>,
    pub target: Option<UnitId>,
}

/// True when an intact fortress wall column lies between `a` and `b` with no
/// destroyed gate in the straddled span. Only melee and reach attacks care;
/// missiles and spells arc over the wall.
pub fn wall_blocks_contact(field: &Battlefield, a: Cell, b: Cell) -> bool {
    let Some(siege) = field.siege.as_ref() else {
        return false;
    };
    let wall_x = siege.wall_x;
    let crossing = (a.x < wall_x && b.x > wall_x) || (a.x > wall_x && b.x < wall_x);
    if !crossing {
        return false;
    }
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    for y in y0..=y1 {
        let c = Cell::new(wall_x, y);
        if field.is_passable(c) {
            return false;
        }
    }
    true
}

/// Compute this unit's move for the round. `reserved` holds destination
/// cells already claimed by earlier movers this round.
pub fn compute_move(
    units: &[Unit],
    field: &Battlefield,
    uid: UnitId,
    reserved: &HashSet<Cell>,
) -> MoveDecision {
    let unit = &units[uid.index()];
    let Some(pos) = unit.position else {
        return MoveDecision::default();
    };

    let ally_cells = ally_occupied_cells(units, field, unit.side, uid);

    if unit.fleeing {
        return flee_move(field, unit, pos, &ally_cells, reserved);
    }

    if unit.speed == 0 {
        return MoveDecision::default();
    }

    // Rampart shooters defending an active siege stand their ground.
    if let Some(siege) = field.siege.as_ref() {
        if siege.defender == unit.side
            && !siege.all_gates_destroyed()
            && unit.is_ranged_or_caster()
            && field.kind(pos) == CellKind::Rampart
        {
            return MoveDecision::default();
        }
    }

    // Attackers already hammering a gate stand fast; the gate phase will
    // spend their attack.
    if let Some(siege) = field.siege.as_ref() {
        if siege.defender != unit.side && !unit.weapons.is_empty() {
            let gate_dist = siege
                .intact_gates()
                .map(|(g, _)| pos.manhattan(&g))
                .min();
            if let Some(gd) = gate_dist {
                if gd <= unit.max_range() {
                    let enemy_closer = nearest_enemy(units, uid)
                        .and_then(|e| units[e.index()].position)
                        .is_some_and(|ep| pos.manhattan(&ep) < gd);
                    if !enemy_closer {
                        return MoveDecision::default();
                    }
                }
            }
        }
    }

    // Already in range of the nearest enemy: hold and fight, unless contact
    // would have to pass through an intact wall.
    if let Some(enemy_id) = nearest_enemy(units, uid) {
        let enemy = &units[enemy_id.index()];
        if let Some(epos) = enemy.position {
            let range = unit.threat_range();
            if pos.manhattan(&epos) <= range {
                let needs_contact = matches!(
                    unit.attack_kind(),
                    AttackKind::Melee | AttackKind::Reach
                );
                if !needs_contact || !wall_blocks_contact(field, pos, epos) {
                    return MoveDecision {
                        dest: None,
                        target: Some(enemy_id),
                    };
                }
            }
        }
    }

    // Follow the commander's order toward a goal.
    let goal = select_tactical_move_target(units, field, uid);
    let (goal_cell, intended_target) = match goal {
        Some(MoveGoal::Unit(target_id)) => {
            let target = &units[target_id.index()];
            match target.position {
                Some(tpos) => {
                    let attack_pos = find_best_attack_position(field, unit, tpos, reserved);
                    (attack_pos.unwrap_or(tpos), Some(target_id))
                }
                None => return fallback_move(units, field, unit, pos, reserved),
            }
        }
        Some(MoveGoal::Cell(c)) => (c, None),
        None => return fallback_move(units, field, unit, pos, reserved),
    };

    if goal_cell == pos {
        return MoveDecision::default();
    }

    let path = find_path(field, pos, goal_cell, &ally_cells, reserved, PATH_NODE_BUDGET);
    if let Some(dest) = advance_along(field, unit, &path, unit.speed as usize, reserved) {
        return MoveDecision {
            dest: Some(dest),
            target: intended_target,
        };
    }

    // No usable path: siege attackers grind toward the gates, everyone else
    // shuffles laterally toward the fight.
    if let Some(decision) = siege_fallback(field, unit, pos, &ally_cells, reserved) {
        return decision;
    }
    fallback_move(units, field, unit, pos, reserved)
}

/// Cells held by living allies of `side`, excluding the moving unit itself.
fn ally_occupied_cells(
    units: &[Unit],
    field: &Battlefield,
    side: Side,
    uid: UnitId,
) -> HashSet<Cell> {
    field
        .occupied_cells()
        .filter(|(_, id)| {
            *id != uid && {
                let u = &units[id.index()];
                u.side == side && u.alive
            }
        })
        .map(|(c, _)| c)
        .collect()
}

fn flee_move(
    field: &Battlefield,
    unit: &Unit,
    pos: Cell,
    ally_cells: &HashSet<Cell>,
    reserved: &HashSet<Cell>,
) -> MoveDecision {
    let flee_speed = unit.speed.max(MIN_FLEE_SPEED) as usize;
    let goal = Cell::new(unit.side.flee_x(field.width), pos.y);
    if goal != pos {
        let path = find_path(field, pos, goal, ally_cells, reserved, PATH_NODE_BUDGET);
        if let Some(dest) = advance_along(field, unit, &path, flee_speed, reserved) {
            return MoveDecision {
                dest: Some(dest),
                target: None,
            };
        }
    }
    // Edge row blocked: take any free step that gets closer to the edge.
    let step = pos
        .neighbors8()
        .into_iter()
        .filter(|c| !reserved.contains(c) && field.can_place(unit.footprint, *c, Some(unit.id)))
        .min_by_key(|c| ((c.x - goal.x).abs(), (c.y - pos.y).abs(), *c));
    match step {
        Some(c) if (c.x - goal.x).abs() < (pos.x - goal.x).abs() => MoveDecision {
            dest: Some(c),
            target: None,
        },
        _ => MoveDecision::default(),
    }
}

/// Walk the path backwards from the furthest cell within `steps`, returning
/// the first cell the unit can actually stand on.
fn advance_along(
    field: &Battlefield,
    unit: &Unit,
    path: &[Cell],
    steps: usize,
    reserved: &HashSet<Cell>,
) -> Option<Cell> {
    let limit = steps.min(path.len());
    for i in (0..limit).rev() {
        let c = path[i];
        if !reserved.contains(&c) && field.can_place(unit.footprint, c, Some(unit.id)) {
            return Some(c);
        }
    }
    None
}

/// Pick a cell to attack `target_pos` from: within weapon range, preferring
/// free cells close to the attacker and near its assigned lane. While every
/// gate still stands, siege attackers never pick cells beyond the wall.
fn find_best_attack_position(
    field: &Battlefield,
    unit: &Unit,
    target_pos: Cell,
    reserved: &HashSet<Cell>,
) -> Option<Cell> {
    let pos = unit.position?;
    let range = unit.threat_range().max(1);
    let lane = unit.order.and_then(|o| o.lane).unwrap_or(pos.y);

    let behind_wall = |c: Cell| -> bool {
        match field.siege.as_ref() {
            Some(siege) if siege.defender != unit.side && !siege.any_gate_destroyed() => {
                match unit.side {
                    Side::Left => c.x > siege.wall_x,
                    Side::Right => c.x < siege.wall_x,
                }
            }
            _ => false,
        }
    };

    let mut candidates: Vec<Cell> = Vec::new();
    for dx in -range..=range {
        let rem = range - dx.abs();
        for dy in -rem..=rem {
            let c = Cell::new(target_pos.x + dx, target_pos.y + dy);
            if c == target_pos || !field.is_passable(c) || reserved.contains(&c) {
                continue;
            }
            if behind_wall(c) {
                continue;
            }
            candidates.push(c);
        }
    }
    candidates.sort_by_key(|c| {
        (
            !field.is_free_for(*c, Some(unit.id)),
            pos.chebyshev(c),
            (c.y - lane).abs(),
            *c,
        )
    });
    candidates.first().copied().or(Some(target_pos))
}

/// When an attacker's direct path is blocked by the fortress, route through a
/// breach, queue up at an intact gate, or skirt sideways toward the gate row.
fn siege_fallback(
    field: &Battlefield,
    unit: &Unit,
    pos: Cell,
    ally_cells: &HashSet<Cell>,
    reserved: &HashSet<Cell>,
) -> Option<MoveDecision> {
    let siege = field.siege.as_ref()?;
    if siege.defender == unit.side {
        return None;
    }

    // Breach first.
    let breach = siege.breaches().min_by_key(|c| (pos.manhattan(c), *c));
    if let Some(b) = breach {
        let path = find_path(field, pos, b, ally_cells, reserved, PATH_NODE_BUDGET);
        if let Some(dest) = advance_along(field, unit, &path, unit.speed as usize, reserved) {
            return Some(MoveDecision {
                dest: Some(dest),
                target: None,
            });
        }
    }

    // Queue up adjacent to the nearest intact gate, on the attacker's side.
    let toward = match unit.side {
        Side::Left => -1,
        Side::Right => 1,
    };
    let gate = siege
        .intact_gates()
        .map(|(c, _)| c)
        .min_by_key(|c| (pos.manhattan(c), *c));
    if let Some(g) = gate {
        let stand = Cell::new(g.x + toward, g.y);
        if stand != pos {
            let path = find_path(field, pos, stand, ally_cells, reserved, PATH_NODE_BUDGET);
            if let Some(dest) = advance_along(field, unit, &path, unit.speed as usize, reserved) {
                return Some(MoveDecision {
                    dest: Some(dest),
                    target: None,
                });
            }
        }
        // Gate row jammed: shift laterally toward the gate's row.
        return Some(lateral_advance(field, unit, pos, g, reserved));
    }
    None
}

/// No path at all: pick the free neighbor that best trades progress toward
/// the objective against drifting off lane. Progress is weighted heavily so
/// retreating is a last resort.
fn lateral_advance(
    field: &Battlefield,
    unit: &Unit,
    pos: Cell,
    objective: Cell,
    reserved: &HashSet<Cell>,
) -> MoveDecision {
    let lane = unit.order.and_then(|o| o.lane).unwrap_or(objective.y);
    let best = pos
        .neighbors8()
        .into_iter()
        .filter(|c| !reserved.contains(c) && field.can_place(unit.footprint, *c, Some(unit.id)))
        .max_by_key(|c| {
            let progress = pos.manhattan(&objective) - c.manhattan(&objective);
            (progress * 3 - (c.y - lane).abs(), std::cmp::Reverse(*c))
        });
    MoveDecision {
        dest: best,
        target: None,
    }
}

fn fallback_move(
    units: &[Unit],
    field: &Battlefield,
    unit: &Unit,
    pos: Cell,
    reserved: &HashSet<Cell>,
) -> MoveDecision {
    let Some(enemy_id) = nearest_enemy(units, unit.id) else {
        return MoveDecision::default();
    };
    let Some(epos) = units[enemy_id.index()].position else {
        return MoveDecision::default();
    };
    lateral_advance(field, unit, pos, epos, reserved)
}
