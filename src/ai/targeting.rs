//! Order interpretation: turning a tactical order into concrete movement
//! goals and attack targets against the current field state

use crate::ai::orders::OrderKind;
use crate::battlefield::grid::Battlefield;
use crate::constants::{
    FLANK_ARRIVE_RADIUS, HOLD_FIRE_SLACK, PROTECT_ARRIVE_RADIUS, SCREEN_INTERCEPT_RANGE,
};
use crate::core::types::{Cell, UnitId};
use crate::units::{nearest_enemy, Unit};

/// What the movement phase should steer toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveGoal {
    Unit(UnitId),
    Cell(Cell),
}

fn order_target_valid(units: &[Unit], target: UnitId) -> bool {
    let t = &units[target.index()];
    t.alive && t.position.is_some()
}

/// Living enemies within `range` of `pos`, picking the most wounded first
/// and breaking ties by distance then identity.
fn best_enemy_in_range(units: &[Unit], unit: &Unit, pos: Cell, range: i32) -> Option<UnitId> {
    units
        .iter()
        .filter(|e| e.side != unit.side && e.alive)
        .filter_map(|e| e.position.map(|p| (e, p)))
        .filter(|(_, p)| pos.manhattan(p) <= range)
        .min_by_key(|(e, p)| (e.hp, pos.manhattan(p), e.id))
        .map(|(e, _)| e.id)
}

/// Movement goal for this round, interpreting the unit's current order.
pub fn select_tactical_move_target(
    units: &[Unit],
    _field: &Battlefield,
    uid: UnitId,
) -> Option<MoveGoal> {
    let unit = &units[uid.index()];
    let pos = unit.position?;

    match unit.order.map(|o| o.kind) {
        Some(OrderKind::Attack { target }) if order_target_valid(units, target) => {
            Some(MoveGoal::Unit(target))
        }
        Some(OrderKind::Flank { dest }) => {
            if pos.chebyshev(&dest) > FLANK_ARRIVE_RADIUS {
                Some(MoveGoal::Cell(dest))
            } else {
                // Arrived: hunt whatever is closest from the new angle.
                nearest_enemy(units, uid).map(MoveGoal::Unit)
            }
        }
        Some(OrderKind::Protect { dest }) => {
            if pos.chebyshev(&dest) > PROTECT_ARRIVE_RADIUS {
                Some(MoveGoal::Cell(dest))
            } else {
                // On station: intercept anything that comes near the charge.
                let intruder = units
                    .iter()
                    .filter(|e| e.side != unit.side && e.alive)
                    .filter_map(|e| e.position.map(|p| (e, p)))
                    .filter(|(_, p)| dest.manhattan(p) <= SCREEN_INTERCEPT_RANGE)
                    .min_by_key(|(e, p)| (dest.manhattan(p), e.id))
                    .map(|(e, _)| e.id);
                match intruder {
                    Some(id) => Some(MoveGoal::Unit(id)),
                    None => Some(MoveGoal::Cell(pos)),
                }
            }
        }
        Some(OrderKind::Hold { dest }) => {
            let slack_range = unit.threat_range() + HOLD_FIRE_SLACK;
            if let Some(id) = best_enemy_in_range(units, unit, pos, slack_range) {
                return Some(MoveGoal::Unit(id));
            }
            match dest {
                Some(d) if d != pos => Some(MoveGoal::Cell(d)),
                _ => Some(MoveGoal::Cell(pos)),
            }
        }
        // Attack order on a dead target, or no order at all.
        _ => nearest_enemy(units, uid).map(MoveGoal::Unit),
    }
}

/// Attack target for this round. Prefers the ordered target while it is
/// alive and in range, then the most wounded enemy in range, then the
/// nearest enemy (the attack phase skips out-of-range targets).
pub fn select_tactical_target(units: &[Unit], uid: UnitId) -> Option<UnitId> {
    let unit = &units[uid.index()];
    let pos = unit.position?;
    let range = unit.threat_range();

    if let Some(OrderKind::Attack { target }) = unit.order.map(|o| o.kind) {
        if order_target_valid(units, target) {
            let tpos = units[target.index()].position?;
            if pos.manhattan(&tpos) <= range {
                return Some(target);
            }
        }
    }

    best_enemy_in_range(units, unit, pos, range).or_else(|| nearest_enemy(units, uid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::orders::TacticalOrder;
    use crate::core::types::Side;
    use crate::units::weapon::{DamageSpec, Weapon};

    fn unit(id: u32, side: Side, pos: Cell, range: i32) -> Unit {
        let mut u = Unit::new(UnitId(id), "u", "Infantry", side, 4, 3, 4, 5).with_weapons(vec![
            Weapon::new("w", 1, 3, 3, 0, DamageSpec::Fixed(1), range),
        ]);
        u.position = Some(pos);
        u
    }

    fn field() -> Battlefield {
        Battlefield::new(30, 20).unwrap()
    }

    #[test]
    fn test_attack_order_steers_at_target() {
        let mut units = vec![
            unit(0, Side::Left, Cell::new(2, 5), 1),
            unit(1, Side::Right, Cell::new(20, 5), 1),
            unit(2, Side::Right, Cell::new(4, 5), 1),
        ];
        units[0].order = Some(TacticalOrder::attack(UnitId(1), 3));
        let goal = select_tactical_move_target(&units, &field(), UnitId(0));
        assert_eq!(goal, Some(MoveGoal::Unit(UnitId(1))));
    }

    #[test]
    fn test_dead_order_target_falls_back_to_nearest() {
        let mut units = vec![
            unit(0, Side::Left, Cell::new(2, 5), 1),
            unit(1, Side::Right, Cell::new(20, 5), 1),
            unit(2, Side::Right, Cell::new(4, 5), 1),
        ];
        units[0].order = Some(TacticalOrder::attack(UnitId(1), 3));
        units[1].alive = false;
        let goal = select_tactical_move_target(&units, &field(), UnitId(0));
        assert_eq!(goal, Some(MoveGoal::Unit(UnitId(2))));
    }

    #[test]
    fn test_flank_heads_for_dest_until_arrival() {
        let mut units = vec![
            unit(0, Side::Left, Cell::new(2, 5), 1),
            unit(1, Side::Right, Cell::new(25, 5), 1),
        ];
        let dest = Cell::new(20, 2);
        units[0].order = Some(TacticalOrder::flank(dest, 2));
        assert_eq!(
            select_tactical_move_target(&units, &field(), UnitId(0)),
            Some(MoveGoal::Cell(dest))
        );
        units[0].position = Some(Cell::new(18, 3)); // within arrive radius
        assert_eq!(
            select_tactical_move_target(&units, &field(), UnitId(0)),
            Some(MoveGoal::Unit(UnitId(1)))
        );
    }

    #[test]
    fn test_hold_fires_within_slack_only() {
        let mut units = vec![
            unit(0, Side::Left, Cell::new(5, 5), 4),
            unit(1, Side::Right, Cell::new(11, 5), 1),
        ];
        units[0].order = Some(TacticalOrder::hold(None, 1));
        // Distance 6 <= range 4 + slack 2: close enough to advance on.
        assert_eq!(
            select_tactical_move_target(&units, &field(), UnitId(0)),
            Some(MoveGoal::Unit(UnitId(1)))
        );
        units[1].position = Some(Cell::new(12, 5));
        // Distance 7: stay put.
        assert_eq!(
            select_tactical_move_target(&units, &field(), UnitId(0)),
            Some(MoveGoal::Cell(Cell::new(5, 5)))
        );
    }

    #[test]
    fn test_protect_intercepts_intruders_on_station() {
        let mut units = vec![
            unit(0, Side::Left, Cell::new(6, 5), 1),
            unit(1, Side::Right, Cell::new(9, 5), 1),
            unit(2, Side::Right, Cell::new(25, 5), 1),
        ];
        let station = Cell::new(6, 5);
        units[0].order = Some(TacticalOrder::protect(station, 2));
        assert_eq!(
            select_tactical_move_target(&units, &field(), UnitId(0)),
            Some(MoveGoal::Unit(UnitId(1)))
        );
        units[1].position = Some(Cell::new(15, 5)); // out of intercept range
        assert_eq!(
            select_tactical_move_target(&units, &field(), UnitId(0)),
            Some(MoveGoal::Cell(station))
        );
    }

    #[test]
    fn test_attack_target_prefers_wounded_in_range() {
        let mut units = vec![
            unit(0, Side::Left, Cell::new(5, 5), 6),
            unit(1, Side::Right, Cell::new(7, 5), 1),
            unit(2, Side::Right, Cell::new(9, 5), 1),
        ];
        units[2].hp = 1;
        assert_eq!(select_tactical_target(&units, UnitId(0)), Some(UnitId(2)));
    }

    #[test]
    fn test_ordered_target_wins_while_in_range() {
        let mut units = vec![
            unit(0, Side::Left, Cell::new(5, 5), 6),
            unit(1, Side::Right, Cell::new(7, 5), 1),
            unit(2, Side::Right, Cell::new(9, 5), 1),
        ];
        units[2].hp = 1;
        units[0].order = Some(TacticalOrder::attack(UnitId(1), 3));
        assert_eq!(select_tactical_target(&units, UnitId(0)), Some(UnitId(1)));
    }
}
