//! Army commanders: style classification, danger ranking, order issue
//!
//! One commander per side. Every round it re-reads the field and reissues a
//! tactical order to each of its living units. Orders are advisory; the
//! movement and targeting layers adapt them to what the field allows.

use serde::{Deserialize, Serialize};

use crate::battlefield::grid::Battlefield;
use crate::battlefield::terrain::CellKind;
use crate::constants::{
    AGGRESSIVE_RANGED_FRACTION, FAST_SPEED_THRESHOLD, FLANKER_FAST_FRACTION,
    LONG_RANGE_THRESHOLD, RANGED_HEAVY_FRACTION, RANGED_THRESHOLD,
};
use crate::core::types::{Cell, Side, UnitId};
use crate::ai::orders::TacticalOrder;
use crate::units::{AttackKind, Role, Unit};

/// Doctrine derived from army composition at deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmyStyle {
    /// Enough fast units to win with wide envelopment.
    Flanker,
    /// Firepower army: screen the shooters, let them grind.
    RangedHeavy,
    /// Almost no shooters: close distance and swing.
    Aggressive,
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commander {
    pub side: Side,
    pub style: ArmyStyle,
}

impl Commander {
    /// Classify the army by its composition fractions.
    pub fn new(side: Side, units: &[Unit]) -> Self {
        let own: Vec<&Unit> = units.iter().filter(|u| u.side == side).collect();
        let n = own.len().max(1) as f32;
        let fast = own
            .iter()
            .filter(|u| u.speed >= FAST_SPEED_THRESHOLD)
            .count() as f32
            / n;
        let ranged = own.iter().filter(|u| u.is_ranged_or_caster()).count() as f32 / n;

        let style = if fast >= FLANKER_FAST_FRACTION {
            ArmyStyle::Flanker
        } else if ranged >= RANGED_HEAVY_FRACTION {
            ArmyStyle::RangedHeavy
        } else if ranged <= AGGRESSIVE_RANGED_FRACTION {
            ArmyStyle::Aggressive
        } else {
            ArmyStyle::Balanced
        };
        Self { side, style }
    }

    /// Reissue orders for every living unit of this side.
    pub fn issue_orders(&self, units: &mut [Unit], field: &Battlefield) {
        let defending_siege = field
            .siege
            .as_ref()
            .is_some_and(|s| s.defender == self.side);
        if defending_siege {
            self.issue_siege_defense(units, field);
        } else {
            self.issue_standard(units, field);
        }
    }

    fn own_ids(&self, units: &[Unit]) -> Vec<UnitId> {
        units
            .iter()
            .filter(|u| u.side == self.side && u.alive && !u.fleeing && u.position.is_some())
            .map(|u| u.id)
            .collect()
    }

    /// Enemies sorted by how dangerous they are to leave alive, most
    /// dangerous first. Ties break by identity so the ranking is stable.
    pub fn rank_targets(&self, units: &[Unit]) -> Vec<UnitId> {
        let mut ranked: Vec<(i32, UnitId)> = units
            .iter()
            .filter(|u| u.side != self.side && u.alive && u.position.is_some())
            .map(|u| (danger_score(u), u.id))
            .collect();
        ranked.sort_by_key(|(score, id)| (std::cmp::Reverse(*score), *id));
        ranked.into_iter().map(|(_, id)| id).collect()
    }

    fn issue_standard(&self, units: &mut [Unit], field: &Battlefield) {
        let ranked = self.rank_targets(units);
        let own = self.own_ids(units);
        if ranked.is_empty() || own.is_empty() {
            return;
        }

        let enemy_positions: Vec<Cell> = units
            .iter()
            .filter(|u| u.side != self.side && u.alive)
            .filter_map(|u| u.position)
            .collect();
        let enemy_center = mean_cell(&enemy_positions);
        let lanes = assign_lanes(field.height, enemy_center.y, own.len());

        let ranged_center = mean_cell(
            &own.iter()
                .map(|id| &units[id.index()])
                .filter(|u| u.is_ranged_or_caster())
                .filter_map(|u| u.position)
                .collect::<Vec<_>>(),
        );
        let melee_center = mean_cell(
            &own.iter()
                .map(|id| &units[id.index()])
                .filter(|u| matches!(u.attack_kind(), AttackKind::Melee | AttackKind::Reach))
                .filter_map(|u| u.position)
                .collect::<Vec<_>>(),
        );

        for (i, id) in own.iter().enumerate() {
            let unit = &units[id.index()];
            let pos = match unit.position {
                Some(p) => p,
                None => continue,
            };
            let lane = lanes[i % lanes.len()];

            let order = if unit.speed >= FAST_SPEED_THRESHOLD
                && matches!(self.style, ArmyStyle::Flanker | ArmyStyle::Balanced)
            {
                self.flanker_order(units, &ranked, enemy_center, field, i)
            } else if unit.is_ranged_or_caster() {
                self.ranged_order(units, unit, pos, &ranked)
            } else if unit.encouragement_range > 0 {
                TacticalOrder::hold(Some(melee_center), 1)
            } else if self.style == ArmyStyle::RangedHeavy && unit.role == Role::Front {
                self.screen_order(ranged_center, enemy_center)
            } else {
                self.melee_order(units, unit, pos, &ranked)
            };

            units[id.index()].order = Some(order.with_lane(lane));
        }
    }

    /// Fast units hunt the enemy's shooters; with none left they swing wide
    /// around the flank before turning in.
    fn flanker_order(
        &self,
        units: &[Unit],
        ranked: &[UnitId],
        enemy_center: Cell,
        field: &Battlefield,
        index: usize,
    ) -> TacticalOrder {
        let soft_target = ranked
            .iter()
            .find(|id| units[id.index()].is_ranged_or_caster());
        match soft_target {
            Some(id) => TacticalOrder::attack(*id, 2),
            None => {
                let y = if index % 2 == 0 { 3 } else { field.height - 4 };
                TacticalOrder::flank(Cell::new(enemy_center.x, y), 2)
            }
        }
    }

    /// Shooters take the most dangerous enemy already in range, or the
    /// highest-ranked one otherwise.
    fn ranged_order(&self, units: &[Unit], unit: &Unit, pos: Cell, ranked: &[UnitId]) -> TacticalOrder {
        let range = unit.threat_range();
        let in_range = ranked.iter().find(|id| {
            units[id.index()]
                .position
                .is_some_and(|p| pos.manhattan(&p) <= range)
        });
        let target = in_range.or(ranked.first()).copied();
        match target {
            Some(t) => TacticalOrder::attack(t, 2),
            None => TacticalOrder::hold(None, 1),
        }
    }

    /// RangedHeavy front-liners screen ahead of the firing line, weighted
    /// toward the approaching threat.
    fn screen_order(&self, ranged_center: Cell, enemy_center: Cell) -> TacticalOrder {
        let station = Cell::new(
            (ranged_center.x as f32 * 0.4 + enemy_center.x as f32 * 0.6) as i32,
            (ranged_center.y as f32 * 0.4 + enemy_center.y as f32 * 0.6) as i32,
        );
        TacticalOrder::protect(station, 2)
    }

    /// Line infantry picks off wounded enemies in reach, then enemy
    /// officers, then whatever is closest.
    fn melee_order(&self, units: &[Unit], unit: &Unit, pos: Cell, ranked: &[UnitId]) -> TacticalOrder {
        let reach = unit.speed * 2;
        let wounded = units
            .iter()
            .filter(|e| e.side != self.side && e.alive && e.is_wounded())
            .filter_map(|e| e.position.map(|p| (e, p)))
            .filter(|(_, p)| pos.manhattan(p) <= reach)
            .min_by_key(|(e, _)| (e.hp, e.id))
            .map(|(e, _)| e.id);
        if let Some(t) = wounded {
            return TacticalOrder::attack(t, 2);
        }

        let officer = ranked
            .iter()
            .take(3)
            .find(|id| {
                let e = &units[id.index()];
                e.encouragement_range > 0
                    && e.position
                        .is_some_and(|p| pos.manhattan(&p) <= unit.speed * 3)
            })
            .copied();
        if let Some(t) = officer {
            return TacticalOrder::attack(t, 2);
        }

        let nearest = units
            .iter()
            .filter(|e| e.side != self.side && e.alive)
            .filter_map(|e| e.position.map(|p| (e, p)))
            .min_by_key(|(e, p)| (pos.manhattan(p), e.id))
            .map(|(e, _)| e.id);
        match nearest {
            Some(t) => TacticalOrder::attack(t, 1),
            None => TacticalOrder::hold(None, 0),
        }
    }

    /// Garrison doctrine: everything revolves around the wall. Breaches
    /// override all other concerns.
    fn issue_siege_defense(&self, units: &mut [Unit], field: &Battlefield) {
        let Some(siege) = field.siege.clone() else {
            return;
        };
        let own = self.own_ids(units);
        let wall_x = siege.wall_x;
        let inside = |c: Cell| match self.side {
            Side::Left => c.x < wall_x,
            Side::Right => c.x > wall_x,
        };

        // Enemies that have crossed the wall.
        let breachers: Vec<(UnitId, Cell)> = units
            .iter()
            .filter(|u| u.side != self.side && u.alive)
            .filter_map(|u| u.position.map(|p| (u.id, p)))
            .filter(|(_, p)| inside(*p))
            .collect();

        // Enemies hammering a gate from outside.
        let at_gate: Vec<(UnitId, Cell)> = units
            .iter()
            .filter(|u| u.side != self.side && u.alive)
            .filter_map(|u| u.position.map(|p| (u.id, p)))
            .filter(|(_, p)| {
                siege
                    .intact_gates()
                    .any(|(g, _)| p.manhattan(&g) <= 1)
            })
            .collect();

        let rampart_cells: Vec<Cell> = (0..field.width)
            .flat_map(|x| (0..field.height).map(move |y| Cell::new(x, y)))
            .filter(|c| field.kind(*c) == CellKind::Rampart)
            .collect();
        let stairs: Vec<Cell> = (0..field.width)
            .flat_map(|x| (0..field.height).map(move |y| Cell::new(x, y)))
            .filter(|c| field.kind(*c) == CellKind::Stairs)
            .collect();

        for id in own {
            let unit = &units[id.index()];
            let pos = match unit.position {
                Some(p) => p,
                None => continue,
            };
            let on_rampart = field.kind(pos) == CellKind::Rampart;
            let shooter = unit.is_ranged_or_caster();

            let order = if let Some((breacher, _)) = breachers
                .iter()
                .min_by_key(|(bid, bp)| (pos.manhattan(bp), *bid))
                .copied()
            {
                // Wall is compromised where they stand: converge on them.
                TacticalOrder::attack(breacher, 6)
            } else if shooter && on_rampart {
                let target = at_gate
                    .iter()
                    .min_by_key(|(tid, tp)| (pos.manhattan(tp), *tid))
                    .map(|(tid, _)| *tid)
                    .or_else(|| near_wall_enemy(units, self.side, wall_x, pos))
                    .or_else(|| nearest_enemy_of(units, self.side, pos));
                match target {
                    Some(t) => TacticalOrder::attack(t, 3),
                    None => TacticalOrder::hold(None, 1),
                }
            } else if shooter {
                // Climb to a free rampart cell and shoot from there.
                let perch = rampart_cells
                    .iter()
                    .filter(|c| field.is_free_for(**c, Some(id)))
                    .min_by_key(|c| (pos.manhattan(c), **c))
                    .copied();
                TacticalOrder::hold(perch, 2)
            } else if on_rampart {
                // Rampart melee guards the stairs against climbers.
                let guard = stairs
                    .iter()
                    .min_by_key(|c| (pos.manhattan(c), **c))
                    .copied();
                TacticalOrder::hold(guard, 2)
            } else if let Some((t, _)) = at_gate
                .iter()
                .min_by_key(|(tid, tp)| (pos.manhattan(tp), *tid))
                .copied()
            {
                // Ground melee stands ready behind the gate under assault.
                TacticalOrder::attack(t, 4)
            } else {
                TacticalOrder::hold(None, 1)
            };
            units[id.index()].order = Some(order);
        }
    }
}

/// How urgent it is to kill this enemy: officers and casters first, then
/// long-range firepower, then cheap kills.
fn danger_score(unit: &Unit) -> i32 {
    let mut score = 0;
    if unit.encouragement_range > 0 {
        score += 5;
    }
    if !unit.spells.is_empty() {
        score += 4;
    }
    if unit.max_range() >= LONG_RANGE_THRESHOLD {
        score += 3;
    } else if unit.max_range() >= RANGED_THRESHOLD {
        score += 2;
    }
    if unit.is_wounded() {
        score += 2;
    }
    if unit.awe > 0 {
        score += 1;
    }
    score
}

fn mean_cell(cells: &[Cell]) -> Cell {
    if cells.is_empty() {
        return Cell::new(0, 0);
    }
    let n = cells.len() as i32;
    Cell::new(
        cells.iter().map(|c| c.x).sum::<i32>() / n,
        cells.iter().map(|c| c.y).sum::<i32>() / n,
    )
}

/// Advance rows centered on the enemy's mean row, spread so the army does
/// not funnel into a single column of cells.
fn assign_lanes(height: i32, center_y: i32, mobile_count: usize) -> Vec<i32> {
    let num_lanes = 3.max((height - 4).min(mobile_count as i32)).max(1);
    let spacing = 1.max((height - 6) / num_lanes);
    (0..num_lanes)
        .map(|i| {
            let offset = (i - num_lanes / 2) * spacing;
            (center_y + offset).clamp(2, height - 3)
        })
        .collect()
}

fn nearest_enemy_of(units: &[Unit], side: Side, pos: Cell) -> Option<UnitId> {
    units
        .iter()
        .filter(|e| e.side != side && e.alive)
        .filter_map(|e| e.position.map(|p| (e, p)))
        .min_by_key(|(e, p)| (pos.manhattan(p), e.id))
        .map(|(e, _)| e.id)
}

/// Closest enemy within ten columns of the wall, as seen from a rampart.
fn near_wall_enemy(units: &[Unit], side: Side, wall_x: i32, pos: Cell) -> Option<UnitId> {
    units
        .iter()
        .filter(|e| e.side != side && e.alive)
        .filter_map(|e| e.position.map(|p| (e, p)))
        .filter(|(_, p)| (p.x - wall_x).abs() <= 10)
        .min_by_key(|(e, p)| (pos.manhattan(p), e.id))
        .map(|(e, _)| e.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::orders::OrderKind;
    use crate::units::spell::Spell;
    use crate::units::weapon::{DamageSpec, Weapon};

    fn melee(id: u32, side: Side, pos: Cell) -> Unit {
        let mut u = Unit::new(UnitId(id), "u", "Infantry", side, 4, 3, 4, 5).with_weapons(vec![
            Weapon::new("sword", 2, 3, 3, 0, DamageSpec::Fixed(1), 1),
        ]);
        u.position = Some(pos);
        u
    }

    fn archer(id: u32, side: Side, pos: Cell) -> Unit {
        let mut u = Unit::new(UnitId(id), "a", "Archers", side, 3, 3, 4, 6).with_weapons(vec![
            Weapon::new("bow", 1, 3, 4, 0, DamageSpec::Fixed(1), 9),
        ]);
        u.position = Some(pos);
        u
    }

    fn rider(id: u32, side: Side, pos: Cell) -> Unit {
        let mut u = Unit::new(UnitId(id), "r", "Cavalry", side, 6, 8, 4, 4).with_weapons(vec![
            Weapon::new("lance", 2, 3, 3, 1, DamageSpec::Fixed(2), 1),
        ]);
        u.position = Some(pos);
        u
    }

    #[test]
    fn test_style_classification() {
        let flankers: Vec<Unit> = (0..4).map(|i| rider(i, Side::Left, Cell::new(1, i as i32))).collect();
        assert_eq!(Commander::new(Side::Left, &flankers).style, ArmyStyle::Flanker);

        let mut shooty: Vec<Unit> = (0..3).map(|i| archer(i, Side::Left, Cell::new(1, i as i32))).collect();
        shooty.push(melee(3, Side::Left, Cell::new(1, 4)));
        shooty.push(melee(4, Side::Left, Cell::new(1, 5)));
        assert_eq!(Commander::new(Side::Left, &shooty).style, ArmyStyle::RangedHeavy);

        let brutes: Vec<Unit> = (0..5).map(|i| melee(i, Side::Left, Cell::new(1, i as i32))).collect();
        assert_eq!(Commander::new(Side::Left, &brutes).style, ArmyStyle::Aggressive);

        let mut mixed: Vec<Unit> = (0..3).map(|i| melee(i, Side::Left, Cell::new(1, i as i32))).collect();
        mixed.push(archer(3, Side::Left, Cell::new(1, 4)));
        assert_eq!(Commander::new(Side::Left, &mixed).style, ArmyStyle::Balanced);
    }

    #[test]
    fn test_danger_ranking_puts_officers_first() {
        let mut units = vec![
            melee(0, Side::Left, Cell::new(1, 1)),
            melee(1, Side::Right, Cell::new(10, 1)),
            archer(2, Side::Right, Cell::new(10, 2)),
        ];
        let mut officer = melee(3, Side::Right, Cell::new(10, 3));
        officer.encouragement_range = 5;
        units.push(officer);

        let cmd = Commander::new(Side::Left, &units);
        let ranked = cmd.rank_targets(&units);
        assert_eq!(ranked[0], UnitId(3));
        assert_eq!(ranked[1], UnitId(2));
        assert_eq!(ranked[2], UnitId(1));
    }

    #[test]
    fn test_caster_outranks_plain_archer() {
        let mut units = vec![melee(0, Side::Left, Cell::new(1, 1))];
        units.push(archer(1, Side::Right, Cell::new(10, 1)));
        let mut mage = melee(2, Side::Right, Cell::new(10, 2));
        mage.spells = vec![Spell::projectile("bolt", 10, 3, DamageSpec::Fixed(2), 1)];
        units.push(mage);

        let cmd = Commander::new(Side::Left, &units);
        assert_eq!(cmd.rank_targets(&units)[0], UnitId(2));
    }

    #[test]
    fn test_every_living_unit_gets_an_order() {
        let mut units = vec![
            melee(0, Side::Left, Cell::new(1, 2)),
            archer(1, Side::Left, Cell::new(1, 4)),
            melee(2, Side::Right, Cell::new(18, 3)),
        ];
        let mut f = Battlefield::new(20, 12).unwrap();
        for u in &units {
            f.place(u.id, u.footprint, u.position.unwrap());
        }
        let cmd = Commander::new(Side::Left, &units);
        cmd.issue_orders(&mut units, &f);
        assert!(units[0].order.is_some());
        assert!(units[1].order.is_some());
        assert!(units[2].order.is_none());
    }

    #[test]
    fn test_fast_units_hunt_enemy_shooters() {
        let mut units = vec![
            rider(0, Side::Left, Cell::new(1, 2)),
            melee(1, Side::Right, Cell::new(18, 3)),
            archer(2, Side::Right, Cell::new(19, 3)),
        ];
        let mut f = Battlefield::new(24, 12).unwrap();
        for u in &units {
            f.place(u.id, u.footprint, u.position.unwrap());
        }
        let cmd = Commander::new(Side::Left, &units);
        cmd.issue_orders(&mut units, &f);
        match units[0].order.unwrap().kind {
            OrderKind::Attack { target } => assert_eq!(target, UnitId(2)),
            other => panic!("expected attack on the archer, got {other:?}"),
        }
    }

    #[test]
    fn test_lanes_spread_and_stay_on_field() {
        let lanes = assign_lanes(30, 15, 10);
        assert!(lanes.len() >= 3);
        for l in &lanes {
            assert!((2..=27).contains(l));
        }
        let distinct: std::collections::HashSet<i32> = lanes.iter().copied().collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_breachers_override_everything() {
        use crate::battlefield::terrain::SiegeLayout;
        use std::collections::BTreeMap;

        let mut units = vec![
            melee(0, Side::Right, Cell::new(16, 3)),
            archer(1, Side::Right, Cell::new(17, 4)),
            melee(2, Side::Left, Cell::new(14, 3)), // past the wall
        ];
        let mut f = Battlefield::new(20, 10).unwrap();
        for y in 0..10 {
            f.set_kind(Cell::new(13, y), CellKind::Wall);
        }
        let mut gates = BTreeMap::new();
        gates.insert(Cell::new(13, 5), 0);
        f.set_kind(Cell::new(13, 5), CellKind::Gate);
        f.siege = Some(SiegeLayout {
            wall_x: 13,
            gates,
            gate_save: 3,
            defender: Side::Right,
        });
        for u in &units {
            f.place(u.id, u.footprint, u.position.unwrap());
        }
        let cmd = Commander::new(Side::Right, &units);
        cmd.issue_orders(&mut units, &f);
        let order = units[0].order.unwrap();
        assert_eq!(order.priority, 6);
        assert!(matches!(order.kind, OrderKind::Attack { target } if target == UnitId(2)));
    }
}
