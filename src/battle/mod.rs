//! The round orchestrator
//!
//! A `Battle` owns the field, the combined roster, and the RNG. Each call
//! to `simulate_round` runs the fixed phase sequence: rout, orders,
//! movement (staged and batch-applied), morale, positional bonuses,
//! charges, spells, gates, attacks, cleanup. Phase order and the per-phase
//! identity-order iteration are what make a seed fully reproducible.

pub mod events;
pub mod report;

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::ai::commander::Commander;
use crate::ai::targeting::select_tactical_target;
use crate::battle::events::BattleEvent;
use crate::battle::report::BattleReport;
use crate::battlefield::grid::Battlefield;
use crate::battlefield::movement::{compute_move, wall_blocks_contact};
use crate::battlefield::pathfinding::find_path;
use crate::battlefield::terrain::CellKind;
use crate::combat::attack::{attack_gate, charge_strike, perform_attacks};
use crate::combat::morale::{
    apply_fear_auras, check_casualty_thresholds, check_combat_stress, check_forced_rout,
    update_encouragement,
};
use crate::combat::spells::cast_spells;
use crate::constants::{
    CHARGE_RANGE_FACTOR, COHESION_LEAD_THRESHOLD, DOWN_HEAL_MAX, DOWN_HEAL_MIN, ENGAGED_SLACK,
    FLEE_EDGE_ROUNDS, PATH_NODE_BUDGET, PHALANX_SAVE_BONUS, RAMPART_SAVE_BONUS,
};
use crate::core::error::{Result, SimError};
use crate::core::types::{Cell, Side, UnitId};
use crate::units::{Role, Unit};

/// Battle state after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ongoing,
    Winner(Side),
    Draw,
}

pub struct Battle {
    pub field: Battlefield,
    pub units: Vec<Unit>,
    pub round: u32,
    rng: ChaCha8Rng,
    events: Vec<BattleEvent>,
    initial: [usize; 2],
    commanders: [Commander; 2],
}

impl Battle {
    /// Build a battle from a field and two rosters. Unit ids are reassigned
    /// to roster slots (left army first) and both armies are deployed in
    /// role columns on their own edge.
    pub fn new(
        field: Battlefield,
        left: Vec<Unit>,
        right: Vec<Unit>,
        seed: u64,
    ) -> Result<Self> {
        let initial = [left.len(), right.len()];
        let mut units = Vec::with_capacity(left.len() + right.len());
        for (i, mut u) in left.into_iter().chain(right).enumerate() {
            u.id = UnitId(i as u32);
            units.push(u);
        }
        let commanders = [
            Commander::new(Side::Left, &units),
            Commander::new(Side::Right, &units),
        ];
        let mut battle = Self {
            field,
            units,
            round: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: Vec::new(),
            initial,
            commanders,
        };
        battle.deploy(Side::Left);
        battle.deploy(Side::Right);
        info!(
            left = battle.initial[0],
            right = battle.initial[1],
            left_style = ?battle.commanders[0].style,
            right_style = ?battle.commanders[1].style,
            seed,
            "battle deployed"
        );
        Ok(battle)
    }

    /// Place one army in three role columns on its edge, overflowing
    /// outward when a column fills up.
    fn deploy(&mut self, side: Side) {
        let w = self.field.width;
        let outward: i32 = match side {
            Side::Left => -1,
            Side::Right => 1,
        };
        let base_x = |role: Role| -> i32 {
            match (side, role) {
                (Side::Left, Role::Front) => 8,
                (Side::Left, Role::Mid) => 5,
                (Side::Left, Role::Back) => 2,
                (Side::Right, Role::Front) => w - 9,
                (Side::Right, Role::Mid) => w - 6,
                (Side::Right, Role::Back) => w - 3,
            }
        };

        let ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.side == side)
            .map(|u| u.id)
            .collect();
        for role in [Role::Front, Role::Mid, Role::Back] {
            let column: Vec<UnitId> = ids
                .iter()
                .filter(|id| self.units[id.index()].role == role)
                .copied()
                .collect();
            let mut x = base_x(role).clamp(1, w - 2);
            let count = column.len() as i32;
            let mut y = ((self.field.height - count) / 2).max(1);
            for id in column {
                let footprint = self.units[id.index()].footprint;
                let mut placed = false;
                let mut attempts = 0;
                while !placed && attempts < self.field.width * self.field.height {
                    let anchor = Cell::new(x, y);
                    if self.field.can_place(footprint, anchor, None) {
                        self.field.place(id, footprint, anchor);
                        self.units[id.index()].position = Some(anchor);
                        placed = true;
                    }
                    y += 1;
                    if y >= self.field.height - 1 {
                        y = 1;
                        x = (x + outward).clamp(1, w - 2);
                    }
                    attempts += 1;
                }
            }
        }
    }

    /// Run one full round.
    pub fn simulate_round(&mut self) -> Result<()> {
        self.round += 1;
        debug!(round = self.round, "round start");

        // 1. Armies with no will left rout wholesale.
        check_forced_rout(&mut self.units, Side::Left);
        check_forced_rout(&mut self.units, Side::Right);

        // 2. Commanders read the field and reissue orders.
        let commanders = self.commanders.clone();
        for cmd in &commanders {
            cmd.issue_orders(&mut self.units, &self.field);
        }

        // 3-4. Movement: partition, three reservation passes, batch apply.
        self.movement_phase();

        // 5. Morale.
        update_encouragement(&mut self.units);
        check_casualty_thresholds(&mut self.units, Side::Left, self.initial[0], &mut self.rng);
        check_casualty_thresholds(&mut self.units, Side::Right, self.initial[1], &mut self.rng);
        apply_fear_auras(&mut self.units);
        check_combat_stress(&mut self.units, &mut self.rng);

        // 6. Positional save bonuses follow from where everyone now stands.
        self.update_position_bonuses();

        // 7. Charges.
        self.charge_phase();

        // 8. Spells.
        let caster_ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.alive && !u.spells.is_empty())
            .map(|u| u.id)
            .collect();
        for id in caster_ids {
            cast_spells(
                &mut self.units,
                &mut self.field,
                id,
                &mut self.rng,
                &mut self.events,
            );
        }

        // 9-10. Gates, then everyone else swings.
        let gate_busy = self.gate_phase();
        self.attack_phase(&gate_busy)?;

        // 11. Cleanup.
        self.cleanup_phase();
        Ok(())
    }

    /// Distance from a unit to its nearest living enemy.
    fn engagement_distance(&self, id: UnitId) -> Option<i32> {
        let unit = &self.units[id.index()];
        let pos = unit.position?;
        self.units
            .iter()
            .filter(|e| e.side != unit.side && e.alive)
            .filter_map(|e| e.position.map(|p| pos.manhattan(&p)))
            .min()
    }

    fn movement_phase(&mut self) {
        let mover_ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.alive && u.position.is_some())
            .map(|u| u.id)
            .collect();

        // Partition: holders and runners first, then units already in the
        // fight closest-first, then the approach march farthest-first so
        // the rear ranks don't wall in the van.
        let mut statics = Vec::new();
        let mut engaged = Vec::new();
        let mut approaching = Vec::new();
        for id in &mover_ids {
            let unit = &self.units[id.index()];
            let dist = self.engagement_distance(*id);
            if unit.fleeing || unit.speed == 0 {
                statics.push(*id);
            } else if self.is_rampart_defender(*id)
                || dist.is_some_and(|d| d <= unit.threat_range() + ENGAGED_SLACK)
            {
                engaged.push(*id);
            } else {
                approaching.push(*id);
            }
        }
        engaged.sort_by_key(|id| (self.engagement_distance(*id).unwrap_or(i32::MAX), *id));
        approaching.sort_by_key(|id| {
            (
                std::cmp::Reverse(self.engagement_distance(*id).unwrap_or(0)),
                *id,
            )
        });

        // Cohesion: units too far ahead of their army's median engagement
        // distance slow down for a round so the line stays a line.
        let medians = [
            self.median_engagement(Side::Left),
            self.median_engagement(Side::Right),
        ];
        let mut throttled: Vec<(UnitId, i32)> = Vec::new();
        for id in &approaching {
            let unit = &self.units[id.index()];
            let Some(dist) = self.engagement_distance(*id) else {
                continue;
            };
            let median = medians[unit.side.index()];
            if median - dist > COHESION_LEAD_THRESHOLD && unit.speed > 1 {
                throttled.push((*id, unit.speed));
                self.units[id.index()].speed -= 1;
            }
        }

        let mut reserved: HashSet<Cell> = HashSet::new();
        let mut staged: Vec<(UnitId, Cell)> = Vec::new();
        for group in [statics, engaged, approaching] {
            for id in group {
                let decision = compute_move(&self.units, &self.field, id, &reserved);
                let unit = &self.units[id.index()];
                let anchor = decision
                    .dest
                    .unwrap_or_else(|| unit.position.unwrap_or_default());
                for c in unit.footprint.cells(anchor) {
                    reserved.insert(c);
                }
                if let Some(dest) = decision.dest {
                    staged.push((id, dest));
                }
            }
        }

        for (id, speed) in throttled {
            self.units[id.index()].speed = speed;
        }

        // Batch apply: nobody saw a half-moved world while deciding.
        for (id, dest) in staged {
            let footprint = self.units[id.index()].footprint;
            self.field.move_unit(id, footprint, dest);
            self.units[id.index()].position = Some(dest);
        }
    }

    fn is_rampart_defender(&self, id: UnitId) -> bool {
        let unit = &self.units[id.index()];
        let Some(pos) = unit.position else {
            return false;
        };
        self.field.siege.as_ref().is_some_and(|s| {
            s.defender == unit.side
                && !s.all_gates_destroyed()
                && unit.is_ranged_or_caster()
                && self.field.kind(pos) == CellKind::Rampart
        })
    }

    fn median_engagement(&self, side: Side) -> i32 {
        let mut dists: Vec<i32> = self
            .units
            .iter()
            .filter(|u| u.side == side && u.alive && u.position.is_some())
            .filter_map(|u| self.engagement_distance(u.id))
            .collect();
        if dists.is_empty() {
            return 0;
        }
        dists.sort_unstable();
        dists[dists.len() / 2]
    }

    fn update_position_bonuses(&mut self) {
        let snapshot: Vec<(Side, Option<Cell>, bool, bool)> = self
            .units
            .iter()
            .map(|u| (u.side, u.position, u.alive, u.phalanx))
            .collect();
        for i in 0..self.units.len() {
            let unit = &self.units[i];
            let Some(pos) = unit.position else {
                self.units[i].position_save_bonus = 0;
                continue;
            };
            let mut bonus = 0;
            if self.field.kind(pos) == CellKind::Rampart {
                bonus += RAMPART_SAVE_BONUS;
            }
            if unit.phalanx {
                let braced = snapshot.iter().enumerate().any(|(j, (side, p, alive, ph))| {
                    j != i
                        && *alive
                        && *ph
                        && *side == unit.side
                        && p.is_some_and(|p| pos.chebyshev(&p) == 1)
                });
                if braced {
                    bonus += PHALANX_SAVE_BONUS;
                }
            }
            self.units[i].position_save_bonus = bonus;
        }
    }

    /// Cavalry and beasts leap the last stretch: out of weapon range but
    /// within twice their speed, they close instantly and get a free swing.
    /// The charge is a bonus action; chargers still attack this round.
    fn charge_phase(&mut self) {
        let charger_ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.alive && !u.fleeing && u.can_charge && u.position.is_some())
            .map(|u| u.id)
            .collect();

        for id in charger_ids {
            let Some(target) = select_tactical_target(&self.units, id) else {
                continue;
            };
            let unit = &self.units[id.index()];
            let (Some(pos), Some(tpos)) =
                (unit.position, self.units[target.index()].position)
            else {
                continue;
            };
            let dist = pos.manhattan(&tpos);
            let reach = unit.speed * CHARGE_RANGE_FACTOR;
            if dist <= unit.max_range() || dist > reach {
                continue;
            }
            if wall_blocks_contact(&self.field, pos, tpos) {
                continue;
            }

            let footprint = unit.footprint;
            let landing = tpos
                .neighbors8()
                .into_iter()
                .filter(|c| self.field.can_place(footprint, *c, Some(id)))
                .min_by_key(|c| (pos.chebyshev(c), *c));
            let Some(landing) = landing else { continue };

            let path = find_path(
                &self.field,
                pos,
                landing,
                &HashSet::new(),
                &HashSet::new(),
                PATH_NODE_BUDGET,
            );
            if path.is_empty() || path.len() as i32 > reach {
                continue;
            }

            debug!(charger = ?id, target = ?target, from = ?pos, to = ?landing, "charge");
            self.field.move_unit(id, footprint, landing);
            self.units[id.index()].position = Some(landing);
            charge_strike(
                &mut self.units,
                &self.field,
                id,
                target,
                &mut self.rng,
                &mut self.events,
            );
        }
    }

    /// Siege attackers in reach of an intact gate batter it down, unless an
    /// enemy stands closer than the gate. Returns the ids that spent their
    /// attack on a gate.
    fn gate_phase(&mut self) -> HashSet<UnitId> {
        let mut busy = HashSet::new();
        let Some(siege) = self.field.siege.clone() else {
            return busy;
        };

        let attacker_ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| {
                u.side != siege.defender && u.alive && !u.fleeing && u.position.is_some()
                    && !u.weapons.is_empty()
            })
            .map(|u| u.id)
            .collect();

        for id in attacker_ids {
            let unit = &self.units[id.index()];
            let pos = match unit.position {
                Some(p) => p,
                None => continue,
            };
            let Some((gate, gate_dist)) = siege
                .intact_gates()
                .map(|(g, _)| (g, pos.manhattan(&g)))
                .min_by_key(|(g, d)| (*d, *g))
            else {
                continue;
            };
            if gate_dist > unit.max_range() {
                continue;
            }
            let enemy_closer = self
                .engagement_distance(id)
                .is_some_and(|d| d < gate_dist);
            if enemy_closer {
                continue;
            }
            attack_gate(
                &self.units,
                &mut self.field,
                id,
                gate,
                &mut self.rng,
                &mut self.events,
            );
            busy.insert(id);
        }
        busy
    }

    fn attack_phase(&mut self, gate_busy: &HashSet<UnitId>) -> Result<()> {
        let fighter_ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.alive && !u.fleeing && u.position.is_some())
            .map(|u| u.id)
            .collect();

        for id in fighter_ids {
            if gate_busy.contains(&id) {
                continue;
            }
            let unit = &self.units[id.index()];
            if !unit.alive {
                continue;
            }
            if unit.weapons.is_empty() {
                if unit.spells.is_empty() {
                    return Err(SimError::UnarmedUnit(id));
                }
                continue;
            }
            let Some(target) = select_tactical_target(&self.units, id) else {
                continue;
            };
            perform_attacks(
                &mut self.units,
                &self.field,
                id,
                target,
                &mut self.rng,
                &mut self.events,
            );
        }
        Ok(())
    }

    fn cleanup_phase(&mut self) {
        // Downed recovery and regeneration.
        for i in 0..self.units.len() {
            let u = &mut self.units[i];
            if !u.alive && u.down_timer > 0 {
                u.down_timer -= 1;
                u.hp += self.rng.gen_range(DOWN_HEAL_MIN..=DOWN_HEAL_MAX);
                if u.hp >= 1 {
                    u.alive = true;
                    u.down_timer = 0;
                    debug!(unit = ?u.id, hp = u.hp, "recovered from downed");
                } else if u.down_timer == 0 {
                    // Timer ran out before the wounds closed.
                    debug!(unit = ?u.id, "succumbed while down");
                }
            } else if u.alive && u.regeneration > 0 && u.hp < u.max_hp {
                let heal = (u.max_hp * u.regeneration / 100).max(1);
                u.hp = (u.hp + heal).min(u.max_hp);
            }
        }

        // Armor buffs wind down and revert.
        for u in &mut self.units {
            if let Some(buff) = u.armor_buff.as_mut() {
                buff.rounds_left = buff.rounds_left.saturating_sub(1);
                if buff.rounds_left == 0 {
                    u.save += buff.amount;
                    u.armor_buff = None;
                }
            }
        }

        self.field.expire_temp_walls();

        // The dead leave the field; the downed stay where they dropped.
        let dead_ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| !u.alive && u.down_timer == 0 && u.position.is_some())
            .map(|u| u.id)
            .collect();
        for id in dead_ids {
            self.field.remove(id);
            self.units[id.index()].position = None;
        }

        // Fleeing units that reach their edge and hold it leave the field.
        let width = self.field.width;
        let mut fled_ids = Vec::new();
        for u in &mut self.units {
            if !u.alive || !u.fleeing {
                continue;
            }
            let Some(pos) = u.position else { continue };
            if pos.x == u.side.flee_x(width) {
                u.edge_rounds += 1;
                if u.edge_rounds >= FLEE_EDGE_ROUNDS {
                    u.fled = true;
                    u.position = None;
                    fled_ids.push(u.id);
                    debug!(unit = ?u.id, "fled the field");
                }
            } else {
                u.edge_rounds = 0;
            }
        }
        for id in fled_ids {
            self.field.remove(id);
        }
    }

    /// On-field strength per side; a side with nothing left has lost.
    pub fn outcome(&self) -> Outcome {
        let strength = |side: Side| {
            self.units
                .iter()
                .filter(|u| u.side == side && u.on_field())
                .count()
        };
        match (strength(Side::Left), strength(Side::Right)) {
            (0, 0) => Outcome::Draw,
            (0, _) => Outcome::Winner(Side::Right),
            (_, 0) => Outcome::Winner(Side::Left),
            _ => Outcome::Ongoing,
        }
    }

    pub fn report(&self) -> BattleReport {
        let winner = match self.outcome() {
            Outcome::Winner(side) => Some(side),
            _ => None,
        };
        BattleReport::new(&self.units, self.initial, self.round, winner)
    }

    /// Hand the accumulated visual events to the caller.
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::weapon::{DamageSpec, Weapon};

    fn infantry(name: &str, side: Side) -> Unit {
        Unit::new(UnitId(0), name, "Infantry", side, 4, 3, 4, 5).with_weapons(vec![Weapon::new(
            "sword",
            2,
            3,
            3,
            0,
            DamageSpec::Fixed(1),
            1,
        )])
    }

    fn small_battle() -> Battle {
        let field = Battlefield::new(30, 20).unwrap();
        let left = vec![infantry("a1", Side::Left), infantry("a2", Side::Left)];
        let right = vec![infantry("b1", Side::Right), infantry("b2", Side::Right)];
        Battle::new(field, left, right, 7).unwrap()
    }

    #[test]
    fn test_ids_are_roster_slots() {
        let b = small_battle();
        for (i, u) in b.units.iter().enumerate() {
            assert_eq!(u.id.index(), i);
        }
        assert_eq!(b.units[0].side, Side::Left);
        assert_eq!(b.units[2].side, Side::Right);
    }

    #[test]
    fn test_deployment_is_collision_free() {
        let b = small_battle();
        let mut seen = HashSet::new();
        for u in &b.units {
            let pos = u.position.expect("deployed");
            assert!(seen.insert(pos), "two units on {pos:?}");
            assert_eq!(b.field.occupant(pos), Some(u.id));
        }
    }

    #[test]
    fn test_round_counter_advances() {
        let mut b = small_battle();
        b.simulate_round().unwrap();
        b.simulate_round().unwrap();
        assert_eq!(b.round, 2);
    }

    #[test]
    fn test_occupancy_stays_consistent_over_rounds() {
        let mut b = small_battle();
        for _ in 0..10 {
            b.simulate_round().unwrap();
            for u in &b.units {
                if let Some(pos) = u.position {
                    assert_eq!(b.field.occupant(pos), Some(u.id));
                }
            }
            for (cell, id) in b.field.occupied_cells() {
                let u = &b.units[id.index()];
                assert!(u.footprint.cells(u.position.unwrap()).contains(&cell));
            }
        }
    }

    #[test]
    fn test_unarmed_unit_is_an_error() {
        let field = Battlefield::new(30, 20).unwrap();
        let pacifist = Unit::new(UnitId(0), "p", "Civilian", Side::Left, 4, 3, 4, 5);
        let left = vec![pacifist];
        let right = vec![infantry("b1", Side::Right)];
        let mut b = Battle::new(field, left, right, 1).unwrap();
        let err = b.simulate_round().unwrap_err();
        assert!(matches!(err, SimError::UnarmedUnit(_)));
    }

    #[test]
    fn test_downed_unit_heals_each_round_while_down() {
        let mut b = small_battle();
        b.units[0].regeneration = 20;
        b.units[0].max_hp = 20;
        b.units[0].alive = false;
        b.units[0].down_timer = 6;
        b.units[0].hp = -8;
        b.simulate_round().unwrap();
        let u = &b.units[0];
        assert!(u.hp > -8, "closed some wounds during the round");
        assert!(u.hp <= -4, "a single round heals at most 4");
        assert!(!u.alive);
        assert_eq!(u.down_timer, 5);
        assert!(u.position.is_some());
    }

    #[test]
    fn test_downed_unit_rises_the_moment_hp_reaches_one() {
        let mut b = small_battle();
        b.units[0].regeneration = 20;
        b.units[0].alive = false;
        b.units[0].down_timer = 6;
        b.units[0].hp = 0;
        b.simulate_round().unwrap();
        let u = &b.units[0];
        assert!(u.alive, "any heal from 0 hp is enough to rise");
        assert!(u.hp >= 1);
        assert_eq!(u.down_timer, 0);
    }

    #[test]
    fn test_downed_unit_dies_when_the_timer_runs_out() {
        let mut b = small_battle();
        b.units[0].regeneration = 20;
        b.units[0].max_hp = 20;
        b.units[0].alive = false;
        b.units[0].down_timer = 1;
        b.units[0].hp = -8;
        b.simulate_round().unwrap();
        let u = &b.units[0];
        assert!(!u.alive);
        assert_eq!(u.down_timer, 0);
        assert!(u.position.is_none(), "left the field for good");
        assert!(!u.on_field());
    }

    #[test]
    fn test_outcome_draw_when_both_sides_empty() {
        let mut b = small_battle();
        for u in &mut b.units {
            u.alive = false;
            u.position = None;
        }
        assert_eq!(b.outcome(), Outcome::Draw);
    }

    #[test]
    fn test_events_drain_empties_buffer() {
        let mut b = small_battle();
        for _ in 0..8 {
            b.simulate_round().unwrap();
        }
        let _ = b.drain_events();
        assert!(b.drain_events().is_empty());
    }
}
