//! Unit value objects and roster queries
//!
//! Units are created by the external roster builder, mutated every round by
//! movement, combat, and morale logic, and never removed from the roster
//! vector: death and flight are flags, so `UnitId` stays a stable index.

pub mod spell;
pub mod weapon;

use serde::{Deserialize, Serialize};

use crate::ai::orders::TacticalOrder;
use crate::constants::{RANGED_THRESHOLD, REACH_THRESHOLD};
use crate::core::types::{Cell, Side, UnitId};
use crate::units::spell::Spell;
use crate::units::weapon::Weapon;

/// Footprint in cells, anchored at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Footprint {
    #[default]
    Single, // 1x1
    Large,     // 2x2
    Monstrous, // 2x4 (wide x tall)
}

impl Footprint {
    pub fn dims(self) -> (i32, i32) {
        match self {
            Footprint::Single => (1, 1),
            Footprint::Large => (2, 2),
            Footprint::Monstrous => (2, 4),
        }
    }

    /// Every cell covered when anchored at `anchor`.
    pub fn cells(self, anchor: Cell) -> Vec<Cell> {
        let (w, h) = self.dims();
        let mut out = Vec::with_capacity((w * h) as usize);
        for dx in 0..w {
            for dy in 0..h {
                out.push(Cell::new(anchor.x + dx, anchor.y + dy));
            }
        }
        out
    }
}

/// Deployment row preference, used by placement and the screening order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Front,
    Mid,
    Back,
}

/// Attack classification derived from the longest weapon range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackKind {
    Melee,
    Reach,
    Ranged,
    Spell,
}

/// Derived morale/status state, for reporting and tests. The underlying
/// representation is the explicit flag fields on `Unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoraleState {
    Steady,
    Afraid,
    Fleeing,
    Downed,
    Dead,
}

/// Temporary save improvement from an armor spell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArmorBuff {
    pub amount: i32,
    pub rounds_left: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    /// Unit type name for report grouping; supplied by the roster builder.
    pub archetype: String,
    pub side: Side,
    /// None once removed from the field (fully dead or fled).
    pub position: Option<Cell>,
    pub footprint: Footprint,
    pub role: Role,

    pub hp: i32,
    pub max_hp: i32,
    pub speed: i32,
    pub base_morale: i32,
    pub morale_bonus: i32,
    pub morale_malus: i32,
    pub save: i32,

    pub weapons: Vec<Weapon>,
    pub spells: Vec<Spell>,
    pub casts_per_round: u32,

    // Status flags
    pub alive: bool,
    pub fleeing: bool,
    pub afraid: bool,
    pub fled: bool,
    /// Recovery rounds remaining while downed; 0 when not downed.
    pub down_timer: u32,

    // One-shot morale machine fields, initialized at construction
    pub fear_malus_applied: bool,
    pub half_casualty_malus_applied: bool,
    pub severe_casualty_malus_applied: bool,

    // Capabilities
    pub fear_aura: i32,
    pub awe: i32,
    /// Percent of max hp healed per round; nonzero enables the downed state.
    pub regeneration: i32,
    pub blood_vengeance: i32,
    pub encouragement_range: i32,
    pub immune_mind: bool,
    pub can_charge: bool,
    pub phalanx: bool,

    // Recomputed / transient state
    pub armor_buff: Option<ArmorBuff>,
    /// Rampart + phalanx save improvement, recomputed each round.
    pub position_save_bonus: i32,
    /// Consecutive rounds spent fleeing on the map edge.
    pub edge_rounds: u32,
    pub order: Option<TacticalOrder>,
}

impl Unit {
    pub fn new(
        id: UnitId,
        name: &str,
        archetype: &str,
        side: Side,
        hp: i32,
        speed: i32,
        morale: i32,
        save: i32,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            archetype: archetype.to_string(),
            side,
            position: None,
            footprint: Footprint::Single,
            role: Role::Front,
            hp,
            max_hp: hp,
            speed,
            base_morale: morale,
            morale_bonus: 0,
            morale_malus: 0,
            save,
            weapons: Vec::new(),
            spells: Vec::new(),
            casts_per_round: 1,
            alive: true,
            fleeing: false,
            afraid: false,
            fled: false,
            down_timer: 0,
            fear_malus_applied: false,
            half_casualty_malus_applied: false,
            severe_casualty_malus_applied: false,
            fear_aura: 0,
            awe: 0,
            regeneration: 0,
            blood_vengeance: 0,
            encouragement_range: 0,
            immune_mind: false,
            can_charge: false,
            phalanx: false,
            armor_buff: None,
            position_save_bonus: 0,
            edge_rounds: 0,
            order: None,
        }
    }

    pub fn with_weapons(mut self, weapons: Vec<Weapon>) -> Self {
        self.weapons = weapons;
        self
    }

    pub fn with_spells(mut self, spells: Vec<Spell>) -> Self {
        self.spells = spells;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    /// Longest weapon range; 1 for a unit with no weapons (spells aside).
    pub fn max_range(&self) -> i32 {
        self.weapons.iter().map(|w| w.range).max().unwrap_or(1)
    }

    /// Longest range counting both weapons and spells.
    pub fn threat_range(&self) -> i32 {
        let spell_range = self.spells.iter().map(|s| s.range).max().unwrap_or(0);
        self.max_range().max(spell_range)
    }

    pub fn attack_kind(&self) -> AttackKind {
        if !self.spells.is_empty() {
            AttackKind::Spell
        } else if self.max_range() >= RANGED_THRESHOLD {
            AttackKind::Ranged
        } else if self.max_range() >= REACH_THRESHOLD {
            AttackKind::Reach
        } else {
            AttackKind::Melee
        }
    }

    pub fn is_ranged_or_caster(&self) -> bool {
        self.max_range() >= RANGED_THRESHOLD || !self.spells.is_empty()
    }

    /// Never below 0, never above base + bonus.
    pub fn effective_morale(&self) -> i32 {
        (self.base_morale + self.morale_bonus - self.morale_malus).max(0)
    }

    /// Save threshold after positional bonuses, floored at 1. Armor buffs
    /// mutate `save` directly and revert on expiry.
    pub fn effective_save(&self) -> i32 {
        (self.save - self.position_save_bonus).max(1)
    }

    /// Still participating: on the field, either alive or recovering.
    pub fn on_field(&self) -> bool {
        self.position.is_some() && (self.alive || self.down_timer > 0)
    }

    pub fn is_wounded(&self) -> bool {
        self.hp < ((self.max_hp as f32) * crate::constants::WOUNDED_HP_FRACTION) as i32
    }

    pub fn morale_state(&self) -> MoraleState {
        if !self.alive && self.down_timer > 0 {
            MoraleState::Downed
        } else if !self.alive {
            MoraleState::Dead
        } else if self.fleeing {
            MoraleState::Fleeing
        } else if self.afraid {
            MoraleState::Afraid
        } else {
            MoraleState::Steady
        }
    }
}

/// Nearest living enemy of `unit` by manhattan distance, ties by identity
/// order. Off-field units never match.
pub fn nearest_enemy(units: &[Unit], unit_id: UnitId) -> Option<UnitId> {
    let unit = &units[unit_id.index()];
    let pos = unit.position?;
    units
        .iter()
        .filter(|e| e.side != unit.side && e.alive)
        .filter_map(|e| e.position.map(|p| (e.id, p)))
        .min_by_key(|(id, p)| (pos.manhattan(p), *id))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::weapon::DamageSpec;

    fn sword() -> Weapon {
        Weapon::new("sword", 2, 3, 3, 0, DamageSpec::Fixed(1), 1)
    }

    fn bow() -> Weapon {
        Weapon::new("bow", 1, 3, 4, 0, DamageSpec::Fixed(1), 9)
    }

    fn unit(id: u32, side: Side) -> Unit {
        Unit::new(UnitId(id), "u", "Infantry", side, 4, 3, 4, 5).with_weapons(vec![sword()])
    }

    #[test]
    fn test_attack_kind_from_range() {
        let melee = unit(0, Side::Left);
        assert_eq!(melee.attack_kind(), AttackKind::Melee);

        let mut reach = unit(1, Side::Left);
        reach.weapons[0].range = 2;
        assert_eq!(reach.attack_kind(), AttackKind::Reach);

        let ranged = unit(2, Side::Left).with_weapons(vec![bow()]);
        assert_eq!(ranged.attack_kind(), AttackKind::Ranged);

        let caster = unit(3, Side::Left)
            .with_spells(vec![Spell::heal("mend", 6, 2)]);
        assert_eq!(caster.attack_kind(), AttackKind::Spell);
    }

    #[test]
    fn test_effective_morale_bounds() {
        let mut u = unit(0, Side::Left);
        u.morale_malus = 10;
        assert_eq!(u.effective_morale(), 0);
        u.morale_malus = 0;
        u.morale_bonus = 1;
        assert_eq!(u.effective_morale(), u.base_morale + 1);
    }

    #[test]
    fn test_effective_save_floors_at_one() {
        let mut u = unit(0, Side::Left);
        u.save = 2;
        u.position_save_bonus = 5;
        assert_eq!(u.effective_save(), 1);
    }

    #[test]
    fn test_footprint_cells() {
        let cells = Footprint::Monstrous.cells(Cell::new(3, 3));
        assert_eq!(cells.len(), 8);
        assert!(cells.contains(&Cell::new(3, 3)));
        assert!(cells.contains(&Cell::new(4, 6)));
        assert!(!cells.contains(&Cell::new(5, 3)));
    }

    #[test]
    fn test_nearest_enemy_prefers_identity_on_ties() {
        let mut units = vec![unit(0, Side::Left), unit(1, Side::Right), unit(2, Side::Right)];
        units[0].position = Some(Cell::new(5, 5));
        units[1].position = Some(Cell::new(8, 5));
        units[2].position = Some(Cell::new(2, 5)); // same distance 3
        assert_eq!(nearest_enemy(&units, UnitId(0)), Some(UnitId(1)));
    }

    #[test]
    fn test_nearest_enemy_skips_dead() {
        let mut units = vec![unit(0, Side::Left), unit(1, Side::Right), unit(2, Side::Right)];
        units[0].position = Some(Cell::new(5, 5));
        units[1].position = Some(Cell::new(6, 5));
        units[1].alive = false;
        units[2].position = Some(Cell::new(9, 5));
        assert_eq!(nearest_enemy(&units, UnitId(0)), Some(UnitId(2)));
    }

    #[test]
    fn test_morale_state_derivation() {
        let mut u = unit(0, Side::Left);
        assert_eq!(u.morale_state(), MoraleState::Steady);
        u.afraid = true;
        assert_eq!(u.morale_state(), MoraleState::Afraid);
        u.fleeing = true;
        assert_eq!(u.morale_state(), MoraleState::Fleeing);
        u.alive = false;
        u.down_timer = 3;
        assert_eq!(u.morale_state(), MoraleState::Downed);
        u.down_timer = 0;
        assert_eq!(u.morale_state(), MoraleState::Dead);
    }

}
