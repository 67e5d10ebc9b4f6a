//! Spell definitions and cooldown bookkeeping

use serde::{Deserialize, Serialize};

use crate::units::weapon::DamageSpec;

/// The five spell families the resolution layer knows how to cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellKind {
    /// Single-target bolt: to-hit / to-wound / save against one enemy.
    Projectile,
    /// Square zone centered on the nearest enemy; rolls independently
    /// against every enemy inside.
    Blast,
    /// Fully restores the most-wounded ally in range. No roll.
    Heal,
    /// Temporarily improves an ally's save value, then reverts.
    Armor,
    /// Spawns temporary obstacle cells in front of the nearest enemies.
    ForceWall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    pub kind: SpellKind,
    pub range: i32,
    pub to_hit: i32,
    pub to_wound: i32,
    pub piercing: i32,
    pub damage: DamageSpec,
    /// Rounds between casts.
    pub cooldown: u32,
    /// Rounds until ready again. 0 = ready.
    pub cooldown_left: u32,
    /// Edge length of the blast zone (Blast only).
    pub zone_size: i32,
    /// Save improvement (Armor only).
    pub bonus: i32,
    /// Buff / wall lifetime in rounds.
    pub duration: u32,
    /// Number of obstacle cells raised (ForceWall only).
    pub segments: u32,
}

impl Spell {
    pub fn projectile(name: &str, range: i32, to_hit: i32, damage: DamageSpec, cooldown: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: SpellKind::Projectile,
            range,
            to_hit,
            to_wound: 1,
            piercing: 0,
            damage,
            cooldown,
            cooldown_left: 0,
            zone_size: 0,
            bonus: 0,
            duration: 0,
            segments: 0,
        }
    }

    pub fn blast(
        name: &str,
        range: i32,
        to_hit: i32,
        piercing: i32,
        damage: DamageSpec,
        zone_size: i32,
        cooldown: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: SpellKind::Blast,
            range,
            to_hit,
            to_wound: 1,
            piercing,
            damage,
            cooldown,
            cooldown_left: 0,
            zone_size,
            bonus: 0,
            duration: 0,
            segments: 0,
        }
    }

    pub fn heal(name: &str, range: i32, cooldown: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: SpellKind::Heal,
            range,
            to_hit: 1,
            to_wound: 1,
            piercing: 0,
            damage: DamageSpec::Fixed(0),
            cooldown,
            cooldown_left: 0,
            zone_size: 0,
            bonus: 0,
            duration: 0,
            segments: 0,
        }
    }

    pub fn armor(name: &str, range: i32, bonus: i32, duration: u32, cooldown: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: SpellKind::Armor,
            range,
            to_hit: 1,
            to_wound: 1,
            piercing: 0,
            damage: DamageSpec::Fixed(0),
            cooldown,
            cooldown_left: 0,
            zone_size: 0,
            bonus,
            duration,
            segments: 0,
        }
    }

    pub fn force_wall(name: &str, segments: u32, duration: u32, cooldown: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: SpellKind::ForceWall,
            range: 0,
            to_hit: 1,
            to_wound: 1,
            piercing: 0,
            damage: DamageSpec::Fixed(0),
            cooldown,
            cooldown_left: 0,
            zone_size: 0,
            bonus: 0,
            duration,
            segments,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown_left == 0
    }

    /// Decrement the cooldown counter; called once per round.
    pub fn tick_cooldown(&mut self) {
        self.cooldown_left = self.cooldown_left.saturating_sub(1);
    }

    /// Mark the spell as just cast.
    pub fn expend(&mut self) {
        self.cooldown_left = self.cooldown;
    }
}
