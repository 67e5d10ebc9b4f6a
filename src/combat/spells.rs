//! Spell casting resolution
//!
//! A caster ticks its cooldowns, shuffles whatever is ready, and casts up
//! to its per-round allowance. A spell is only expended when it found a
//! target; otherwise the next ready spell gets a chance.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::battle::events::{BattleEvent, ProjectileKind};
use crate::battlefield::grid::Battlefield;
use crate::combat::attack::take_damage;
use crate::constants::SAVE_CAP;
use crate::core::types::{Cell, UnitId};
use crate::units::spell::{Spell, SpellKind};
use crate::units::{ArmorBuff, Unit};

pub fn cast_spells<R: Rng>(
    units: &mut [Unit],
    field: &mut Battlefield,
    caster: UnitId,
    rng: &mut R,
    events: &mut Vec<BattleEvent>,
) {
    {
        let c = &units[caster.index()];
        if !c.alive || c.fleeing || c.position.is_none() || c.spells.is_empty() {
            return;
        }
    }
    for s in &mut units[caster.index()].spells {
        s.tick_cooldown();
    }

    let mut ready: Vec<usize> = units[caster.index()]
        .spells
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_ready())
        .map(|(i, _)| i)
        .collect();
    ready.shuffle(rng);

    let allowance = units[caster.index()].casts_per_round;
    let mut casts = 0;
    for si in ready {
        if casts >= allowance {
            break;
        }
        let spell = units[caster.index()].spells[si].clone();
        let cast = match spell.kind {
            SpellKind::Projectile => cast_projectile(units, caster, &spell, rng, events),
            SpellKind::Blast => cast_blast(units, caster, &spell, rng, events),
            SpellKind::Heal => cast_heal(units, caster, &spell, events),
            SpellKind::Armor => cast_armor(units, caster, &spell, rng, events),
            SpellKind::ForceWall => cast_force_wall(units, field, caster, &spell, events),
        };
        if cast {
            units[caster.index()].spells[si].expend();
            casts += 1;
        }
    }
}

fn caster_pos(units: &[Unit], caster: UnitId) -> Cell {
    units[caster.index()].position.unwrap_or_default()
}

fn nearest_enemy_in_range(units: &[Unit], caster: UnitId, range: i32) -> Option<(UnitId, Cell)> {
    let c = &units[caster.index()];
    let pos = c.position?;
    units
        .iter()
        .filter(|e| e.side != c.side && e.alive)
        .filter_map(|e| e.position.map(|p| (e.id, p)))
        .filter(|(_, p)| pos.manhattan(p) <= range)
        .min_by_key(|(id, p)| (pos.manhattan(p), *id))
}

fn cast_projectile<R: Rng>(
    units: &mut [Unit],
    caster: UnitId,
    spell: &Spell,
    rng: &mut R,
    events: &mut Vec<BattleEvent>,
) -> bool {
    let Some((target, tpos)) = nearest_enemy_in_range(units, caster, spell.range) else {
        return false;
    };
    events.push(BattleEvent::Projectile {
        from: caster_pos(units, caster),
        to: tpos,
        kind: ProjectileKind::Magic,
    });
    if rng.gen_range(1..=6) < spell.to_hit {
        return true;
    }
    if spell.to_wound > 1 && rng.gen_range(1..=6) < spell.to_wound {
        return true;
    }
    let damage = spell.damage.roll(rng);
    take_damage(units, target, damage, Some(caster), rng);
    true
}

fn cast_blast<R: Rng>(
    units: &mut [Unit],
    caster: UnitId,
    spell: &Spell,
    rng: &mut R,
    events: &mut Vec<BattleEvent>,
) -> bool {
    let Some((_, center)) = nearest_enemy_in_range(units, caster, spell.range) else {
        return false;
    };
    let half = spell.zone_size / 2;
    events.push(BattleEvent::Projectile {
        from: caster_pos(units, caster),
        to: center,
        kind: ProjectileKind::Fireball,
    });
    events.push(BattleEvent::AreaEffect {
        center,
        radius: half,
    });

    let side = units[caster.index()].side;
    let victims: Vec<UnitId> = units
        .iter()
        .filter(|e| e.side != side && e.alive)
        .filter_map(|e| e.position.map(|p| (e.id, p)))
        .filter(|(_, p)| (p.x - center.x).abs() <= half && (p.y - center.y).abs() <= half)
        .map(|(id, _)| id)
        .collect();

    for victim in victims {
        if rng.gen_range(1..=6) < spell.to_hit {
            continue;
        }
        if spell.to_wound > 1 && rng.gen_range(1..=6) < spell.to_wound {
            continue;
        }
        let save_target = SAVE_CAP.min(units[victim.index()].effective_save() + spell.piercing);
        if rng.gen_range(1..=6) >= save_target {
            continue;
        }
        let damage = spell.damage.roll(rng);
        take_damage(units, victim, damage, Some(caster), rng);
    }
    true
}

fn cast_heal(
    units: &mut [Unit],
    caster: UnitId,
    spell: &Spell,
    events: &mut Vec<BattleEvent>,
) -> bool {
    let (side, pos) = {
        let c = &units[caster.index()];
        (c.side, c.position.unwrap_or_default())
    };
    let patient = units
        .iter()
        .filter(|a| a.side == side && a.alive && a.id != caster && a.hp < a.max_hp)
        .filter_map(|a| a.position.map(|p| (a, p)))
        .filter(|(_, p)| pos.manhattan(p) <= spell.range)
        .min_by_key(|(a, _)| (a.hp * 100 / a.max_hp.max(1), a.id))
        .map(|(a, _)| a.id);
    let Some(patient) = patient else { return false };

    let tpos = units[patient.index()].position.unwrap_or_default();
    units[patient.index()].hp = units[patient.index()].max_hp;
    events.push(BattleEvent::HealBeam {
        from: pos,
        to: tpos,
    });
    true
}

fn cast_armor<R: Rng>(
    units: &mut [Unit],
    caster: UnitId,
    spell: &Spell,
    rng: &mut R,
    events: &mut Vec<BattleEvent>,
) -> bool {
    let (side, pos) = {
        let c = &units[caster.index()];
        (c.side, c.position.unwrap_or_default())
    };
    let candidates: Vec<UnitId> = units
        .iter()
        .filter(|a| a.side == side && a.alive && a.armor_buff.is_none() && a.save > 1)
        .filter_map(|a| a.position.map(|p| (a.id, p)))
        .filter(|(_, p)| pos.manhattan(p) <= spell.range)
        .map(|(id, _)| id)
        .collect();
    if candidates.is_empty() {
        return false;
    }
    let chosen = candidates[rng.gen_range(0..candidates.len())];

    let u = &mut units[chosen.index()];
    let improved = (u.save - spell.bonus).max(1);
    let actual = u.save - improved;
    u.save = improved;
    u.armor_buff = Some(ArmorBuff {
        amount: actual,
        rounds_left: spell.duration,
    });
    events.push(BattleEvent::ArmorShimmer { unit: chosen });
    true
}

/// Raise obstacle segments one step in front of the nearest enemies,
/// between them and the caster.
fn cast_force_wall(
    units: &mut [Unit],
    field: &mut Battlefield,
    caster: UnitId,
    spell: &Spell,
    events: &mut Vec<BattleEvent>,
) -> bool {
    let (side, pos) = {
        let c = &units[caster.index()];
        (c.side, c.position.unwrap_or_default())
    };
    let mut enemies: Vec<(UnitId, Cell)> = units
        .iter()
        .filter(|e| e.side != side && e.alive)
        .filter_map(|e| e.position.map(|p| (e.id, p)))
        .collect();
    enemies.sort_by_key(|(id, p)| (pos.manhattan(p), *id));

    let mut raised = Vec::new();
    for (_, epos) in enemies.into_iter().take(spell.segments as usize) {
        let step = Cell::new(
            epos.x + (pos.x - epos.x).signum(),
            epos.y + (pos.y - epos.y).signum(),
        );
        if field.is_free(step) {
            field.add_temp_wall(step, spell.duration);
            raised.push(step);
        }
    }
    if raised.is_empty() {
        return false;
    }
    events.push(BattleEvent::WallRaised { cells: raised });
    true
}
