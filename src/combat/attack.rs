//! Weapon attack resolution: the to-hit / to-wound / save dice pipeline
//!
//! All thresholds are d6 targets. A frightened attacker hits one point
//! worse; piercing raises the defender's save target, capped at 7 which a
//! d6 can never reach (unsavable).

use rand::Rng;

use crate::battle::events::{BattleEvent, ProjectileKind};
use crate::battlefield::grid::Battlefield;
use crate::battlefield::movement::wall_blocks_contact;
use crate::constants::{
    DOWN_TIMER_MAX, DOWN_TIMER_MIN, MORALE_DIE, RANGED_THRESHOLD, REACH_THRESHOLD, SAVE_CAP,
};
use crate::core::types::{Cell, UnitId};
use crate::units::Unit;

/// Resolve every attack of every in-range weapon the attacker carries
/// against the target. Stops early once the target drops.
pub fn perform_attacks<R: Rng>(
    units: &mut [Unit],
    field: &Battlefield,
    attacker: UnitId,
    target: UnitId,
    rng: &mut R,
    events: &mut Vec<BattleEvent>,
) {
    let (atk_pos, weapons, atk_afraid, atk_morale, atk_immune) = {
        let a = &units[attacker.index()];
        if !a.alive || a.fleeing {
            return;
        }
        let Some(pos) = a.position else { return };
        (
            pos,
            a.weapons.clone(),
            a.afraid,
            a.effective_morale(),
            a.immune_mind,
        )
    };
    let Some(tgt_pos) = units[target.index()].position else {
        return;
    };
    if !units[target.index()].alive {
        return;
    }
    let dist = atk_pos.manhattan(&tgt_pos);

    events.push(BattleEvent::TargetIndicator {
        unit: attacker,
        target,
    });

    for weapon in &weapons {
        if dist > weapon.range {
            continue;
        }
        // Melee and reach cannot swing through an intact wall.
        if weapon.range < RANGED_THRESHOLD && wall_blocks_contact(field, atk_pos, tgt_pos) {
            continue;
        }

        if weapon.range >= RANGED_THRESHOLD {
            events.push(BattleEvent::Projectile {
                from: atk_pos,
                to: tgt_pos,
                kind: ProjectileKind::Arrow,
            });
        } else {
            events.push(BattleEvent::AttackLine {
                from: atk_pos,
                to: tgt_pos,
                reach: weapon.range >= REACH_THRESHOLD,
            });
        }

        for _ in 0..weapon.attacks {
            if !units[target.index()].alive {
                return;
            }

            // An awe-inspiring defender can stay the hand of anyone in
            // contact: the attacker must steel itself for each blow.
            if dist <= 1 && units[target.index()].awe > 0 && !atk_immune {
                let nerve = rng.gen_range(1..=MORALE_DIE);
                if nerve > atk_morale {
                    continue;
                }
            }

            let to_hit = weapon.to_hit + if atk_afraid { 1 } else { 0 };
            if rng.gen_range(1..=6) < to_hit {
                continue;
            }
            if rng.gen_range(1..=6) < weapon.to_wound {
                continue;
            }
            let save_target =
                SAVE_CAP.min(units[target.index()].effective_save() + weapon.piercing);
            if rng.gen_range(1..=6) >= save_target {
                continue;
            }
            let damage = weapon.damage.roll(rng);
            take_damage(units, target, damage, Some(attacker), rng);
        }
    }
}

/// The free swing granted by a successful charge: the first melee weapon
/// only, resolved on top of the unit's normal attacks later in the round.
pub fn charge_strike<R: Rng>(
    units: &mut [Unit],
    field: &Battlefield,
    attacker: UnitId,
    target: UnitId,
    rng: &mut R,
    events: &mut Vec<BattleEvent>,
) {
    let (atk_pos, weapon, atk_afraid, atk_morale, atk_immune) = {
        let a = &units[attacker.index()];
        if !a.alive || a.fleeing {
            return;
        }
        let Some(pos) = a.position else { return };
        let Some(w) = a.weapons.iter().find(|w| w.range <= 1) else {
            return;
        };
        (pos, w.clone(), a.afraid, a.effective_morale(), a.immune_mind)
    };
    let Some(tgt_pos) = units[target.index()].position else {
        return;
    };
    if !units[target.index()].alive {
        return;
    }
    let dist = atk_pos.manhattan(&tgt_pos);
    if dist > weapon.range || wall_blocks_contact(field, atk_pos, tgt_pos) {
        return;
    }

    events.push(BattleEvent::AttackLine {
        from: atk_pos,
        to: tgt_pos,
        reach: false,
    });
    for _ in 0..weapon.attacks {
        if !units[target.index()].alive {
            return;
        }
        if units[target.index()].awe > 0 && !atk_immune {
            let nerve = rng.gen_range(1..=MORALE_DIE);
            if nerve > atk_morale {
                continue;
            }
        }
        let to_hit = weapon.to_hit + if atk_afraid { 1 } else { 0 };
        if rng.gen_range(1..=6) < to_hit {
            continue;
        }
        if rng.gen_range(1..=6) < weapon.to_wound {
            continue;
        }
        let save_target = SAVE_CAP.min(units[target.index()].effective_save() + weapon.piercing);
        if rng.gen_range(1..=6) >= save_target {
            continue;
        }
        let damage = weapon.damage.roll(rng);
        take_damage(units, target, damage, Some(attacker), rng);
    }
}

/// Apply damage to a unit, handling blood vengeance reflection and the
/// downed-or-dead split at zero hit points.
pub fn take_damage<R: Rng>(
    units: &mut [Unit],
    target: UnitId,
    amount: i32,
    source: Option<UnitId>,
    rng: &mut R,
) {
    if amount <= 0 {
        return;
    }

    // Blood vengeance: the wound may rebound onto whoever dealt it.
    if let Some(src) = source.filter(|s| *s != target) {
        let vengeance = units[target.index()].blood_vengeance;
        if vengeance > 0 && units[src.index()].alive {
            let roll = rng.gen_range(1..=20);
            if roll + units[src.index()].save - vengeance < 10 + vengeance {
                apply_damage(&mut units[src.index()], amount, rng);
                return;
            }
        }
    }

    apply_damage(&mut units[target.index()], amount, rng);
}

fn apply_damage<R: Rng>(unit: &mut Unit, amount: i32, rng: &mut R) {
    unit.hp -= amount;
    if unit.hp > 0 {
        return;
    }
    if unit.hp > -unit.max_hp / 2 && unit.regeneration > 0 {
        // Not beyond saving: the unit goes down and may recover.
        unit.alive = false;
        unit.down_timer = rng.gen_range(DOWN_TIMER_MIN..=DOWN_TIMER_MAX);
    } else {
        unit.alive = false;
        unit.down_timer = 0;
    }
}

/// Batter a gate cell: to-hit, then the gate's own save, then damage
/// straight to its hit points. Gates do not roll to-wound.
pub fn attack_gate<R: Rng>(
    units: &[Unit],
    field: &mut Battlefield,
    attacker: UnitId,
    gate: Cell,
    rng: &mut R,
    events: &mut Vec<BattleEvent>,
) {
    let a = &units[attacker.index()];
    if !a.alive || a.fleeing {
        return;
    }
    let Some(pos) = a.position else { return };
    let gate_save = match field.siege.as_ref() {
        Some(s) => s.gate_save,
        None => return,
    };
    let dist = pos.manhattan(&gate);

    for weapon in &a.weapons {
        if dist > weapon.range {
            continue;
        }
        if weapon.range >= RANGED_THRESHOLD {
            events.push(BattleEvent::Projectile {
                from: pos,
                to: gate,
                kind: ProjectileKind::Arrow,
            });
        } else {
            events.push(BattleEvent::AttackLine {
                from: pos,
                to: gate,
                reach: weapon.range >= REACH_THRESHOLD,
            });
        }
        for _ in 0..weapon.attacks {
            if rng.gen_range(1..=6) < weapon.to_hit {
                continue;
            }
            if rng.gen_range(1..=6) >= gate_save {
                continue;
            }
            let damage = weapon.damage.roll(rng);
            if field.damage_gate(gate, damage) == Some(0) {
                return;
            }
        }
    }
}
