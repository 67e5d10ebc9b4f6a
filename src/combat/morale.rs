//! Morale: checks, encouragement, casualty shocks, fear, combat stress
//!
//! Morale damage is monotonic within a battle: maluses only accumulate,
//! fleeing is absorbing, and each one-shot malus (fear, half casualties,
//! severe casualties) is guarded by a flag so it lands at most once.

use rand::Rng;

use crate::constants::{
    HALF_CASUALTY_FRACTION, MORALE_DIE, SEVERE_CASUALTY_FRACTION, STRESS_CONTACT_COUNT,
};
use crate::core::types::Side;
use crate::units::Unit;

/// One morale check: d6 against effective morale. A unit at zero effective
/// morale fails without rolling.
pub fn morale_check<R: Rng>(unit: &Unit, rng: &mut R) -> bool {
    let effective = unit.effective_morale();
    effective > 0 && rng.gen_range(1..=MORALE_DIE) <= effective
}

/// An army with no will left routs as one: when every living unit sits at
/// zero effective morale, they all turn and run.
pub fn check_forced_rout(units: &mut [Unit], side: Side) {
    let living: Vec<usize> = units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.side == side && u.alive && u.position.is_some())
        .map(|(i, _)| i)
        .collect();
    if living.is_empty() {
        return;
    }
    if living.iter().any(|i| units[*i].effective_morale() > 0) {
        return;
    }
    for i in living {
        units[i].fleeing = true;
    }
}

/// Recompute encouragement bonuses from living officers. The bonus does not
/// stack: any number of encouragers in range is worth exactly +1.
pub fn update_encouragement(units: &mut [Unit]) {
    let encouragers: Vec<(Side, crate::core::types::Cell, i32)> = units
        .iter()
        .filter(|u| u.alive && !u.fleeing && u.encouragement_range > 0)
        .filter_map(|u| u.position.map(|p| (u.side, p, u.encouragement_range)))
        .collect();

    for unit in units.iter_mut() {
        unit.morale_bonus = 0;
        if !unit.alive || unit.encouragement_range > 0 {
            continue;
        }
        let Some(pos) = unit.position else { continue };
        let encouraged = encouragers
            .iter()
            .any(|(side, epos, range)| *side == unit.side && pos.manhattan(epos) <= *range);
        if encouraged {
            unit.morale_bonus = 1;
        }
    }
}

/// Casualty shocks at half and three-quarter losses. Each survivor rolls
/// once per threshold; only a failed check costs morale.
pub fn check_casualty_thresholds<R: Rng>(
    units: &mut [Unit],
    side: Side,
    initial_count: usize,
    rng: &mut R,
) {
    let alive = units
        .iter()
        .filter(|u| u.side == side && u.alive)
        .count() as f32;
    let initial = initial_count as f32;

    let half_hit = alive <= initial * (1.0 - HALF_CASUALTY_FRACTION);
    let severe_hit = alive <= initial * (1.0 - SEVERE_CASUALTY_FRACTION);

    for i in 0..units.len() {
        if units[i].side != side || !units[i].alive {
            continue;
        }
        if half_hit && !units[i].half_casualty_malus_applied {
            units[i].half_casualty_malus_applied = true;
            shock_check(&mut units[i], rng);
        }
        if severe_hit && !units[i].severe_casualty_malus_applied {
            units[i].severe_casualty_malus_applied = true;
            shock_check(&mut units[i], rng);
        }
    }
}

fn shock_check<R: Rng>(unit: &mut Unit, rng: &mut R) {
    if !morale_check(unit, rng) {
        unit.morale_malus += 1;
        if unit.effective_morale() == 0 {
            unit.fleeing = true;
        }
    }
}

/// Reapply fear auras. The afraid flag is transient and recomputed every
/// round; the fear malus is permanent and lands once per unit.
pub fn apply_fear_auras(units: &mut [Unit]) {
    // Clear the transient flag; fleeing units stay panicked and downed
    // units have other problems.
    for u in units.iter_mut() {
        if u.alive && !u.fleeing {
            u.afraid = false;
        }
    }

    let auras: Vec<(Side, crate::core::types::Cell, i32)> = units
        .iter()
        .filter(|u| u.alive && u.fear_aura > 0)
        .filter_map(|u| u.position.map(|p| (u.side, p, u.fear_aura)))
        .collect();

    for unit in units.iter_mut() {
        if !unit.alive || unit.immune_mind {
            continue;
        }
        let Some(pos) = unit.position else { continue };

        // Strongest applicable aura: nearest source, ties to the bigger aura.
        let mut best: Option<(i32, i32)> = None; // (dist, aura)
        for (side, apos, aura) in &auras {
            if *side == unit.side {
                continue;
            }
            let dist = pos.manhattan(apos);
            if dist > *aura {
                continue;
            }
            match best {
                None => best = Some((dist, *aura)),
                Some((bd, ba)) if dist < bd || (dist == bd && *aura > ba) => {
                    best = Some((dist, *aura))
                }
                _ => {}
            }
        }
        if best.is_some() {
            apply_fear_effect(unit);
        }
    }
}

fn apply_fear_effect(unit: &mut Unit) {
    if !unit.fear_malus_applied {
        unit.fear_malus_applied = true;
        unit.morale_malus += 1;
        unit.afraid = true;
        if unit.effective_morale() == 0 {
            unit.fleeing = true;
        }
    } else if !unit.fleeing {
        unit.afraid = true;
    }
}

/// Units swarmed in melee get rattled: two or more adjacent enemies, and
/// more of them than adjacent friends, forces one check. Failing only
/// shakes the unit; it does not cost permanent morale.
pub fn check_combat_stress<R: Rng>(units: &mut [Unit], rng: &mut R) {
    let snapshot: Vec<(Side, Option<crate::core::types::Cell>, bool)> = units
        .iter()
        .map(|u| (u.side, u.position, u.alive))
        .collect();

    for i in 0..units.len() {
        let unit = &units[i];
        if !unit.alive || unit.fleeing || unit.immune_mind {
            continue;
        }
        let Some(pos) = unit.position else { continue };

        let mut adjacent_enemies = 0usize;
        let mut adjacent_allies = 0usize;
        for (j, (side, p, alive)) in snapshot.iter().enumerate() {
            if j == i || !alive {
                continue;
            }
            let Some(p) = p else { continue };
            if pos.chebyshev(p) == 1 {
                if *side == unit.side {
                    adjacent_allies += 1;
                } else {
                    adjacent_enemies += 1;
                }
            }
        }

        if adjacent_enemies >= STRESS_CONTACT_COUNT
            && adjacent_enemies > adjacent_allies
            && !morale_check(&units[i], rng)
        {
            units[i].afraid = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::core::types::{Cell, UnitId};

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    fn unit(id: u32, side: Side, morale: i32) -> Unit {
        let mut u = Unit::new(UnitId(id), "u", "Infantry", side, 4, 3, morale, 5);
        u.position = Some(Cell::new(id as i32, 0));
        u
    }

    #[test]
    fn test_morale_check_extremes() {
        let steady = unit(0, Side::Left, 6);
        let broken = unit(1, Side::Left, 0);
        let mut r = rng();
        for _ in 0..20 {
            assert!(morale_check(&steady, &mut r));
            assert!(!morale_check(&broken, &mut r));
        }
    }

    #[test]
    fn test_forced_rout_only_when_all_broken() {
        let mut units = vec![unit(0, Side::Left, 0), unit(1, Side::Left, 2)];
        check_forced_rout(&mut units, Side::Left);
        assert!(!units[0].fleeing && !units[1].fleeing);

        units[1].morale_malus = 2;
        check_forced_rout(&mut units, Side::Left);
        assert!(units[0].fleeing && units[1].fleeing);
    }

    #[test]
    fn test_encouragement_is_non_stacking_and_revocable() {
        let mut units = vec![unit(0, Side::Left, 4), unit(1, Side::Left, 4), unit(2, Side::Left, 4)];
        units[1].encouragement_range = 5;
        units[2].encouragement_range = 5;
        update_encouragement(&mut units);
        assert_eq!(units[0].morale_bonus, 1);

        units[1].alive = false;
        units[2].fleeing = true;
        update_encouragement(&mut units);
        assert_eq!(units[0].morale_bonus, 0);
    }

    #[test]
    fn test_half_casualty_shock_rolls_once_per_unit() {
        // Morale 6 always passes: the flag is set but no malus lands.
        let mut units = vec![unit(0, Side::Left, 6), unit(1, Side::Left, 6)];
        check_casualty_thresholds(&mut units, Side::Left, 4, &mut rng());
        assert!(units[0].half_casualty_malus_applied);
        assert_eq!(units[0].morale_malus, 0);

        // Calling again must not re-roll.
        check_casualty_thresholds(&mut units, Side::Left, 4, &mut rng());
        assert_eq!(units[0].morale_malus, 0);
    }

    #[test]
    fn test_failed_shock_costs_morale_and_can_rout() {
        // Morale 1, malus pushes effective to 0: flees on failure.
        let mut units = vec![unit(0, Side::Left, 1)];
        units[0].morale_malus = 1; // effective already 0: check auto-fails
        check_casualty_thresholds(&mut units, Side::Left, 4, &mut rng());
        assert!(units[0].half_casualty_malus_applied);
        assert!(units[0].severe_casualty_malus_applied);
        assert!(units[0].fleeing);
    }

    #[test]
    fn test_fear_malus_lands_exactly_once() {
        let mut units = vec![unit(0, Side::Left, 3), unit(1, Side::Right, 4)];
        units[1].fear_aura = 6;
        apply_fear_auras(&mut units);
        assert!(units[0].afraid);
        assert_eq!(units[0].morale_malus, 1);

        apply_fear_auras(&mut units);
        assert_eq!(units[0].morale_malus, 1, "fear malus must not stack");
        assert!(units[0].afraid);
    }

    #[test]
    fn test_afraid_clears_when_aura_source_dies() {
        let mut units = vec![unit(0, Side::Left, 3), unit(1, Side::Right, 4)];
        units[1].fear_aura = 6;
        apply_fear_auras(&mut units);
        assert!(units[0].afraid);

        units[1].alive = false;
        apply_fear_auras(&mut units);
        assert!(!units[0].afraid);
    }

    #[test]
    fn test_mind_immune_ignores_fear() {
        let mut units = vec![unit(0, Side::Left, 3), unit(1, Side::Right, 4)];
        units[0].immune_mind = true;
        units[1].fear_aura = 6;
        apply_fear_auras(&mut units);
        assert!(!units[0].afraid);
        assert_eq!(units[0].morale_malus, 0);
    }

    #[test]
    fn test_combat_stress_needs_outnumbering_contact() {
        // One enemy adjacent: no check, even at zero morale.
        let mut units = vec![unit(0, Side::Left, 0), unit(1, Side::Right, 4)];
        units[0].position = Some(Cell::new(5, 5));
        units[1].position = Some(Cell::new(6, 5));
        check_combat_stress(&mut units, &mut rng());
        assert!(!units[0].afraid);

        // Two adjacent enemies and no friends: zero morale fails the check.
        let mut u2 = unit(2, Side::Right, 4);
        u2.position = Some(Cell::new(5, 6));
        units.push(u2);
        check_combat_stress(&mut units, &mut rng());
        assert!(units[0].afraid);
    }

    #[test]
    fn test_combat_stress_balanced_by_allies() {
        let mut units = vec![
            unit(0, Side::Left, 0),
            unit(1, Side::Right, 4),
            unit(2, Side::Right, 4),
            unit(3, Side::Left, 4),
            unit(4, Side::Left, 4),
        ];
        units[0].position = Some(Cell::new(5, 5));
        units[1].position = Some(Cell::new(6, 5));
        units[2].position = Some(Cell::new(5, 6));
        units[3].position = Some(Cell::new(4, 5));
        units[4].position = Some(Cell::new(5, 4));
        check_combat_stress(&mut units, &mut rng());
        assert!(!units[0].afraid, "equal adjacent allies cancel the stress");
    }
}
