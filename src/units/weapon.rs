//! Weapons and damage specifications
//!
//! Damage is either a fixed value or a dice expression (bonus + N dice of
//! F faces), written in the roster notation "3", "1d6", "2+1d4".

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Damage rolled at use time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSpec {
    Fixed(i32),
    Dice { bonus: i32, count: u32, faces: u32 },
}

impl DamageSpec {
    pub fn roll<R: Rng>(&self, rng: &mut R) -> i32 {
        match *self {
            DamageSpec::Fixed(n) => n,
            DamageSpec::Dice {
                bonus,
                count,
                faces,
            } => {
                let mut total = bonus;
                for _ in 0..count {
                    total += rng.gen_range(1..=faces as i32);
                }
                total
            }
        }
    }

    /// Average damage, used by nothing in the round loop (RNG-free heuristics
    /// only) but handy for roster tooling.
    pub fn expected(&self) -> f32 {
        match *self {
            DamageSpec::Fixed(n) => n as f32,
            DamageSpec::Dice {
                bonus,
                count,
                faces,
            } => bonus as f32 + count as f32 * (faces as f32 + 1.0) / 2.0,
        }
    }
}

impl FromStr for DamageSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let parse_dice = |d: &str| -> std::result::Result<(u32, u32), String> {
            let (count, faces) = d
                .split_once('d')
                .ok_or_else(|| format!("bad dice expression: {d}"))?;
            let count = count.parse::<u32>().map_err(|e| e.to_string())?;
            let faces = faces.parse::<u32>().map_err(|e| e.to_string())?;
            if faces == 0 {
                return Err(format!("zero-faced die in {d}"));
            }
            Ok((count, faces))
        };

        if let Some((bonus, dice)) = s.split_once('+') {
            let bonus = bonus.trim().parse::<i32>().map_err(|e| e.to_string())?;
            let (count, faces) = parse_dice(dice.trim())?;
            Ok(DamageSpec::Dice {
                bonus,
                count,
                faces,
            })
        } else if s.contains('d') {
            let (count, faces) = parse_dice(&s)?;
            Ok(DamageSpec::Dice {
                bonus: 0,
                count,
                faces,
            })
        } else {
            let n = s.parse::<i32>().map_err(|e| e.to_string())?;
            Ok(DamageSpec::Fixed(n))
        }
    }
}

/// Static combat stats for one weapon.
///
/// Thresholds are d6 targets: a roll below `to_hit` misses, below `to_wound`
/// fails to wound; the defender saves on a roll of at least
/// `save + piercing` (capped at 7 = unsavable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub attacks: u32,
    pub to_hit: i32,
    pub to_wound: i32,
    pub piercing: i32,
    pub damage: DamageSpec,
    pub range: i32,
}

impl Weapon {
    pub fn new(
        name: &str,
        attacks: u32,
        to_hit: i32,
        to_wound: i32,
        piercing: i32,
        damage: DamageSpec,
        range: i32,
    ) -> Self {
        Self {
            name: name.to_string(),
            attacks,
            to_hit,
            to_wound,
            piercing,
            damage,
            range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_fixed() {
        assert_eq!("3".parse::<DamageSpec>().unwrap(), DamageSpec::Fixed(3));
    }

    #[test]
    fn test_parse_plain_dice() {
        assert_eq!(
            "1d6".parse::<DamageSpec>().unwrap(),
            DamageSpec::Dice {
                bonus: 0,
                count: 1,
                faces: 6
            }
        );
    }

    #[test]
    fn test_parse_bonus_dice() {
        assert_eq!(
            "2+1d4".parse::<DamageSpec>().unwrap(),
            DamageSpec::Dice {
                bonus: 2,
                count: 1,
                faces: 4
            }
        );
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!("d".parse::<DamageSpec>().is_err());
        assert!("1d0".parse::<DamageSpec>().is_err());
        assert!("axe".parse::<DamageSpec>().is_err());
    }

    #[test]
    fn test_roll_within_bounds() {
        let spec: DamageSpec = "2+2d4".parse().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let dmg = spec.roll(&mut rng);
            assert!((4..=10).contains(&dmg));
        }
    }

    #[test]
    fn test_fixed_roll_is_constant() {
        let spec = DamageSpec::Fixed(5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(spec.roll(&mut rng), 5);
        assert_eq!(spec.roll(&mut rng), 5);
    }

    #[test]
    fn test_expected_value() {
        let spec: DamageSpec = "1+1d6".parse().unwrap();
        assert!((spec.expected() - 4.5).abs() < f32::EPSILON);
    }
}
