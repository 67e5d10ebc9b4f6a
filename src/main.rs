//! Command-line battle runner: builds a map and two stock armies, runs the
//! simulation to completion, and prints a JSON report.

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shieldwall::battle::{Battle, Outcome};
use shieldwall::battlefield::maps::{open_field, siege_field};
use shieldwall::constants::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use shieldwall::core::error::Result;
use shieldwall::core::types::{Side, UnitId};
use shieldwall::units::spell::Spell;
use shieldwall::units::weapon::{DamageSpec, Weapon};
use shieldwall::units::{Footprint, Role, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MapKind {
    Open,
    Siege,
}

#[derive(Parser, Debug)]
#[command(name = "shieldwall", about = "Deterministic grid battle simulator")]
struct Args {
    /// RNG seed; the same seed always produces the same battle.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = MapKind::Open)]
    map: MapKind,

    /// Stop after this many rounds even without a decision.
    #[arg(long, default_value_t = 200)]
    max_rounds: u32,
}

fn sword() -> Weapon {
    Weapon::new("sword", 2, 3, 3, 0, DamageSpec::Fixed(1), 1)
}

fn spear() -> Weapon {
    Weapon::new("spear", 1, 3, 3, 0, DamageSpec::Fixed(1), 2)
}

fn bow() -> Weapon {
    Weapon::new("bow", 1, 3, 4, 0, DamageSpec::Fixed(1), 9)
}

fn lance() -> Weapon {
    Weapon::new("lance", 2, 3, 3, 1, DamageSpec::Fixed(2), 1)
}

fn claws() -> Weapon {
    Weapon::new("claws", 3, 3, 2, 1, DamageSpec::Dice {
        bonus: 1,
        count: 1,
        faces: 4,
    }, 1)
}

/// A balanced stock army: a phalanx line, archers, cavalry, an officer, a
/// mage, and one regenerating monster.
fn stock_army(side: Side, tag: &str) -> Vec<Unit> {
    let mut roster = Vec::new();

    for i in 0..8 {
        let mut u = Unit::new(
            UnitId(0),
            &format!("{tag}-spearman-{i}"),
            "Spearmen",
            side,
            4,
            3,
            4,
            5,
        )
        .with_weapons(vec![spear()])
        .with_role(Role::Front);
        u.phalanx = true;
        roster.push(u);
    }

    for i in 0..4 {
        roster.push(
            Unit::new(
                UnitId(0),
                &format!("{tag}-archer-{i}"),
                "Archers",
                side,
                3,
                3,
                4,
                6,
            )
            .with_weapons(vec![bow()])
            .with_role(Role::Back),
        );
    }

    for i in 0..2 {
        let mut u = Unit::new(
            UnitId(0),
            &format!("{tag}-rider-{i}"),
            "Cavalry",
            side,
            6,
            8,
            4,
            4,
        )
        .with_weapons(vec![lance()])
        .with_role(Role::Mid);
        u.can_charge = true;
        roster.push(u);
    }

    let mut officer = Unit::new(
        UnitId(0),
        &format!("{tag}-captain"),
        "Captain",
        side,
        6,
        3,
        5,
        4,
    )
    .with_weapons(vec![sword()])
    .with_role(Role::Mid);
    officer.encouragement_range = 6;
    roster.push(officer);

    let mut mage = Unit::new(UnitId(0), &format!("{tag}-mage"), "Mage", side, 3, 3, 4, 6)
        .with_spells(vec![
            Spell::projectile("firebolt", 10, 3, DamageSpec::Dice {
                bonus: 0,
                count: 1,
                faces: 6,
            }, 1),
            Spell::blast("fireball", 12, 3, 1, DamageSpec::Fixed(2), 3, 3),
            Spell::armor("stoneskin", 8, 2, 4, 2),
        ])
        .with_role(Role::Back);
    mage.casts_per_round = 1;
    roster.push(mage);

    let mut troll = Unit::new(UnitId(0), &format!("{tag}-troll"), "Troll", side, 12, 4, 3, 4)
        .with_weapons(vec![claws()])
        .with_role(Role::Front)
        .with_footprint(Footprint::Large);
    troll.regeneration = 15;
    troll.fear_aura = 4;
    roster.push(troll);

    roster
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let field = match args.map {
        MapKind::Open => open_field(DEFAULT_WIDTH, DEFAULT_HEIGHT, args.seed)?,
        MapKind::Siege => siege_field(DEFAULT_WIDTH, DEFAULT_HEIGHT, Side::Right)?,
    };

    let left = stock_army(Side::Left, "west");
    let right = stock_army(Side::Right, "east");
    let mut battle = Battle::new(field, left, right, args.seed)?;

    while battle.outcome() == Outcome::Ongoing && battle.round < args.max_rounds {
        battle.simulate_round()?;
        let events = battle.drain_events();
        info!(round = battle.round, events = events.len(), "round complete");
    }

    let report = battle.report();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
