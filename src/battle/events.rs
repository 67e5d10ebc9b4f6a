//! Visual events emitted during a round
//!
//! The engine is headless; these records are what a front end or replay
//! tool would animate. Drained by the caller after each round.

use serde::{Deserialize, Serialize};

use crate::core::types::{Cell, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    Arrow,
    Fireball,
    Magic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEvent {
    /// A missile or spell bolt traveling between two cells.
    Projectile {
        from: Cell,
        to: Cell,
        kind: ProjectileKind,
    },
    /// A melee or reach swing.
    AttackLine { from: Cell, to: Cell, reach: bool },
    /// Who is currently attacking whom.
    TargetIndicator { unit: UnitId, target: UnitId },
    /// A blast zone detonating.
    AreaEffect { center: Cell, radius: i32 },
    /// A healing spell landing.
    HealBeam { from: Cell, to: Cell },
    /// An armor buff taking effect.
    ArmorShimmer { unit: UnitId },
    /// Force-wall segments appearing.
    WallRaised { cells: Vec<Cell> },
}
