//! Tactical orders issued by the commanders
//!
//! An order is a directive, not a script: the movement and targeting layers
//! interpret it each round against the current field state, and fall back to
//! nearest-enemy behavior when the order no longer applies.

use serde::{Deserialize, Serialize};

use crate::core::types::{Cell, UnitId};

/// What the commander wants this unit to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Engage a specific enemy.
    Attack { target: UnitId },
    /// Move wide to a destination before re-engaging.
    Flank { dest: Cell },
    /// Hold position (or move to one first), firing opportunistically.
    Hold { dest: Option<Cell> },
    /// Screen a position, intercepting enemies that come near it.
    Protect { dest: Cell },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticalOrder {
    pub kind: OrderKind,
    /// Higher priority orders survive re-issue; informational otherwise.
    pub priority: i32,
    /// Preferred advance row, used to spread an army across the field.
    pub lane: Option<i32>,
}

impl TacticalOrder {
    pub fn attack(target: UnitId, priority: i32) -> Self {
        Self {
            kind: OrderKind::Attack { target },
            priority,
            lane: None,
        }
    }

    pub fn flank(dest: Cell, priority: i32) -> Self {
        Self {
            kind: OrderKind::Flank { dest },
            priority,
            lane: None,
        }
    }

    pub fn hold(dest: Option<Cell>, priority: i32) -> Self {
        Self {
            kind: OrderKind::Hold { dest },
            priority,
            lane: None,
        }
    }

    pub fn protect(dest: Cell, priority: i32) -> Self {
        Self {
            kind: OrderKind::Protect { dest },
            priority,
            lane: None,
        }
    }

    pub fn with_lane(mut self, lane: i32) -> Self {
        self.lane = Some(lane);
        self
    }
}
