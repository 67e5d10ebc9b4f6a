//! End-of-battle reporting

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::Side;
use crate::units::Unit;

/// Casualty accounting for one army, with unit counts grouped by type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideReport {
    pub initial: usize,
    pub survivors: usize,
    pub fled: usize,
    pub dead: usize,
    pub survivors_by_type: BTreeMap<String, usize>,
    pub fled_by_type: BTreeMap<String, usize>,
    pub dead_by_type: BTreeMap<String, usize>,
}

impl SideReport {
    fn tally(units: &[Unit], side: Side, initial: usize) -> Self {
        let mut report = Self {
            initial,
            survivors: 0,
            fled: 0,
            dead: 0,
            survivors_by_type: BTreeMap::new(),
            fled_by_type: BTreeMap::new(),
            dead_by_type: BTreeMap::new(),
        };
        for u in units.iter().filter(|u| u.side == side) {
            let (count, by_type) = if u.fled {
                (&mut report.fled, &mut report.fled_by_type)
            } else if u.alive || u.down_timer > 0 {
                (&mut report.survivors, &mut report.survivors_by_type)
            } else {
                (&mut report.dead, &mut report.dead_by_type)
            };
            *count += 1;
            *by_type.entry(u.archetype.clone()).or_insert(0) += 1;
        }
        report
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReport {
    pub rounds: u32,
    /// None means a draw (both armies wiped or fled).
    pub winner: Option<Side>,
    pub left: SideReport,
    pub right: SideReport,
}

impl BattleReport {
    pub fn new(
        units: &[Unit],
        initial: [usize; 2],
        rounds: u32,
        winner: Option<Side>,
    ) -> Self {
        Self {
            rounds,
            winner,
            left: SideReport::tally(units, Side::Left, initial[0]),
            right: SideReport::tally(units, Side::Right, initial[1]),
        }
    }
}
