//! The battlefield grid: terrain raster, occupancy index, siege state
//!
//! The occupancy map is the single source of truth for which unit stands
//! where. Multi-cell units occupy every cell of their footprint; all entries
//! point at the same `UnitId`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{Cell, UnitId};
use crate::battlefield::terrain::{CellKind, SiegeLayout, TempWall};
use crate::units::Footprint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battlefield {
    pub width: i32,
    pub height: i32,
    /// Row-major terrain raster, `width * height` cells.
    grid: Vec<CellKind>,
    occupancy: HashMap<Cell, UnitId>,
    pub siege: Option<SiegeLayout>,
    pub temp_walls: Vec<TempWall>,
}

impl Battlefield {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(SimError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            grid: vec![CellKind::Empty; (width * height) as usize],
            occupancy: HashMap::new(),
            siege: None,
            temp_walls: Vec::new(),
        })
    }

    fn idx(&self, cell: Cell) -> usize {
        (cell.y * self.width + cell.x) as usize
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    pub fn kind(&self, cell: Cell) -> CellKind {
        if self.in_bounds(cell) {
            self.grid[self.idx(cell)]
        } else {
            CellKind::Obstacle
        }
    }

    pub fn set_kind(&mut self, cell: Cell, kind: CellKind) {
        if self.in_bounds(cell) {
            let i = self.idx(cell);
            self.grid[i] = kind;
        }
    }

    /// Terrain passability, folding in gate damage and active force walls.
    pub fn is_passable(&self, cell: Cell) -> bool {
        if !self.in_bounds(cell) {
            return false;
        }
        if self.temp_walls.iter().any(|w| w.cell == cell) {
            return false;
        }
        match self.kind(cell) {
            CellKind::Gate => self
                .siege
                .as_ref()
                .is_some_and(|s| s.gate_destroyed(cell)),
            k => k.base_passable(),
        }
    }

    pub fn occupant(&self, cell: Cell) -> Option<UnitId> {
        self.occupancy.get(&cell).copied()
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.occupancy.contains_key(&cell)
    }

    /// Passable and not occupied by anyone but `ignore`.
    pub fn is_free_for(&self, cell: Cell, ignore: Option<UnitId>) -> bool {
        self.is_passable(cell)
            && match self.occupancy.get(&cell) {
                None => true,
                Some(id) => Some(*id) == ignore,
            }
    }

    pub fn is_free(&self, cell: Cell) -> bool {
        self.is_free_for(cell, None)
    }

    /// True if every footprint cell anchored at `anchor` is free for `ignore`.
    pub fn can_place(&self, footprint: Footprint, anchor: Cell, ignore: Option<UnitId>) -> bool {
        footprint
            .cells(anchor)
            .into_iter()
            .all(|c| self.is_free_for(c, ignore))
    }

    /// Claim every footprint cell for `id`. Caller checks `can_place` first.
    pub fn place(&mut self, id: UnitId, footprint: Footprint, anchor: Cell) {
        for c in footprint.cells(anchor) {
            self.occupancy.insert(c, id);
        }
    }

    /// Release every cell currently held by `id`.
    pub fn remove(&mut self, id: UnitId) {
        self.occupancy.retain(|_, v| *v != id);
    }

    /// Atomically move `id` from wherever it stands to `anchor`.
    pub fn move_unit(&mut self, id: UnitId, footprint: Footprint, anchor: Cell) {
        self.remove(id);
        self.place(id, footprint, anchor);
    }

    pub fn add_temp_wall(&mut self, cell: Cell, rounds: u32) {
        if self.in_bounds(cell) && !self.is_occupied(cell) && self.kind(cell) == CellKind::Empty {
            self.temp_walls.push(TempWall {
                cell,
                rounds_left: rounds,
            });
        }
    }

    /// Count down and drop expired force walls; called once per round.
    pub fn expire_temp_walls(&mut self) {
        for w in &mut self.temp_walls {
            w.rounds_left = w.rounds_left.saturating_sub(1);
        }
        self.temp_walls.retain(|w| w.rounds_left > 0);
    }

    /// Apply damage to a gate cell; returns the remaining hit points, or
    /// None if the cell is not a gate.
    pub fn damage_gate(&mut self, cell: Cell, damage: i32) -> Option<i32> {
        let siege = self.siege.as_mut()?;
        let hp = siege.gates.get_mut(&cell)?;
        *hp = (*hp - damage).max(0);
        Some(*hp)
    }

    pub fn occupied_cells(&self) -> impl Iterator<Item = (Cell, UnitId)> + '_ {
        self.occupancy.iter().map(|(c, id)| (*c, *id))
    }
}
