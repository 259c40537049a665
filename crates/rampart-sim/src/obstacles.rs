//! Blocked cells and terrain costs over the navigation grid.

use rampart_core::constants::{BLOCKED_CELL_COST, OPEN_CELL_COST};
use rampart_core::types::Cell;

/// Per-cell traversal cost with an epoch that changes on every mutation.
///
/// `BLOCKED_CELL_COST` marks an impassable cell; open cells cost
/// `OPEN_CELL_COST` up to `BLOCKED_CELL_COST - 1` for difficult terrain.
/// Unblocking a cell restores the terrain cost it had before.
#[derive(Debug, Clone)]
pub struct ObstacleGrid {
    width: u32,
    height: u32,
    terrain: Vec<u8>,
    blocked: Vec<bool>,
    epoch: u64,
}

impl ObstacleGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let n = (width * height) as usize;
        Self {
            width,
            height,
            terrain: vec![OPEN_CELL_COST; n],
            blocked: vec![false; n],
            epoch: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn slot(&self, cell: Cell) -> Option<usize> {
        (cell.x < self.width && cell.y < self.height)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    /// Block a cell. Returns true if the grid changed.
    pub fn block(&mut self, cell: Cell) -> bool {
        match self.slot(cell) {
            Some(i) if !self.blocked[i] => {
                self.blocked[i] = true;
                self.epoch += 1;
                true
            }
            _ => false,
        }
    }

    /// Unblock a cell. Returns true if the grid changed.
    pub fn unblock(&mut self, cell: Cell) -> bool {
        match self.slot(cell) {
            Some(i) if self.blocked[i] => {
                self.blocked[i] = false;
                self.epoch += 1;
                true
            }
            _ => false,
        }
    }

    /// Set the terrain cost of a cell, clamped to the open range.
    pub fn set_cost(&mut self, cell: Cell, cost: u8) -> bool {
        let cost = cost.clamp(OPEN_CELL_COST, BLOCKED_CELL_COST - 1);
        match self.slot(cell) {
            Some(i) if self.terrain[i] != cost => {
                self.terrain[i] = cost;
                self.epoch += 1;
                true
            }
            _ => false,
        }
    }

    /// Out-of-grid cells count as blocked.
    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.slot(cell).map_or(true, |i| self.blocked[i])
    }

    /// Effective traversal cost; `BLOCKED_CELL_COST` for blocked or out-of-grid cells.
    pub fn cost(&self, cell: Cell) -> u8 {
        match self.slot(cell) {
            Some(i) if !self.blocked[i] => self.terrain[i],
            _ => BLOCKED_CELL_COST,
        }
    }

    /// Dense cost field in row-major order.
    pub fn cost_field(&self) -> Vec<u8> {
        self.terrain
            .iter()
            .zip(&self.blocked)
            .map(|(&t, &b)| if b { BLOCKED_CELL_COST } else { t })
            .collect()
    }

    pub fn blocked_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let width = self.width;
        self.blocked
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(move |(i, _)| Cell::new(i as u32 % width, i as u32 / width))
    }
}
