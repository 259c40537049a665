//! Fundamental identity, grid, and time types.

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Generational entity handle.
///
/// The index addresses a slot in the dense component arrays; the generation
/// distinguishes successive occupants of that slot. A handle whose generation
/// no longer matches the live slot is stale and every operation on it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl EntityId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index as a `usize` for component array access.
    #[inline]
    pub fn slot(&self) -> usize {
        self.index as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{}g{}", self.index, self.generation)
    }
}

/// Integer coordinate of a navigation grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each simulated tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds, after time scaling.
    pub elapsed_secs: f64,
}

impl SimTime {
    /// Advance by one tick of `dt` simulated seconds.
    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        self.elapsed_secs += dt as f64;
    }
}

/// Normalize `v`, falling back to `fallback` when the length is degenerate.
#[inline]
pub fn normalize_or(v: Vec2, fallback: Vec2) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > crate::constants::DEGENERATE_LENGTH_SQ {
        v / len_sq.sqrt()
    } else {
        fallback
    }
}

/// Heading in radians of a velocity, or `None` when it is effectively zero.
#[inline]
pub fn heading_of(v: Vec2) -> Option<f32> {
    if v.x.abs() > 1e-6 || v.y.abs() > 1e-6 {
        Some(v.y.atan2(v.x))
    } else {
        None
    }
}
