//! Simulation constants and tuning parameters.

use crate::types::Vec2;

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 30;

/// Seconds per tick before time scaling.
pub const DT: f32 = 1.0 / TICK_RATE as f32;

/// Upper bound accepted by `SetTimeScale`.
pub const MAX_TIME_SCALE: f32 = 4.0;

// --- World ---

/// Default navigation grid cell size in world units.
pub const DEFAULT_NAV_CELL_SIZE: f32 = 32.0;

/// Default navigation grid dimensions (cells).
pub const DEFAULT_GRID_WIDTH: u32 = 40;
pub const DEFAULT_GRID_HEIGHT: u32 = 24;

/// Default spatial index bucket size; matches the longest default weapon range.
pub const DEFAULT_SPATIAL_CELL_SIZE: f32 = 220.0;

// --- Navigation ---

/// Cost of an open cell in the cost field.
pub const OPEN_CELL_COST: u8 = 1;

/// Cost marking an impassable cell.
pub const BLOCKED_CELL_COST: u8 = u8::MAX;

/// Integration value of cells with no path to the objective.
pub const UNREACHABLE: u32 = u32::MAX;

/// Default distance at which a hostile unit counts as having reached the objective.
pub const DEFAULT_OBJECTIVE_RADIUS: f32 = 12.0;

// --- Movement ---

/// Radius within which same-faction units push each other apart.
pub const DEFAULT_SEPARATION_RADIUS: f32 = 10.0;

/// Weight of the separation vector relative to the flow direction.
pub const DEFAULT_SEPARATION_WEIGHT: f32 = 0.6;

/// Squared length below which a vector is treated as zero.
pub const DEGENERATE_LENGTH_SQ: f32 = 1e-10;

/// Direction used whenever a degenerate vector would otherwise be normalized.
pub const FALLBACK_DIRECTION: Vec2 = Vec2::X;

// --- Factions ---

/// Faction id of the player's emplacements.
pub const DEFENDER_FACTION: u8 = 0;

/// Faction id of the attacking waves.
pub const INVADER_FACTION: u8 = 1;
