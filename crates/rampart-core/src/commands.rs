//! Requests issued into the simulation by external collaborators.
//!
//! Commands are queued and applied at the next tick boundary, never mid-tick.

use serde::{Deserialize, Serialize};

use crate::enums::Faction;
use crate::types::{Cell, EntityId, Vec2};

/// Create an entity from a unit template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub template: String,
    pub position: Vec2,
    pub faction: Faction,
}

/// All commands accepted by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimCommand {
    // --- Entities ---
    /// Spawn a unit (wave content, decoys, ...).
    Spawn(SpawnRequest),
    /// Place an attacker at a cell centre, optionally blocking the cell.
    PlaceTower {
        template: String,
        cell: Cell,
        faction: Faction,
        blocks: bool,
    },
    /// Remove any entity. Stale handles are ignored.
    RemoveEntity { id: EntityId },

    // --- Obstacles ---
    PlaceObstacle { cell: Cell },
    RemoveObstacle { cell: Cell },
    /// Set the traversal cost of an open cell (1 = normal).
    SetTerrainCost { cell: Cell, cost: u8 },

    // --- Simulation control ---
    /// Global multiplier on tick duration, clamped to `[0, MAX_TIME_SCALE]`.
    SetTimeScale { scale: f32 },
    Pause,
    Resume,
}
