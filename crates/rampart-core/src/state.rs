//! Read-only per-tick snapshot handed to presentation and game-flow collaborators.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::{SimEvent, TickDiff};
use crate::types::{EntityId, SimTime, Vec2};

/// Complete visible simulation state after a tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub time: SimTime,
    pub phase: SimPhase,
    pub time_scale: f32,
    /// Epoch of the flow field units are currently following.
    pub flow_epoch: u64,
    /// Epoch of the obstacle set; differs from `flow_epoch` while a
    /// background recompute is in flight.
    pub obstacle_epoch: u64,
    pub entities: Vec<EntityView>,
    pub events: Vec<SimEvent>,
    pub diff: TickDiff,
}

/// One live entity as seen by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub template: String,
    pub position: Vec2,
    pub rotation: f32,
    pub faction: Faction,
    /// `None` for entities without Health.
    pub health_fraction: Option<f32>,
    /// `None` for unshielded entities.
    pub shield_fraction: Option<f32>,
    pub status: Vec<StatusKind>,
    /// Number of targets currently held, for attackers.
    pub target_count: Option<u32>,
}

impl SimSnapshot {
    pub fn entity(&self, id: EntityId) -> Option<&EntityView> {
        self.entities.iter().find(|e| e.id == id)
    }
}
