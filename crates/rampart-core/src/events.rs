//! Events emitted by the simulation for scoring, economy and wave progression.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{EntityId, Vec2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDestroyedEvent {
    pub id: EntityId,
    pub cause: DestroyCause,
    pub position: Vec2,
    pub faction: Faction,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageAppliedEvent {
    /// Attacker, burn source, or the bursting unit.
    pub attacker: EntityId,
    pub target: EntityId,
    /// Amount removed from the shield.
    pub shield_damage: f32,
    /// Amount removed from health.
    pub hull_damage: f32,
    pub source: DamageSource,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponFiredEvent {
    pub attacker: EntityId,
    pub targets: Vec<EntityId>,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAppliedEvent {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: StatusKind,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveReachedEvent {
    pub id: EntityId,
    pub faction: Faction,
    /// Health left on arrival, for leak damage scoring.
    pub remaining_health: f32,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    EntityDestroyed(EntityDestroyedEvent),
    DamageApplied(DamageAppliedEvent),
    WeaponFired(WeaponFiredEvent),
    StatusApplied(StatusAppliedEvent),
    ObjectiveReached(ObjectiveReachedEvent),
}

/// Explicit per-tick change lists, replacing implicit change tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickDiff {
    /// Entities created at this tick's boundary.
    pub created: Vec<EntityId>,
    /// Entities physically freed at this tick's boundary.
    pub destroyed: Vec<EntityId>,
    /// (attacker, target) pairs that entered a target list this tick.
    pub targets_acquired: Vec<(EntityId, EntityId)>,
    /// (attacker, target) pairs dropped during re-validation this tick.
    pub targets_lost: Vec<(EntityId, EntityId)>,
}

impl TickDiff {
    pub fn clear(&mut self) {
        self.created.clear();
        self.destroyed.clear();
        self.targets_acquired.clear();
        self.targets_lost.clear();
    }
}
