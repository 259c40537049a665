//! Snapshot system: builds the read-only `SimSnapshot` handed out every tick.
//!
//! This system never modifies the world.

use rampart_core::enums::{SimPhase, StatusKind};
use rampart_core::events::{SimEvent, TickDiff};
use rampart_core::state::{EntityView, SimSnapshot};
use rampart_core::types::SimTime;

use crate::ecs::World;

/// Frame-level values that live outside the world.
pub struct SnapshotHeader {
    pub time: SimTime,
    pub phase: SimPhase,
    pub time_scale: f32,
    pub flow_epoch: u64,
    pub obstacle_epoch: u64,
}

/// Build the snapshot. Entities already queued for destruction are left out;
/// their `EntityDestroyed` event is in `events`.
pub fn build_snapshot(
    world: &World,
    header: SnapshotHeader,
    events: Vec<SimEvent>,
    diff: TickDiff,
) -> SimSnapshot {
    SimSnapshot {
        time: header.time,
        phase: header.phase,
        time_scale: header.time_scale,
        flow_epoch: header.flow_epoch,
        obstacle_epoch: header.obstacle_epoch,
        entities: build_entities(world),
        events,
        diff,
    }
}

fn build_entities(world: &World) -> Vec<EntityView> {
    world
        .alive_entities()
        .into_iter()
        .filter_map(|idx| {
            let id = world.id_at(idx)?;
            if !world.is_active(id) {
                return None;
            }
            let transform = world.transforms[idx]?;
            Some(EntityView {
                id,
                template: world.markers[idx]
                    .as_ref()
                    .map(|m| m.template.clone())
                    .unwrap_or_default(),
                position: transform.position,
                rotation: transform.rotation,
                faction: world.factions[idx].unwrap_or_default(),
                health_fraction: world.healths[idx].map(|h| h.fraction()),
                shield_fraction: world.shields[idx].map(|s| s.fraction()),
                status: status_tags(world, idx),
                target_count: world.attackers[idx]
                    .as_ref()
                    .map(|a| a.targets.len() as u32),
            })
        })
        .collect()
}

fn status_tags(world: &World, idx: usize) -> Vec<StatusKind> {
    let Some(statuses) = world.statuses[idx].as_ref() else {
        return Vec::new();
    };
    let mut tags = Vec::new();
    if statuses.burning.is_some() {
        tags.push(StatusKind::Burning);
    }
    if statuses.slowed.is_some() {
        tags.push(StatusKind::Slowed);
    }
    if statuses.drained.is_some() {
        tags.push(StatusKind::Drained);
    }
    tags
}
