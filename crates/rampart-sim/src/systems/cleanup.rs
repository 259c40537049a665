//! Lifetime expiry for temporary entities.

use rampart_core::enums::DestroyCause;
use rampart_core::events::{EntityDestroyedEvent, SimEvent};

use crate::ecs::World;

/// Count down lifetimes and queue expired entities for destruction.
pub fn mark_expired(world: &mut World, dt: f32, tick: u64, events: &mut Vec<SimEvent>) {
    for idx in 0..world.slot_count() {
        let Some(id) = world.id_at(idx) else {
            continue;
        };
        let Some(lifetime) = world.lifetimes[idx].as_mut() else {
            continue;
        };
        lifetime.remaining_secs -= dt;
        if lifetime.remaining_secs > 0.0 {
            continue;
        }
        if world.queue_destroy(id, DestroyCause::Expiry) {
            events.push(SimEvent::EntityDestroyed(EntityDestroyedEvent {
                id,
                cause: DestroyCause::Expiry,
                position: world.position(id).unwrap_or_default(),
                faction: world.factions[idx].unwrap_or_default(),
                tick,
            }));
        }
    }
}
