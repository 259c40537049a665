//! Target acquisition for every attacker.
//!
//! Attackers are processed in ascending entity index. Each one first drops
//! targets that died, left range, or stopped being hostile, then fills its
//! free slots with the nearest eligible entities (ties broken by handle).
//! Every selected target takes the full hit, so damage is never split.

use rampart_core::enums::Faction;
use rampart_core::events::TickDiff;
use rampart_core::types::EntityId;

use crate::ecs::World;
use crate::spatial::SpatialIndex;

/// Reusable candidate buffer: (squared distance, handle).
pub type Candidates = Vec<(f32, EntityId)>;

pub fn run(world: &mut World, index: &SpatialIndex, diff: &mut TickDiff, candidates: &mut Candidates) {
    for idx in 0..world.slot_count() {
        let Some(attacker_id) = world.id_at(idx) else {
            continue;
        };
        let Some(mut attacker) = world.attackers[idx].take() else {
            continue;
        };
        let Some(position) = world.transforms[idx].map(|t| t.position) else {
            world.attackers[idx] = Some(attacker);
            continue;
        };
        let faction = world.factions[idx].unwrap_or_default();
        let range_sq = attacker.range * attacker.range;

        if !world.is_active(attacker_id) {
            for target in attacker.targets.drain(..) {
                diff.targets_lost.push((attacker_id, target));
            }
            world.attackers[idx] = Some(attacker);
            continue;
        }

        // (a) re-validate held targets
        attacker.targets.retain(|&target| {
            let keep = is_valid_target(world, target, faction)
                && world
                    .position(target)
                    .is_some_and(|p| p.distance_squared(position) <= range_sq);
            if !keep {
                diff.targets_lost.push((attacker_id, target));
            }
            keep
        });

        // (b)-(d) fill free slots, nearest first
        let free = attacker.free_slots();
        if free > 0 {
            candidates.clear();
            index.for_each_in_radius(position, attacker.range, |entry, dist_sq| {
                if entry.id == attacker_id
                    || !faction.is_hostile_to(entry.faction)
                    || attacker.targets.contains(&entry.id)
                    || !is_valid_target(world, entry.id, faction)
                {
                    return;
                }
                candidates.push((dist_sq, entry.id));
            });
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for &(_, target) in candidates.iter().take(free) {
                attacker.targets.push(target);
                diff.targets_acquired.push((attacker_id, target));
            }
        }

        debug_assert!(attacker.targets.len() <= attacker.max_targets as usize);
        world.attackers[idx] = Some(attacker);
    }
}

/// Alive, not pending destruction, hostile, and carrying live Health.
fn is_valid_target(world: &World, target: EntityId, attacker_faction: Faction) -> bool {
    if !world.is_active(target) {
        return false;
    }
    let idx = target.slot();
    let hostile = world.factions[idx]
        .is_some_and(|f| attacker_faction.is_hostile_to(f));
    hostile && world.healths[idx].is_some_and(|h| !h.is_depleted())
}
