use rampart_core::components::*;
use rampart_core::enums::{DestroyCause, Faction};
use rampart_core::types::{Cell, EntityId, Vec2};

use super::entity::EntityAllocator;

/// An entity freed by `World::finalize_destructions`.
#[derive(Debug, Clone, Copy)]
pub struct FreedEntity {
    pub id: EntityId,
    pub cause: DestroyCause,
    /// Set when the entity held a grid cell that must be released.
    pub anchor: Option<Anchor>,
}

/// SoA (Struct of Arrays) world.
/// Each component type has its own `Vec<Option<T>>` storage indexed by entity index.
///
/// Destruction is deferred: `queue_destroy` only marks the entity, and the slot
/// is cleared by `finalize_destructions` at the next tick boundary so that
/// indices stay stable while systems iterate.
pub struct World {
    allocator: EntityAllocator,
    doomed: Vec<bool>,
    pending: Vec<(EntityId, DestroyCause)>,

    // Component storage, one Vec per component type
    pub transforms: Vec<Option<Transform>>,
    pub velocities: Vec<Option<Velocity>>,
    pub factions: Vec<Option<Faction>>,
    pub healths: Vec<Option<Health>>,
    pub shields: Vec<Option<Shield>>,
    pub attackers: Vec<Option<Attacker>>,
    pub mobilities: Vec<Option<Mobility>>,
    pub statuses: Vec<Option<StatusEffects>>,
    pub lifetimes: Vec<Option<Lifetime>>,
    pub anchors: Vec<Option<Anchor>>,
    pub markers: Vec<Option<Marker>>,
    pub on_death: Vec<Option<OnDeath>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            doomed: Vec::new(),
            pending: Vec::new(),
            transforms: Vec::new(),
            velocities: Vec::new(),
            factions: Vec::new(),
            healths: Vec::new(),
            shields: Vec::new(),
            attackers: Vec::new(),
            mobilities: Vec::new(),
            statuses: Vec::new(),
            lifetimes: Vec::new(),
            anchors: Vec::new(),
            markers: Vec::new(),
            on_death: Vec::new(),
        }
    }

    /// Allocate a handle with empty components.
    pub fn spawn(&mut self) -> EntityId {
        let id = self.allocator.allocate();
        let idx = id.slot();

        // Grow all storage to accommodate
        while self.doomed.len() <= idx {
            self.doomed.push(false);
            self.transforms.push(None);
            self.velocities.push(None);
            self.factions.push(None);
            self.healths.push(None);
            self.shields.push(None);
            self.attackers.push(None);
            self.mobilities.push(None);
            self.statuses.push(None);
            self.lifetimes.push(None);
            self.anchors.push(None);
            self.markers.push(None);
            self.on_death.push(None);
        }

        self.doomed[idx] = false;
        id
    }

    /// Mark an entity for destruction at the next tick boundary.
    ///
    /// Returns false when the handle is stale or the entity is already queued;
    /// destruction races are expected and are not errors.
    pub fn queue_destroy(&mut self, id: EntityId, cause: DestroyCause) -> bool {
        if !self.allocator.is_alive(id) {
            log::trace!("ignoring destroy of stale handle {id}");
            return false;
        }
        let idx = id.slot();
        if self.doomed[idx] {
            return false;
        }
        self.doomed[idx] = true;
        self.pending.push((id, cause));
        true
    }

    /// Clear every queued entity and return its handle to the free list.
    pub fn finalize_destructions(&mut self, freed: &mut Vec<FreedEntity>) {
        for (id, cause) in std::mem::take(&mut self.pending) {
            if !self.allocator.is_alive(id) {
                continue;
            }
            let idx = id.slot();
            freed.push(FreedEntity {
                id,
                cause,
                anchor: self.anchors[idx],
            });
            self.clear_slot(idx);
            self.allocator.deallocate(id);
        }
    }

    fn clear_slot(&mut self, idx: usize) {
        self.doomed[idx] = false;
        self.transforms[idx] = None;
        self.velocities[idx] = None;
        self.factions[idx] = None;
        self.healths[idx] = None;
        self.shields[idx] = None;
        self.attackers[idx] = None;
        self.mobilities[idx] = None;
        self.statuses[idx] = None;
        self.lifetimes[idx] = None;
        self.anchors[idx] = None;
        self.markers[idx] = None;
        self.on_death[idx] = None;
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    /// Alive and not queued for destruction.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id) && !self.doomed[id.slot()]
    }

    pub fn is_doomed(&self, idx: usize) -> bool {
        self.doomed.get(idx).copied().unwrap_or(false)
    }

    /// Handle of the live entity in slot `idx`.
    pub fn id_at(&self, idx: usize) -> Option<EntityId> {
        self.allocator.live_id(idx as u32)
    }

    /// Number of slots, live or free. Iterate `0..slot_count()` with `id_at`.
    pub fn slot_count(&self) -> usize {
        self.doomed.len()
    }

    pub fn entity_count(&self) -> usize {
        (0..self.slot_count()).filter(|&i| self.id_at(i).is_some()).count()
    }

    /// Iterate over all alive entity indices in ascending order.
    pub fn alive_entities(&self) -> Vec<usize> {
        (0..self.slot_count())
            .filter(|&i| self.id_at(i).is_some())
            .collect()
    }

    /// Whether a live blocking tower is anchored to `cell`.
    pub fn anchors_blocking(&self, cell: Cell) -> bool {
        self.anchors
            .iter()
            .flatten()
            .any(|anchor| anchor.blocks && anchor.cell == cell)
    }

    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        if !self.is_alive(id) {
            return None;
        }
        self.transforms[id.slot()].map(|t| t.position)
    }

    pub fn health(&self, id: EntityId) -> Option<Health> {
        if !self.is_alive(id) {
            return None;
        }
        self.healths[id.slot()]
    }

    pub fn shield(&self, id: EntityId) -> Option<Shield> {
        if !self.is_alive(id) {
            return None;
        }
        self.shields[id.slot()]
    }

    pub fn attacker(&self, id: EntityId) -> Option<&Attacker> {
        if !self.is_alive(id) {
            return None;
        }
        self.attackers[id.slot()].as_ref()
    }

    pub fn status(&self, id: EntityId) -> Option<&StatusEffects> {
        if !self.is_alive(id) {
            return None;
        }
        self.statuses[id.slot()].as_ref()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_deferred_destroy() {
        let mut world = World::new();
        let e = world.spawn();
        world.transforms[e.slot()] = Some(Transform::default());
        assert!(world.is_alive(e));
        assert_eq!(world.entity_count(), 1);

        assert!(world.queue_destroy(e, DestroyCause::CombatKill));
        // Still occupies its slot until the next boundary.
        assert!(world.is_alive(e));
        assert!(!world.is_active(e));
        assert!(world.transforms[e.slot()].is_some());

        let mut freed = Vec::new();
        world.finalize_destructions(&mut freed);
        assert_eq!(freed.len(), 1);
        assert_eq!(freed[0].id, e);
        assert_eq!(freed[0].cause, DestroyCause::CombatKill);
        assert!(!world.is_alive(e));
        assert!(world.transforms[e.slot()].is_none());
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn double_queue_and_stale_handles_are_noops() {
        let mut world = World::new();
        let e = world.spawn();
        assert!(world.queue_destroy(e, DestroyCause::Expiry));
        assert!(!world.queue_destroy(e, DestroyCause::CombatKill));

        let mut freed = Vec::new();
        world.finalize_destructions(&mut freed);
        assert_eq!(freed.len(), 1);
        assert_eq!(freed[0].cause, DestroyCause::Expiry);

        let reused = world.spawn();
        assert_eq!(reused.index, e.index);
        assert!(!world.queue_destroy(e, DestroyCause::Removed));
        assert!(world.is_active(reused));
        assert!(world.position(e).is_none());
    }

    #[test]
    fn freed_entity_reports_anchor() {
        let mut world = World::new();
        let e = world.spawn();
        let anchor = Anchor {
            cell: rampart_core::types::Cell::new(3, 4),
            blocks: true,
        };
        world.anchors[e.slot()] = Some(anchor);
        world.queue_destroy(e, DestroyCause::Removed);
        let mut freed = Vec::new();
        world.finalize_destructions(&mut freed);
        assert_eq!(freed[0].anchor, Some(anchor));
    }

    #[test]
    fn alive_entities_skips_freed_slots() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        let c = world.spawn();
        world.queue_destroy(b, DestroyCause::Removed);
        let mut freed = Vec::new();
        world.finalize_destructions(&mut freed);
        assert_eq!(world.alive_entities(), vec![a.slot(), c.slot()]);
    }
}
