use rampart_core::types::EntityId;

/// Issues and retires generational entity handles.
///
/// `allocate` reuses the most recently freed index, bumping that slot's
/// generation so handles taken before the reuse become stale. Generations
/// only ever increase.
pub struct EntityAllocator {
    generations: Vec<u32>,
    live: Vec<bool>,
    free_indices: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            live: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_indices.pop() {
            let slot = index as usize;
            self.generations[slot] += 1;
            self.live[slot] = true;
            EntityId::new(index, self.generations[slot])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.live.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Free the slot behind `id`. Returns false for stale or already-freed handles.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.live[id.slot()] = false;
        self.free_indices.push(id.index);
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.slot();
        slot < self.generations.len() && self.live[slot] && self.generations[slot] == id.generation
    }

    /// Handle of the entity currently occupying `index`, if any.
    pub fn live_id(&self, index: u32) -> Option<EntityId> {
        let slot = index as usize;
        if slot < self.live.len() && self.live[slot] {
            Some(EntityId::new(index, self.generations[slot]))
        } else {
            None
        }
    }

    /// Number of slots ever allocated (live or free).
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_deallocate() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert_eq!(e0.index, 0);
        assert_eq!(e0.generation, 0);
        assert!(alloc.is_alive(e0));

        assert!(alloc.deallocate(e0));
        assert!(!alloc.is_alive(e0));

        let e0_reuse = alloc.allocate();
        assert_eq!(e0_reuse.index, 0);
        assert_eq!(e0_reuse.generation, 1);
        assert!(alloc.is_alive(e0_reuse));
        assert!(!alloc.is_alive(e0));
    }

    #[test]
    fn sequential_allocation() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        assert_eq!(e0.index, 0);
        assert_eq!(e1.index, 1);
        assert_eq!(e2.index, 2);
        assert_eq!(alloc.slot_count(), 3);
    }

    #[test]
    fn stale_handle_deallocate_is_noop() {
        let mut alloc = EntityAllocator::new();
        let first = alloc.allocate();
        alloc.deallocate(first);
        let second = alloc.allocate();

        assert!(!alloc.deallocate(first));
        assert!(alloc.is_alive(second));
        assert!(!alloc.deallocate(first), "double free stays a no-op");
    }

    #[test]
    fn generations_only_increase_across_reuse() {
        let mut alloc = EntityAllocator::new();
        let mut last = alloc.allocate();
        for _ in 0..10 {
            alloc.deallocate(last);
            let next = alloc.allocate();
            assert_eq!(next.index, last.index);
            assert!(next.generation > last.generation);
            last = next;
        }
    }

    #[test]
    fn live_id_reports_current_generation() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        assert_eq!(alloc.live_id(0), Some(a));
        alloc.deallocate(a);
        assert_eq!(alloc.live_id(0), None);
        assert_eq!(alloc.live_id(99), None);
    }
}
