//! Uniform-grid spatial index for radius and rectangle queries.
//!
//! Rebuilt from scratch every tick with a counting sort into one dense
//! entry array, so a bucket is a contiguous slice and no hash maps are
//! involved. Cells outside the world bounds clamp to the border cells;
//! exact distances are always tested against the stored positions.

use rampart_core::config::GridConfig;
use rampart_core::enums::Faction;
use rampart_core::types::{EntityId, Vec2};

use crate::ecs::World;

/// One indexed entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub id: EntityId,
    pub position: Vec2,
    pub faction: Faction,
}

pub struct SpatialIndex {
    origin: Vec2,
    cell_size: f32,
    cols: u32,
    rows: u32,
    /// `cell_start[c]..cell_start[c + 1]` is bucket `c` in `entries`.
    cell_start: Vec<u32>,
    entries: Vec<SpatialEntry>,
    // Scratch reused across rebuilds.
    staged: Vec<(u32, SpatialEntry)>,
}

impl SpatialIndex {
    /// Index covering the grid's world bounds with square buckets of `cell_size`.
    pub fn new(grid: &GridConfig, cell_size: f32) -> Self {
        let extent = grid.world_max() - grid.world_min();
        let cols = ((extent.x / cell_size).ceil() as u32).max(1);
        let rows = ((extent.y / cell_size).ceil() as u32).max(1);
        Self {
            origin: grid.world_min(),
            cell_size,
            cols,
            rows,
            cell_start: vec![0; (cols * rows + 1) as usize],
            entries: Vec::new(),
            staged: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-insert every live entity that has a transform, doomed ones included.
    pub fn rebuild(&mut self, world: &World) {
        let entries = (0..world.slot_count()).filter_map(|idx| {
            let id = world.id_at(idx)?;
            let transform = world.transforms[idx]?;
            Some(SpatialEntry {
                id,
                position: transform.position,
                faction: world.factions[idx].unwrap_or_default(),
            })
        });
        self.rebuild_from(entries);
    }

    /// Rebuild from an arbitrary entry stream. Entries keep their relative
    /// order inside each bucket.
    pub fn rebuild_from(&mut self, entries: impl IntoIterator<Item = SpatialEntry>) {
        self.staged.clear();
        for entry in entries {
            let cell = self.bucket_of(entry.position);
            self.staged.push((cell, entry));
        }

        // Counting sort: histogram, prefix sum, scatter.
        self.cell_start.iter_mut().for_each(|c| *c = 0);
        for &(cell, _) in &self.staged {
            self.cell_start[cell as usize + 1] += 1;
        }
        for c in 1..self.cell_start.len() {
            self.cell_start[c] += self.cell_start[c - 1];
        }

        let placeholder = SpatialEntry {
            id: EntityId::new(0, 0),
            position: Vec2::ZERO,
            faction: Faction::default(),
        };
        self.entries.clear();
        self.entries.resize(self.staged.len(), placeholder);
        let mut cursor = self.cell_start.clone();
        for &(cell, entry) in &self.staged {
            let slot = &mut cursor[cell as usize];
            self.entries[*slot as usize] = entry;
            *slot += 1;
        }
    }

    /// Call `f` with every entry within `radius` of `center` and its squared
    /// distance. Visits buckets row-major, entries in insertion order.
    pub fn for_each_in_radius(
        &self,
        center: Vec2,
        radius: f32,
        mut f: impl FnMut(&SpatialEntry, f32),
    ) {
        if !(radius >= 0.0) || self.entries.is_empty() {
            return;
        }
        let radius_sq = radius * radius;
        let extent = Vec2::splat(radius);
        self.for_each_bucket(center - extent, center + extent, |entry| {
            let dist_sq = entry.position.distance_squared(center);
            if dist_sq <= radius_sq {
                f(entry, dist_sq);
            }
        });
    }

    pub fn query_radius_into(&self, center: Vec2, radius: f32, out: &mut Vec<SpatialEntry>) {
        out.clear();
        self.for_each_in_radius(center, radius, |entry, _| out.push(*entry));
    }

    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<SpatialEntry> {
        let mut out = Vec::new();
        self.query_radius_into(center, radius, &mut out);
        out
    }

    /// Entries inside the axis-aligned rectangle spanned by `a` and `b`, inclusive.
    pub fn query_rect_into(&self, a: Vec2, b: Vec2, out: &mut Vec<SpatialEntry>) {
        out.clear();
        let (min, max) = (a.min(b), a.max(b));
        self.for_each_bucket(min, max, |entry| {
            let p = entry.position;
            if p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y {
                out.push(*entry);
            }
        });
    }

    pub fn query_rect(&self, a: Vec2, b: Vec2) -> Vec<SpatialEntry> {
        let mut out = Vec::new();
        self.query_rect_into(a, b, &mut out);
        out
    }

    fn for_each_bucket(&self, min: Vec2, max: Vec2, mut f: impl FnMut(&SpatialEntry)) {
        let (x0, y0) = self.cell_coords(min);
        let (x1, y1) = self.cell_coords(max);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let c = (y * self.cols + x) as usize;
                let start = self.cell_start[c] as usize;
                let end = self.cell_start[c + 1] as usize;
                for entry in &self.entries[start..end] {
                    f(entry);
                }
            }
        }
    }

    /// Bucket coordinates of `pos`, clamped to the index.
    fn cell_coords(&self, pos: Vec2) -> (u32, u32) {
        let local = (pos - self.origin) / self.cell_size;
        // NaN maps to 0 through the float-to-int cast.
        let x = (local.x.floor().max(0.0) as u32).min(self.cols - 1);
        let y = (local.y.floor().max(0.0) as u32).min(self.rows - 1);
        (x, y)
    }

    #[inline]
    fn bucket_of(&self, pos: Vec2) -> u32 {
        let (x, y) = self.cell_coords(pos);
        y * self.cols + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> GridConfig {
        GridConfig {
            width: 10,
            height: 10,
            cell_size: 10.0,
            origin: Vec2::ZERO,
        }
    }

    fn entry(index: u32, x: f32, y: f32) -> SpatialEntry {
        SpatialEntry {
            id: EntityId::new(index, 0),
            position: Vec2::new(x, y),
            faction: Faction::INVADER,
        }
    }

    #[test]
    fn radius_query_includes_boundary_distance() {
        let mut index = SpatialIndex::new(&grid(), 25.0);
        index.rebuild_from([entry(0, 50.0, 50.0), entry(1, 60.0, 50.0), entry(2, 60.1, 50.0)]);
        let hits: Vec<u32> = index
            .query_radius(Vec2::new(50.0, 50.0), 10.0)
            .iter()
            .map(|e| e.id.index)
            .collect();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn out_of_bounds_positions_and_queries_clamp() {
        let mut index = SpatialIndex::new(&grid(), 25.0);
        index.rebuild_from([entry(0, -30.0, -30.0), entry(1, 500.0, 500.0)]);
        assert_eq!(index.len(), 2);
        let near_origin = index.query_radius(Vec2::new(-40.0, -40.0), 20.0);
        assert_eq!(near_origin.len(), 1);
        assert_eq!(near_origin[0].id.index, 0);
        let far = index.query_rect(Vec2::new(400.0, 400.0), Vec2::new(900.0, 900.0));
        assert_eq!(far.len(), 1);
        assert_eq!(far[0].id.index, 1);
    }

    #[test]
    fn negative_radius_finds_nothing() {
        let mut index = SpatialIndex::new(&grid(), 25.0);
        index.rebuild_from([entry(0, 5.0, 5.0)]);
        assert!(index.query_radius(Vec2::new(5.0, 5.0), -1.0).is_empty());
    }

    #[test]
    fn results_are_row_major_then_insertion_order() {
        let mut index = SpatialIndex::new(&grid(), 50.0);
        // Bucket (1, 0) then (0, 1): row-major puts (1, 0) first.
        index.rebuild_from([entry(0, 10.0, 60.0), entry(1, 60.0, 10.0), entry(2, 20.0, 70.0)]);
        let order: Vec<u32> = index
            .query_rect(Vec2::ZERO, Vec2::splat(100.0))
            .iter()
            .map(|e| e.id.index)
            .collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn rect_query_accepts_swapped_corners() {
        let mut index = SpatialIndex::new(&grid(), 25.0);
        index.rebuild_from([entry(0, 30.0, 30.0)]);
        assert_eq!(index.query_rect(Vec2::splat(40.0), Vec2::splat(20.0)).len(), 1);
    }

    #[test]
    fn rebuild_discards_previous_contents() {
        let mut index = SpatialIndex::new(&grid(), 25.0);
        index.rebuild_from([entry(0, 30.0, 30.0), entry(1, 31.0, 30.0)]);
        index.rebuild_from([entry(2, 80.0, 80.0)]);
        assert_eq!(index.len(), 1);
        assert!(index.query_radius(Vec2::new(30.0, 30.0), 5.0).is_empty());
    }

    proptest! {
        #[test]
        fn radius_query_matches_brute_force(
            points in prop::collection::vec((-20.0f32..120.0, -20.0f32..120.0), 0..80),
            cx in -30.0f32..130.0,
            cy in -30.0f32..130.0,
            radius in 0.0f32..60.0,
            cell_size in 5.0f32..40.0,
        ) {
            let mut index = SpatialIndex::new(&grid(), cell_size);
            let entries: Vec<SpatialEntry> = points
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| entry(i as u32, x, y))
                .collect();
            index.rebuild_from(entries.iter().copied());

            let center = Vec2::new(cx, cy);
            let mut got: Vec<u32> = index
                .query_radius(center, radius)
                .iter()
                .map(|e| e.id.index)
                .collect();
            got.sort_unstable();
            let expected: Vec<u32> = entries
                .iter()
                .filter(|e| e.position.distance_squared(center) <= radius * radius)
                .map(|e| e.id.index)
                .collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn rect_query_matches_brute_force(
            points in prop::collection::vec((-20.0f32..120.0, -20.0f32..120.0), 0..80),
            ax in -30.0f32..130.0,
            ay in -30.0f32..130.0,
            bx in -30.0f32..130.0,
            by in -30.0f32..130.0,
        ) {
            let mut index = SpatialIndex::new(&grid(), 17.0);
            let entries: Vec<SpatialEntry> = points
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| entry(i as u32, x, y))
                .collect();
            index.rebuild_from(entries.iter().copied());

            let (a, b) = (Vec2::new(ax, ay), Vec2::new(bx, by));
            let (min, max) = (a.min(b), a.max(b));
            let mut got: Vec<u32> = index.query_rect(a, b).iter().map(|e| e.id.index).collect();
            got.sort_unstable();
            let expected: Vec<u32> = entries
                .iter()
                .filter(|e| {
                    let p = e.position;
                    p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
                })
                .map(|e| e.id.index)
                .collect();
            prop_assert_eq!(got, expected);
        }
    }
}
