//! Flow field navigation toward the objective cell.
//!
//! Built in three passes over the navigation grid:
//!
//! 1. **Cost field:** taken from the `ObstacleGrid` (blocked cells are impassable).
//! 2. **Integration field:** Dijkstra flood from the goal over 4-connected
//!    neighbours; the cost of a step is the cost of the cell being entered.
//! 3. **Vector field:** every reachable non-goal cell points at the 8-neighbour
//!    with the strictly lowest integration value. Diagonals need both adjacent
//!    orthogonal cells open, and ties go to N, E, S, W, NE, SE, SW, NW in that order.
//!
//! Following `next_cell` from any reachable cell strictly decreases the
//! integration value and so always ends on the goal.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rampart_core::config::GridConfig;
use rampart_core::constants::{BLOCKED_CELL_COST, FALLBACK_DIRECTION, UNREACHABLE};
use rampart_core::types::{normalize_or, Cell, Vec2};

use crate::obstacles::ObstacleGrid;

/// Neighbour offsets in tie-break priority order. +y is north.
const NEIGHBORS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, -1),
    (-1, 1),
];

const NO_NEXT: u32 = u32::MAX;

/// Result of sampling the field at a world position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSample {
    /// Unit-length steering direction.
    pub direction: Vec2,
    /// True when the straight-line fallback toward the goal was used.
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct FlowField {
    grid: GridConfig,
    goal: Cell,
    /// Obstacle epoch this field was built from.
    epoch: u64,
    blocked: Vec<bool>,
    integration: Vec<u32>,
    /// Flat index of the neighbour each cell points at, or `NO_NEXT`.
    next: Vec<u32>,
    directions: Vec<Vec2>,
    reachable: usize,
}

impl FlowField {
    /// Build the full field for `goal` from the current obstacle grid.
    ///
    /// The goal is always seeded, even when its own cell is blocked.
    pub fn compute(grid: &GridConfig, obstacles: &ObstacleGrid, goal: Cell) -> Self {
        let width = grid.width as usize;
        let height = grid.height as usize;
        let n = width * height;
        let costs = obstacles.cost_field();
        let blocked: Vec<bool> = costs.iter().map(|&c| c == BLOCKED_CELL_COST).collect();

        // Integration field
        let mut integration = vec![UNREACHABLE; n];
        let mut heap = BinaryHeap::new();
        let goal_idx = (goal.y as usize) * width + goal.x as usize;
        integration[goal_idx] = 0;
        heap.push(Reverse((0u32, goal_idx as u32)));

        while let Some(Reverse((dist, idx))) = heap.pop() {
            let idx = idx as usize;
            if dist > integration[idx] {
                continue;
            }
            let (x, y) = ((idx % width) as i32, (idx / width) as i32);
            for &(dx, dy) in &NEIGHBORS[..4] {
                let Some(nidx) = flat_index(width, height, x + dx, y + dy) else {
                    continue;
                };
                if blocked[nidx] {
                    continue;
                }
                let candidate = dist.saturating_add(costs[nidx] as u32);
                if candidate < integration[nidx] {
                    integration[nidx] = candidate;
                    heap.push(Reverse((candidate, nidx as u32)));
                }
            }
        }

        // Vector field
        let mut next = vec![NO_NEXT; n];
        let mut directions = vec![Vec2::ZERO; n];
        let mut reachable = 0;
        for idx in 0..n {
            if integration[idx] == UNREACHABLE {
                continue;
            }
            reachable += 1;
            if idx == goal_idx {
                continue;
            }
            let (x, y) = ((idx % width) as i32, (idx / width) as i32);
            let mut best = integration[idx];
            let mut best_idx = NO_NEXT;
            let mut best_dir = Vec2::ZERO;
            for &(dx, dy) in &NEIGHBORS {
                let Some(nidx) = flat_index(width, height, x + dx, y + dy) else {
                    continue;
                };
                if dx != 0 && dy != 0 {
                    // No corner cutting
                    let side_a = flat_index(width, height, x + dx, y);
                    let side_b = flat_index(width, height, x, y + dy);
                    let open = |s: Option<usize>| s.is_some_and(|i| !blocked[i]);
                    if !open(side_a) || !open(side_b) {
                        continue;
                    }
                }
                if integration[nidx] < best {
                    best = integration[nidx];
                    best_idx = nidx as u32;
                    best_dir = Vec2::new(dx as f32, dy as f32).normalize();
                }
            }
            next[idx] = best_idx;
            directions[idx] = best_dir;
        }

        Self {
            grid: *grid,
            goal,
            epoch: obstacles.epoch(),
            blocked,
            integration,
            next,
            directions,
            reachable,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Number of cells with a path to the goal, the goal included.
    pub fn reachable_cells(&self) -> usize {
        self.reachable
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.grid
            .contains(cell)
            .then(|| (cell.y * self.grid.width + cell.x) as usize)
    }

    /// Integration value of a cell; `UNREACHABLE` outside the grid.
    pub fn integration_at(&self, cell: Cell) -> u32 {
        self.index(cell).map_or(UNREACHABLE, |i| self.integration[i])
    }

    pub fn is_reachable(&self, cell: Cell) -> bool {
        self.integration_at(cell) != UNREACHABLE
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.index(cell).map_or(true, |i| self.blocked[i])
    }

    /// Stored unit direction of a cell; zero for the goal and unreachable cells.
    pub fn direction_at(&self, cell: Cell) -> Vec2 {
        self.index(cell).map_or(Vec2::ZERO, |i| self.directions[i])
    }

    /// The neighbour a cell's vector points at.
    pub fn next_cell(&self, cell: Cell) -> Option<Cell> {
        let i = self.index(cell)?;
        let n = self.next[i];
        (n != NO_NEXT).then(|| Cell::new(n % self.grid.width, n / self.grid.width))
    }

    /// Steering direction at `pos`, bilinearly blended over the four nearest
    /// cell centres. Blocked and unreachable corners are ignored. Falls back to
    /// a straight line toward the goal when the containing cell is unreachable
    /// or the blend is degenerate.
    pub fn sample(&self, pos: Vec2) -> FlowSample {
        let goal_center = self.grid.cell_center(self.goal);
        let straight = FlowSample {
            direction: normalize_or(goal_center - pos, FALLBACK_DIRECTION),
            fallback: true,
        };

        let cell = self.grid.cell_at(pos);
        if !self.is_reachable(cell) {
            return straight;
        }
        if cell == self.goal {
            return FlowSample {
                fallback: false,
                ..straight
            };
        }

        let local = ((pos - self.grid.origin) / self.grid.cell_size - Vec2::splat(0.5)).clamp(
            Vec2::ZERO,
            Vec2::new(self.grid.width as f32 - 1.0, self.grid.height as f32 - 1.0),
        );
        let base = local.floor();
        let frac = local - base;
        let (bx, by) = (base.x as i32, base.y as i32);

        let mut blended = Vec2::ZERO;
        for (ox, oy, weight) in [
            (0, 0, (1.0 - frac.x) * (1.0 - frac.y)),
            (1, 0, frac.x * (1.0 - frac.y)),
            (0, 1, (1.0 - frac.x) * frac.y),
            (1, 1, frac.x * frac.y),
        ] {
            let (cx, cy) = (bx + ox, by + oy);
            if weight <= 0.0 {
                continue;
            }
            let corner = Cell::new(cx as u32, cy as u32);
            if !self.is_reachable(corner) {
                continue;
            }
            let dir = if corner == self.goal {
                normalize_or(goal_center - pos, Vec2::ZERO)
            } else {
                self.direction_at(corner)
            };
            blended += dir * weight;
        }

        if blended.length_squared() > rampart_core::constants::DEGENERATE_LENGTH_SQ {
            FlowSample {
                direction: blended.normalize(),
                fallback: false,
            }
        } else {
            straight
        }
    }
}

#[inline]
fn flat_index(width: usize, height: usize, x: i32, y: i32) -> Option<usize> {
    (x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height)
        .then(|| y as usize * width + x as usize)
}
