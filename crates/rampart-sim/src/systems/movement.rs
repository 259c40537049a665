//! Unit movement: flow field steering blended with same-faction separation.
//!
//! Separation reads neighbour positions from the spatial index, which holds
//! the positions from the start of the tick, so the result does not depend on
//! the order units are moved in.

use log::debug;

use rampart_core::config::{GridConfig, SimTables};
use rampart_core::constants::{DEGENERATE_LENGTH_SQ, FALLBACK_DIRECTION};
use rampart_core::enums::{DestroyCause, Faction, MovementBehavior};
use rampart_core::events::{EntityDestroyedEvent, ObjectiveReachedEvent, SimEvent};
use rampart_core::types::{heading_of, normalize_or, Cell, EntityId, Vec2};

use crate::ecs::World;
use crate::flow_field::FlowField;
use crate::obstacles::ObstacleGrid;
use crate::spatial::SpatialIndex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementStats {
    pub moved: usize,
    /// Units that steered by the straight-line fallback this tick.
    pub fallbacks: usize,
    pub arrived: usize,
}

pub fn run(
    world: &mut World,
    tables: &SimTables,
    field: &FlowField,
    obstacles: &ObstacleGrid,
    index: &SpatialIndex,
    dt: f32,
    tick: u64,
    events: &mut Vec<SimEvent>,
) -> MovementStats {
    let mut stats = MovementStats::default();
    let grid = &tables.grid;
    let objective_center = grid.cell_center(tables.objective.cell);
    let arrival_sq = tables.objective.radius * tables.objective.radius;

    for idx in 0..world.slot_count() {
        let Some(id) = world.id_at(idx) else {
            continue;
        };
        if !world.is_active(id) {
            continue;
        }
        let Some(mobility) = world.mobilities[idx] else {
            continue;
        };
        let Some(transform) = world.transforms[idx] else {
            continue;
        };

        match mobility.behavior {
            MovementBehavior::Stationary => {
                if let Some(v) = world.velocities[idx].as_mut() {
                    v.linear = Vec2::ZERO;
                }
                continue;
            }
            MovementBehavior::FollowFlowField => {}
        }

        let pos = transform.position;
        let faction = world.factions[idx].unwrap_or_default();

        let sample = field.sample(pos);
        if sample.fallback {
            stats.fallbacks += 1;
        }

        let separation = separation_vector(world, index, id, pos, faction, tables);
        let desired = sample.direction + separation * tables.movement.separation_weight;
        let direction = normalize_or(desired, FALLBACK_DIRECTION);
        let speed = mobility.base_speed * mobility.speed_multiplier;
        let step = direction * speed * dt;

        let new_pos = resolve_step(grid, obstacles, pos, step);
        let velocity = if dt > 0.0 { (new_pos - pos) / dt } else { Vec2::ZERO };

        if let Some(t) = world.transforms[idx].as_mut() {
            t.position = new_pos;
            if let Some(heading) = heading_of(velocity) {
                t.rotation = heading;
            }
        }
        if let Some(v) = world.velocities[idx].as_mut() {
            v.linear = velocity;
        }
        if new_pos != pos {
            stats.moved += 1;
        }

        if tables.objective.owner.is_hostile_to(faction)
            && new_pos.distance_squared(objective_center) <= arrival_sq
            && world.queue_destroy(id, DestroyCause::ObjectiveReached)
        {
            stats.arrived += 1;
            let remaining_health = world.healths[idx].map_or(0.0, |h| h.current);
            events.push(SimEvent::ObjectiveReached(ObjectiveReachedEvent {
                id,
                faction,
                remaining_health,
                tick,
            }));
            events.push(SimEvent::EntityDestroyed(EntityDestroyedEvent {
                id,
                cause: DestroyCause::ObjectiveReached,
                position: new_pos,
                faction,
                tick,
            }));
        }
    }

    if stats.fallbacks > 0 {
        debug!(
            "tick {tick}: {} units steering straight at the objective (no flow path)",
            stats.fallbacks
        );
    }
    stats
}

/// Push away from same-faction mobile neighbours, stronger when closer.
fn separation_vector(
    world: &World,
    index: &SpatialIndex,
    id: EntityId,
    pos: Vec2,
    faction: Faction,
    tables: &SimTables,
) -> Vec2 {
    let radius = tables.movement.separation_radius;
    if radius <= 0.0 || tables.movement.separation_weight == 0.0 {
        return Vec2::ZERO;
    }
    let mut push = Vec2::ZERO;
    index.for_each_in_radius(pos, radius, |entry, dist_sq| {
        if entry.id == id || entry.faction != faction {
            return;
        }
        let mobile = world.mobilities[entry.id.slot()]
            .is_some_and(|m| m.behavior == MovementBehavior::FollowFlowField);
        if !mobile {
            return;
        }
        let away = if dist_sq > DEGENERATE_LENGTH_SQ {
            (pos - entry.position) / dist_sq.sqrt()
        } else if id < entry.id {
            // Coincident: split deterministically by handle.
            -FALLBACK_DIRECTION
        } else {
            FALLBACK_DIRECTION
        };
        let falloff = 1.0 - dist_sq.sqrt() / radius;
        push += away * falloff;
    });
    push
}

/// Apply `step`, sliding along a free axis when the full step would enter a
/// blocked cell. Positions stay inside the world bounds.
fn resolve_step(
    grid: &GridConfig,
    obstacles: &ObstacleGrid,
    pos: Vec2,
    step: Vec2,
) -> Vec2 {
    let from = grid.cell_at(pos);
    for candidate in [step, Vec2::new(step.x, 0.0), Vec2::new(0.0, step.y)] {
        if candidate == Vec2::ZERO {
            continue;
        }
        let to_pos = grid.clamp_position(pos + candidate);
        if can_enter(obstacles, from, grid.cell_at(to_pos)) {
            return to_pos;
        }
    }
    pos
}

/// Whether a unit in `from` may move into `to`. Units already standing in a
/// blocked cell may always leave it.
fn can_enter(obstacles: &ObstacleGrid, from: Cell, to: Cell) -> bool {
    if from == to || obstacles.is_blocked(from) {
        return true;
    }
    if obstacles.is_blocked(to) {
        return false;
    }
    if from.x != to.x && from.y != to.y {
        // Diagonal cell change: both orthogonal cells must be open.
        let side_a = Cell::new(to.x, from.y);
        let side_b = Cell::new(from.x, to.y);
        return !obstacles.is_blocked(side_a) && !obstacles.is_blocked(side_b);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridConfig {
        GridConfig {
            width: 4,
            height: 4,
            cell_size: 10.0,
            origin: Vec2::ZERO,
        }
    }

    #[test]
    fn step_into_blocked_cell_slides_along_free_axis() {
        let g = grid();
        let mut obstacles = ObstacleGrid::new(4, 4);
        obstacles.block(Cell::new(2, 1));
        // Heading NE from (1, 1) toward the blocked (2, 1).
        let pos = Vec2::new(19.0, 15.0);
        let out = resolve_step(&g, &obstacles, pos, Vec2::new(2.0, 1.0));
        assert_eq!(out, Vec2::new(19.0, 16.0));
    }

    #[test]
    fn diagonal_corner_squeeze_is_refused() {
        let g = grid();
        let mut obstacles = ObstacleGrid::new(4, 4);
        obstacles.block(Cell::new(2, 1));
        obstacles.block(Cell::new(1, 2));
        let pos = Vec2::new(19.5, 19.5);
        let out = resolve_step(&g, &obstacles, pos, Vec2::new(1.0, 1.0));
        assert_eq!(out, pos);
    }

    #[test]
    fn units_inside_blocked_cells_can_leave() {
        let g = grid();
        let mut obstacles = ObstacleGrid::new(4, 4);
        obstacles.block(Cell::new(1, 1));
        let out = resolve_step(&g, &obstacles, Vec2::new(15.0, 15.0), Vec2::new(6.0, 0.0));
        assert_eq!(out, Vec2::new(21.0, 15.0));
    }

    #[test]
    fn steps_clamp_to_world_bounds() {
        let g = grid();
        let obstacles = ObstacleGrid::new(4, 4);
        let out = resolve_step(&g, &obstacles, Vec2::new(39.0, 5.0), Vec2::new(5.0, 0.0));
        assert_eq!(out, Vec2::new(40.0, 5.0));
    }
}
