//! Simulation engine.
//!
//! `Simulation` owns the world, spatial index, obstacle grid, flow field
//! buffer, tables and RNG. It applies queued commands at tick boundaries, runs
//! the systems in a fixed order and produces a `SimSnapshot` per tick.
//! Completely headless, so whole runs can be compared in tests.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rampart_core::commands::{SimCommand, SpawnRequest};
use rampart_core::config::SimTables;
use rampart_core::constants::{DT, MAX_TIME_SCALE};
use rampart_core::enums::{DestroyCause, Faction, SimPhase};
use rampart_core::events::{EntityDestroyedEvent, SimEvent, TickDiff};
use rampart_core::state::SimSnapshot;
use rampart_core::types::{Cell, EntityId, SimTime};

use crate::ecs::{FreedEntity, World};
use crate::flow_buffer::FlowFieldBuffer;
use crate::flow_field::FlowField;
use crate::obstacles::ObstacleGrid;
use crate::spatial::{SpatialEntry, SpatialIndex};
use crate::systems;
use crate::systems::movement::MovementStats;
use crate::systems::snapshot::SnapshotHeader;
use crate::systems::targeting::Candidates;

/// Configuration for starting a new simulation.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Initial time scale (1.0 = normal).
    pub time_scale: f32,
    /// Recompute the flow field on a background thread.
    pub async_flow_field: bool,
    /// Static tables; expected to have passed `SimTables::validate`.
    pub tables: SimTables,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            time_scale: 1.0,
            async_flow_field: false,
            tables: SimTables::default(),
        }
    }
}

/// A creation request held until the next running tick boundary.
#[derive(Debug, Clone)]
enum PendingSpawn {
    Unit(SpawnRequest),
    Tower {
        template: String,
        cell: Cell,
        faction: Faction,
        blocks: bool,
    },
}

/// The simulation engine. Owns the world and all sim state.
pub struct Simulation {
    tables: SimTables,
    world: World,
    index: SpatialIndex,
    obstacles: ObstacleGrid,
    flow: FlowFieldBuffer,
    rng: ChaCha8Rng,
    time: SimTime,
    phase: SimPhase,
    time_scale: f32,
    command_queue: VecDeque<SimCommand>,
    pending_spawns: Vec<PendingSpawn>,
    events: Vec<SimEvent>,
    diff: TickDiff,

    // Per-tick scratch, reused to avoid allocation.
    freed: Vec<FreedEntity>,
    candidates: Candidates,
    nearby: Vec<SpatialEntry>,
    last_movement: MovementStats,
}

impl Simulation {
    /// Create a new simulation with the given config.
    pub fn new(config: SimConfig) -> Self {
        let tables = config.tables;
        debug_assert!(tables.validate().is_ok(), "simulation started with invalid tables");

        let obstacles = ObstacleGrid::new(tables.grid.width, tables.grid.height);
        let goal = tables.objective.cell;
        let flow = if config.async_flow_field {
            FlowFieldBuffer::new_async(&tables.grid, &obstacles, goal)
        } else {
            FlowFieldBuffer::new_sync(&tables.grid, &obstacles, goal)
        };
        info!(
            "simulation ready: seed {}, grid {}x{}, objective ({}, {}), {} flow field",
            config.seed,
            tables.grid.width,
            tables.grid.height,
            goal.x,
            goal.y,
            if flow.is_async() { "async" } else { "inline" }
        );

        Self {
            index: SpatialIndex::new(&tables.grid, tables.spatial_cell_size),
            world: World::new(),
            obstacles,
            flow,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            time: SimTime::default(),
            phase: SimPhase::default(),
            time_scale: sanitize_time_scale(config.time_scale).unwrap_or(1.0),
            command_queue: VecDeque::new(),
            pending_spawns: Vec::new(),
            events: Vec::new(),
            diff: TickDiff::default(),
            freed: Vec::new(),
            candidates: Vec::new(),
            nearby: Vec::new(),
            last_movement: MovementStats::default(),
            tables,
        }
    }

    /// Queue a command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: SimCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = SimCommand>) {
        self.command_queue.extend(commands);
    }

    /// Create an entity right away, outside the tick. For scenario setup.
    pub fn spawn_immediate(&mut self, request: &SpawnRequest) -> Option<EntityId> {
        let id = systems::spawn::spawn_unit(&mut self.world, &self.tables, request)?;
        self.diff.created.push(id);
        Some(id)
    }

    /// Place a tower right away, outside the tick. For scenario setup.
    pub fn place_tower_immediate(
        &mut self,
        template: &str,
        cell: Cell,
        faction: Faction,
        blocks: bool,
    ) -> Option<EntityId> {
        let id = self.create_tower(template, cell, faction, blocks)?;
        self.diff.created.push(id);
        Some(id)
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> SimSnapshot {
        self.process_commands();

        if self.phase == SimPhase::Running {
            let dt = DT * self.time_scale;
            self.run_systems(dt);
            self.time.advance(dt);
        }

        let header = SnapshotHeader {
            time: self.time,
            phase: self.phase,
            time_scale: self.time_scale,
            flow_epoch: self.flow.active_epoch(),
            obstacle_epoch: self.obstacles.epoch(),
        };
        systems::snapshot::build_snapshot(
            &self.world,
            header,
            std::mem::take(&mut self.events),
            std::mem::take(&mut self.diff),
        )
    }

    /// Block until the flow field matches the current obstacle epoch.
    pub fn wait_for_flow_field(&mut self) {
        self.flow.wait_until_current();
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for tests that need to stage exact states.
    #[cfg(test)]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tables(&self) -> &SimTables {
        &self.tables
    }

    pub fn obstacles(&self) -> &ObstacleGrid {
        &self.obstacles
    }

    /// The flow field units are currently following.
    pub fn flow_field(&self) -> Arc<FlowField> {
        self.flow.active()
    }

    pub fn pending_spawn_count(&self) -> usize {
        self.pending_spawns.len()
    }

    pub fn last_movement_stats(&self) -> MovementStats {
        self.last_movement
    }

    /// Process all queued commands.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    /// Handle a single command.
    fn handle_command(&mut self, command: SimCommand) {
        match command {
            SimCommand::Spawn(request) => {
                self.pending_spawns.push(PendingSpawn::Unit(request));
            }
            SimCommand::PlaceTower {
                template,
                cell,
                faction,
                blocks,
            } => {
                self.pending_spawns.push(PendingSpawn::Tower {
                    template,
                    cell,
                    faction,
                    blocks,
                });
            }
            SimCommand::RemoveEntity { id } => {
                if self.world.queue_destroy(id, DestroyCause::Removed) {
                    let idx = id.slot();
                    self.events.push(SimEvent::EntityDestroyed(EntityDestroyedEvent {
                        id,
                        cause: DestroyCause::Removed,
                        position: self.world.position(id).unwrap_or_default(),
                        faction: self.world.factions[idx].unwrap_or_default(),
                        tick: self.time.tick,
                    }));
                }
            }
            SimCommand::PlaceObstacle { cell } => {
                if cell == self.tables.objective.cell {
                    warn!("refusing to block the objective cell ({}, {})", cell.x, cell.y);
                } else if !self.obstacles.block(cell) {
                    debug!("obstacle at ({}, {}) unchanged", cell.x, cell.y);
                }
            }
            SimCommand::RemoveObstacle { cell } => {
                if self.world.anchors_blocking(cell) {
                    warn!("refusing to clear ({}, {}): a blocking tower stands there", cell.x, cell.y);
                } else if !self.obstacles.unblock(cell) {
                    debug!("no obstacle to remove at ({}, {})", cell.x, cell.y);
                }
            }
            SimCommand::SetTerrainCost { cell, cost } => {
                self.obstacles.set_cost(cell, cost);
            }
            SimCommand::SetTimeScale { scale } => match sanitize_time_scale(scale) {
                Some(scale) => self.time_scale = scale,
                None => warn!("ignoring non-finite time scale {scale}"),
            },
            SimCommand::Pause => {
                if self.phase == SimPhase::Running {
                    debug!("paused at tick {}", self.time.tick);
                    self.phase = SimPhase::Paused;
                }
            }
            SimCommand::Resume => {
                if self.phase == SimPhase::Paused {
                    debug!("resumed at tick {}", self.time.tick);
                    self.phase = SimPhase::Running;
                }
            }
        }
    }

    fn create_tower(&mut self, template: &str, cell: Cell, faction: Faction, blocks: bool) -> Option<EntityId> {
        if blocks && cell == self.tables.objective.cell {
            warn!("dropping blocking tower '{template}' on the objective cell");
            return None;
        }
        systems::spawn::place_tower(
            &mut self.world,
            &self.tables,
            &mut self.obstacles,
            template,
            cell,
            faction,
            blocks,
        )
    }

    /// Run all systems in order.
    fn run_systems(&mut self, dt: f32) {
        let tick = self.time.tick;

        // 1. Free last tick's destructions; release tower cells
        self.freed.clear();
        self.world.finalize_destructions(&mut self.freed);
        for freed in &self.freed {
            self.diff.destroyed.push(freed.id);
            if let Some(anchor) = freed.anchor.filter(|a| a.blocks) {
                self.obstacles.unblock(anchor.cell);
            }
        }

        // 2. Queued spawns
        for pending in std::mem::take(&mut self.pending_spawns) {
            let created = match pending {
                PendingSpawn::Unit(request) => {
                    systems::spawn::spawn_unit(&mut self.world, &self.tables, &request)
                }
                PendingSpawn::Tower {
                    template,
                    cell,
                    faction,
                    blocks,
                } => self.create_tower(&template, cell, faction, blocks),
            };
            if let Some(id) = created {
                self.diff.created.push(id);
            }
        }

        // 3. Spatial index
        self.index.rebuild(&self.world);

        // 4. Flow field (only rebuilds when the obstacle epoch moved)
        self.flow
            .refresh(&self.tables.grid, &self.obstacles, self.tables.objective.cell);

        // 5. Targeting
        systems::targeting::run(&mut self.world, &self.index, &mut self.diff, &mut self.candidates);

        // 6. Combat
        systems::combat::run(&mut self.world, &mut self.rng, dt, tick, &mut self.events);

        // 7. Status effects
        systems::status::run(&mut self.world, dt, tick, &mut self.events);

        // 8. Deaths and death bursts
        systems::combat::resolve_deaths(
            &mut self.world,
            &self.index,
            tick,
            &mut self.events,
            &mut self.nearby,
        );

        // 9. Movement and objective arrival
        let field = self.flow.active();
        self.last_movement = systems::movement::run(
            &mut self.world,
            &self.tables,
            &field,
            &self.obstacles,
            &self.index,
            dt,
            tick,
            &mut self.events,
        );

        // 10. Expiry
        systems::cleanup::mark_expired(&mut self.world, dt, tick, &mut self.events);
    }
}

/// Clamp into `[0, MAX_TIME_SCALE]`; `None` for NaN and infinities.
fn sanitize_time_scale(scale: f32) -> Option<f32> {
    scale.is_finite().then(|| scale.clamp(0.0, MAX_TIME_SCALE))
}
