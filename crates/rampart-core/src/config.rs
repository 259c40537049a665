//! Static configuration tables: weapons, unit templates, grid, and objective.
//!
//! Tables ship with built-in defaults and may be replaced by a JSON file.
//! Loading is the only fallible entry point of the core and reports errors
//! through `anyhow` with the offending path or key attached.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::MovementBehavior;
use crate::types::{Cell, Vec2};

fn one() -> f32 {
    1.0
}

fn one_target() -> u32 {
    1
}

/// Status effect carried by a weapon. Tagged so that a single dispatcher
/// can match on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StatusEffectSpec {
    /// Damage over time applied straight to Health.
    Burning {
        damage_per_tick: f32,
        tick_interval: f32,
        ticks: u32,
    },
    /// Movement speed multiplier for a fixed duration.
    Slowed { multiplier: f32, duration: f32 },
    /// Stacking speed reduction; each stack expires on its own.
    Drained {
        per_stack: f32,
        max_stacks: u32,
        duration: f32,
    },
}

/// Effect plus its application chance in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponEffect {
    pub effect: StatusEffectSpec,
    #[serde(default = "one")]
    pub chance: f32,
}

/// Per-weapon-type parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub base_damage: f32,
    pub range: f32,
    /// Seconds between shots.
    pub fire_interval: f32,
    #[serde(default = "one")]
    pub shield_multiplier: f32,
    #[serde(default = "one")]
    pub hull_multiplier: f32,
    #[serde(default = "one_target")]
    pub max_targets: u32,
    #[serde(default)]
    pub effect: Option<WeaponEffect>,
}

/// Area damage released when a unit dies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathBurst {
    pub radius: f32,
    pub damage: f32,
}

/// Per-unit-type parameters used by spawn requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Zero means the entity has no Health and cannot be targeted.
    pub max_health: f32,
    #[serde(default)]
    pub max_shield: f32,
    #[serde(default)]
    pub base_speed: f32,
    #[serde(default)]
    pub behavior: MovementBehavior,
    /// Key into `SimTables::weapons`.
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub lifetime_secs: Option<f32>,
    #[serde(default)]
    pub death_burst: Option<DeathBurst>,
}

/// Navigation grid geometry. Also defines the world bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    pub cell_size: f32,
    /// World position of the grid's lower-left corner.
    #[serde(default)]
    pub origin: Vec2,
}

impl GridConfig {
    pub fn world_min(&self) -> Vec2 {
        self.origin
    }

    pub fn world_max(&self) -> Vec2 {
        self.origin + Vec2::new(self.width as f32, self.height as f32) * self.cell_size
    }

    /// World position of a cell's centre.
    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        self.origin + (Vec2::new(cell.x as f32, cell.y as f32) + 0.5) * self.cell_size
    }

    /// Cell containing `pos`, clamped to the grid.
    pub fn cell_at(&self, pos: Vec2) -> Cell {
        let local = (pos - self.origin) / self.cell_size;
        let x = (local.x.floor().max(0.0) as u32).min(self.width.saturating_sub(1));
        let y = (local.y.floor().max(0.0) as u32).min(self.height.saturating_sub(1));
        Cell::new(x, y)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Clamp a world position into the bounds.
    pub fn clamp_position(&self, pos: Vec2) -> Vec2 {
        pos.clamp(self.world_min(), self.world_max())
    }
}

/// The protected target hostile units path toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    pub cell: Cell,
    #[serde(default = "default_objective_radius")]
    pub radius: f32,
    /// Faction that owns the objective; every other faction counts as hostile.
    #[serde(default)]
    pub owner: crate::enums::Faction,
}

fn default_objective_radius() -> f32 {
    DEFAULT_OBJECTIVE_RADIUS
}

/// Local steering tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementTuning {
    pub separation_radius: f32,
    pub separation_weight: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            separation_radius: DEFAULT_SEPARATION_RADIUS,
            separation_weight: DEFAULT_SEPARATION_WEIGHT,
        }
    }
}

/// All static tables consumed by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimTables {
    pub grid: GridConfig,
    /// Spatial index bucket size; should be at least the longest weapon range.
    pub spatial_cell_size: f32,
    pub objective: ObjectiveConfig,
    #[serde(default)]
    pub movement: MovementTuning,
    pub weapons: BTreeMap<String, WeaponSpec>,
    pub units: BTreeMap<String, UnitTemplate>,
}

impl SimTables {
    /// Parse tables from a JSON string and validate them.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let tables: SimTables = serde_json::from_str(text).context("parse sim tables json")?;
        tables.validate()?;
        Ok(tables)
    }

    /// Load tables from a JSON file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read sim tables: {}", path.display()))?;
        let tables = Self::from_json_str(&text)
            .with_context(|| format!("load sim tables: {}", path.display()))?;
        log::info!(
            "loaded sim tables from {} ({} weapons, {} unit templates)",
            path.display(),
            tables.weapons.len(),
            tables.units.len()
        );
        Ok(tables)
    }

    pub fn weapon(&self, id: &str) -> Option<&WeaponSpec> {
        self.weapons.get(id)
    }

    pub fn unit(&self, id: &str) -> Option<&UnitTemplate> {
        self.units.get(id)
    }

    /// Longest range of any configured weapon.
    pub fn max_weapon_range(&self) -> f32 {
        self.weapons.values().map(|w| w.range).fold(0.0, f32::max)
    }

    /// Reject tables the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        if grid.width == 0 || grid.height == 0 {
            bail!("grid must have at least one cell, got {}x{}", grid.width, grid.height);
        }
        if !(grid.cell_size > 0.0) {
            bail!("grid cell_size must be positive, got {}", grid.cell_size);
        }
        if !(self.spatial_cell_size > 0.0) {
            bail!("spatial_cell_size must be positive, got {}", self.spatial_cell_size);
        }
        if !grid.contains(self.objective.cell) {
            bail!(
                "objective cell ({}, {}) lies outside the {}x{} grid",
                self.objective.cell.x,
                self.objective.cell.y,
                grid.width,
                grid.height
            );
        }
        for (id, weapon) in &self.weapons {
            if !(weapon.range > 0.0) {
                bail!("weapon '{id}': range must be positive");
            }
            if !(weapon.fire_interval > 0.0) {
                bail!("weapon '{id}': fire_interval must be positive");
            }
            if weapon.max_targets == 0 {
                bail!("weapon '{id}': max_targets must be at least 1");
            }
            if !(weapon.shield_multiplier > 0.0) || weapon.hull_multiplier < 0.0 {
                bail!("weapon '{id}': shield multiplier must be positive and hull multiplier non-negative");
            }
            if let Some(effect) = &weapon.effect {
                validate_effect(id, effect)?;
            }
        }
        for (id, unit) in &self.units {
            if unit.max_health < 0.0 || unit.max_shield < 0.0 || unit.base_speed < 0.0 {
                bail!("unit '{id}': health, shield and speed must be non-negative");
            }
            if let Some(weapon) = &unit.weapon {
                if !self.weapons.contains_key(weapon) {
                    bail!("unit '{id}' references unknown weapon '{weapon}'");
                }
            }
        }
        let longest = self.max_weapon_range();
        if self.spatial_cell_size < longest {
            log::warn!(
                "spatial_cell_size {} is below the longest weapon range {}; queries fan out over more buckets",
                self.spatial_cell_size,
                longest
            );
        }
        Ok(())
    }
}

fn validate_effect(weapon_id: &str, effect: &WeaponEffect) -> Result<()> {
    if !(0.0..=1.0).contains(&effect.chance) {
        bail!("weapon '{weapon_id}': effect chance {} outside [0, 1]", effect.chance);
    }
    match effect.effect {
        StatusEffectSpec::Burning {
            tick_interval,
            ticks,
            ..
        } => {
            if !(tick_interval > 0.0) || ticks == 0 {
                bail!("weapon '{weapon_id}': burning needs a positive interval and tick count");
            }
        }
        StatusEffectSpec::Slowed {
            multiplier,
            duration,
        } => {
            if !(0.0..=1.0).contains(&multiplier) || !(duration > 0.0) {
                bail!("weapon '{weapon_id}': slow multiplier must be in [0, 1] with positive duration");
            }
        }
        StatusEffectSpec::Drained {
            per_stack,
            max_stacks,
            duration,
        } => {
            if max_stacks == 0 || per_stack < 0.0 || !(duration > 0.0) {
                bail!("weapon '{weapon_id}': drain needs max_stacks >= 1, per_stack >= 0 and positive duration");
            }
        }
    }
    Ok(())
}

impl Default for SimTables {
    fn default() -> Self {
        let mut weapons = BTreeMap::new();
        weapons.insert(
            "cannon".to_string(),
            WeaponSpec {
                base_damage: 10.0,
                range: 200.0,
                fire_interval: 0.25,
                shield_multiplier: 1.0,
                hull_multiplier: 1.0,
                max_targets: 1,
                effect: None,
            },
        );
        weapons.insert(
            "flak".to_string(),
            WeaponSpec {
                base_damage: 6.0,
                range: 150.0,
                fire_interval: 0.5,
                shield_multiplier: 1.0,
                hull_multiplier: 1.0,
                max_targets: 3,
                effect: None,
            },
        );
        // Shield specialist: tears through shields, weak against hulls.
        weapons.insert(
            "ion".to_string(),
            WeaponSpec {
                base_damage: 8.0,
                range: 180.0,
                fire_interval: 0.4,
                shield_multiplier: 3.0,
                hull_multiplier: 0.5,
                max_targets: 1,
                effect: Some(WeaponEffect {
                    effect: StatusEffectSpec::Drained {
                        per_stack: 0.1,
                        max_stacks: 5,
                        duration: 3.0,
                    },
                    chance: 1.0,
                }),
            },
        );
        weapons.insert(
            "flamer".to_string(),
            WeaponSpec {
                base_damage: 3.0,
                range: 100.0,
                fire_interval: 0.5,
                shield_multiplier: 1.0,
                hull_multiplier: 1.0,
                max_targets: 2,
                effect: Some(WeaponEffect {
                    effect: StatusEffectSpec::Burning {
                        damage_per_tick: 2.0,
                        tick_interval: 0.5,
                        ticks: 4,
                    },
                    chance: 1.0,
                }),
            },
        );
        weapons.insert(
            "frost".to_string(),
            WeaponSpec {
                base_damage: 2.0,
                range: 160.0,
                fire_interval: 0.75,
                shield_multiplier: 1.0,
                hull_multiplier: 1.0,
                max_targets: 2,
                effect: Some(WeaponEffect {
                    effect: StatusEffectSpec::Slowed {
                        multiplier: 0.5,
                        duration: 2.0,
                    },
                    chance: 0.75,
                }),
            },
        );

        let mut units = BTreeMap::new();
        for (name, weapon) in [
            ("cannon_tower", "cannon"),
            ("flak_tower", "flak"),
            ("ion_tower", "ion"),
            ("flame_tower", "flamer"),
            ("frost_tower", "frost"),
        ] {
            units.insert(
                name.to_string(),
                UnitTemplate {
                    max_health: 200.0,
                    max_shield: 0.0,
                    base_speed: 0.0,
                    behavior: MovementBehavior::Stationary,
                    weapon: Some(weapon.to_string()),
                    lifetime_secs: None,
                    death_burst: None,
                },
            );
        }
        units.insert(
            "grunt".to_string(),
            UnitTemplate {
                max_health: 60.0,
                max_shield: 0.0,
                base_speed: 40.0,
                behavior: MovementBehavior::FollowFlowField,
                weapon: None,
                lifetime_secs: None,
                death_burst: None,
            },
        );
        units.insert(
            "runner".to_string(),
            UnitTemplate {
                max_health: 30.0,
                max_shield: 0.0,
                base_speed: 70.0,
                behavior: MovementBehavior::FollowFlowField,
                weapon: None,
                lifetime_secs: None,
                death_burst: None,
            },
        );
        units.insert(
            "warden".to_string(),
            UnitTemplate {
                max_health: 80.0,
                max_shield: 40.0,
                base_speed: 30.0,
                behavior: MovementBehavior::FollowFlowField,
                weapon: None,
                lifetime_secs: None,
                death_burst: None,
            },
        );
        units.insert(
            "volatile".to_string(),
            UnitTemplate {
                max_health: 40.0,
                max_shield: 0.0,
                base_speed: 35.0,
                behavior: MovementBehavior::FollowFlowField,
                weapon: None,
                lifetime_secs: None,
                death_burst: Some(DeathBurst {
                    radius: 48.0,
                    damage: 15.0,
                }),
            },
        );
        units.insert(
            "decoy".to_string(),
            UnitTemplate {
                max_health: 20.0,
                max_shield: 0.0,
                base_speed: 0.0,
                behavior: MovementBehavior::Stationary,
                weapon: None,
                lifetime_secs: Some(5.0),
                death_burst: None,
            },
        );

        Self {
            grid: GridConfig {
                width: DEFAULT_GRID_WIDTH,
                height: DEFAULT_GRID_HEIGHT,
                cell_size: DEFAULT_NAV_CELL_SIZE,
                origin: Vec2::ZERO,
            },
            spatial_cell_size: DEFAULT_SPATIAL_CELL_SIZE,
            objective: ObjectiveConfig {
                cell: Cell::new(DEFAULT_GRID_WIDTH - 2, DEFAULT_GRID_HEIGHT / 2),
                radius: DEFAULT_OBJECTIVE_RADIUS,
                owner: crate::enums::Faction::DEFENDER,
            },
            movement: MovementTuning::default(),
            weapons,
            units,
        }
    }
}
