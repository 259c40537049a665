//! Component data stored in the simulation's dense per-slot arrays.
//!
//! Components are plain data. Game logic lives in systems; the few methods
//! here are accessors over a component's own fields.

use serde::{Deserialize, Serialize};

use crate::config::{DeathBurst, WeaponEffect, WeaponSpec};
use crate::enums::MovementBehavior;
use crate::types::{Cell, EntityId, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Facing in radians, derived from velocity.
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }
}

/// Secondary pool drained before Health. A zero `max` means "no shield".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    pub current: f32,
    pub max: f32,
}

impl Shield {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

/// A weapon mount. Parameters are copied from the weapon table at spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attacker {
    pub range: f32,
    pub base_damage: f32,
    pub fire_interval: f32,
    pub cooldown_remaining: f32,
    pub shield_multiplier: f32,
    pub hull_multiplier: f32,
    pub max_targets: u32,
    pub effect: Option<WeaponEffect>,
    /// Current targets in acquisition order. Never longer than `max_targets`.
    pub targets: Vec<EntityId>,
}

impl Attacker {
    /// Build a ready-to-fire attacker from a weapon spec.
    pub fn from_spec(spec: &WeaponSpec) -> Self {
        Self {
            range: spec.range,
            base_damage: spec.base_damage,
            fire_interval: spec.fire_interval,
            cooldown_remaining: 0.0,
            shield_multiplier: spec.shield_multiplier,
            hull_multiplier: spec.hull_multiplier,
            max_targets: spec.max_targets,
            effect: spec.effect,
            targets: Vec::with_capacity(spec.max_targets as usize),
        }
    }

    pub fn free_slots(&self) -> usize {
        (self.max_targets as usize).saturating_sub(self.targets.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mobility {
    pub base_speed: f32,
    pub behavior: MovementBehavior,
    /// Product of active Slowed/Drained multipliers, refreshed every status tick.
    pub speed_multiplier: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Burning {
    pub damage_per_tick: f32,
    pub tick_interval: f32,
    pub ticks_remaining: u32,
    pub accumulator: f32,
    /// Attacker that applied the effect, reported in damage events.
    pub source: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slowed {
    pub multiplier: f32,
    pub remaining: f32,
}

/// Stacking drain. Each entry of `stacks` is one stack's remaining time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drained {
    pub per_stack: f32,
    pub max_stacks: u32,
    pub stacks: Vec<f32>,
}

impl Drained {
    /// Total drain magnitude, capped at `max_stacks * per_stack`.
    pub fn magnitude(&self) -> f32 {
        let stacks = self.stacks.len().min(self.max_stacks as usize);
        stacks as f32 * self.per_stack
    }
}

/// Independent status effect slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    pub burning: Option<Burning>,
    pub slowed: Option<Slowed>,
    pub drained: Option<Drained>,
}

impl StatusEffects {
    pub fn is_empty(&self) -> bool {
        self.burning.is_none() && self.slowed.is_none() && self.drained.is_none()
    }
}

/// Remaining time before the entity expires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining_secs: f32,
}

/// A tower bound to a grid cell. When `blocks` is set the cell is an obstacle
/// for as long as the tower lives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub cell: Cell,
    pub blocks: bool,
}

/// Which template an entity was spawned from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub template: String,
}

/// Death burst carried by the entity, copied from its template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnDeath {
    pub burst: DeathBurst,
}
