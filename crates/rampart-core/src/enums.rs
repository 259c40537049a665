//! Enumeration and tag types used throughout the simulation.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFENDER_FACTION, INVADER_FACTION};

/// Small integer tag partitioning entities into groups.
/// Entities with different tags are hostile to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Faction(pub u8);

impl Faction {
    pub const DEFENDER: Faction = Faction(DEFENDER_FACTION);
    pub const INVADER: Faction = Faction(INVADER_FACTION);

    #[inline]
    pub fn is_hostile_to(self, other: Faction) -> bool {
        self.0 != other.0
    }
}

/// Status effect categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Burning,
    Slowed,
    Drained,
}

/// Why an entity left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Health reached zero during combat or status ticking.
    CombatKill,
    /// Lifetime ran out.
    Expiry,
    /// A hostile unit arrived at the protected objective.
    ObjectiveReached,
    /// Removed by an external command.
    Removed,
}

/// Per-template movement behavior. Dispatched by a single `match` in the
/// movement system rather than per-entity trait objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementBehavior {
    /// Follow the shared flow field toward the objective.
    #[default]
    FollowFlowField,
    /// Never moves (towers, walls, stationary targets).
    Stationary,
}

/// What produced a damage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    /// A direct weapon hit.
    Weapon,
    /// A Burning status tick.
    Burn,
    /// A death burst from a destroyed unit.
    DeathBurst,
}

/// Simulation run state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimPhase {
    #[default]
    Running,
    Paused,
}

/// Cooldown state of an attacker, derived from its component each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownState {
    /// Waiting for the cooldown to elapse.
    Idle,
    /// Cooldown elapsed and at least one valid target is held.
    Ready,
}
