//! Weapon cooldowns, shield-first damage, status application and death
//! resolution.

use std::collections::VecDeque;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use rampart_core::components::*;
use rampart_core::config::{StatusEffectSpec, WeaponEffect};
use rampart_core::enums::*;
use rampart_core::events::*;
use rampart_core::types::EntityId;

use crate::ecs::World;
use crate::spatial::{SpatialEntry, SpatialIndex};

/// Amounts actually removed by one hit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitResult {
    pub shield_damage: f32,
    pub hull_damage: f32,
}

/// Derive the cooldown state machine's current state.
pub fn cooldown_state(attacker: &Attacker) -> CooldownState {
    if attacker.cooldown_remaining <= 0.0 && !attacker.targets.is_empty() {
        CooldownState::Ready
    } else {
        CooldownState::Idle
    }
}

/// Advance the cooldown by `dt` and report whether the attacker fires.
///
/// Overshoot past zero carries into the next cycle, so the fire rate follows
/// accumulated simulation time. Without targets the cooldown holds at zero.
pub fn advance_cooldown(attacker: &mut Attacker, dt: f32) -> bool {
    if attacker.cooldown_remaining > 0.0 {
        attacker.cooldown_remaining -= dt;
    }
    match cooldown_state(attacker) {
        CooldownState::Ready => {
            attacker.cooldown_remaining += attacker.fire_interval;
            true
        }
        CooldownState::Idle => {
            if attacker.targets.is_empty() {
                attacker.cooldown_remaining = attacker.cooldown_remaining.max(0.0);
            }
            false
        }
    }
}

/// Apply `base` damage shield-first.
///
/// A live shield absorbs `base * shield_mult` up to its current value; any
/// overflow is converted back to base damage and scaled by `hull_mult`. With
/// no shield, or an empty one, the whole hit lands as `base * hull_mult`.
pub fn apply_hit(
    health: &mut Health,
    shield: Option<&mut Shield>,
    base: f32,
    shield_mult: f32,
    hull_mult: f32,
) -> HitResult {
    let mut result = HitResult::default();
    let mut hull = base * hull_mult;

    if let Some(shield) = shield {
        if shield.max > 0.0 && shield.current > 0.0 && shield_mult > 0.0 {
            let scaled = base * shield_mult;
            if scaled <= shield.current {
                shield.current -= scaled;
                result.shield_damage = scaled;
                hull = 0.0;
            } else {
                result.shield_damage = shield.current;
                hull = (scaled - shield.current) / shield_mult * hull_mult;
                shield.current = 0.0;
            }
        }
        enforce_shield_bounds(shield);
    }

    let before = health.current;
    health.current = (health.current - hull).max(0.0);
    enforce_health_bounds(health);
    result.hull_damage = before - health.current;
    result
}

fn enforce_shield_bounds(shield: &mut Shield) {
    debug_assert!(
        shield.current >= 0.0 && shield.current <= shield.max,
        "shield out of bounds: {shield:?}"
    );
    shield.current = shield.current.clamp(0.0, shield.max);
}

fn enforce_health_bounds(health: &mut Health) {
    debug_assert!(
        health.current <= health.max,
        "health above max: {health:?}"
    );
    health.current = health.current.clamp(0.0, health.max);
}

/// Roll an effect's application chance. Certain and impossible effects never
/// consume randomness, so they do not perturb the RNG stream.
pub fn roll_chance(chance: f32, rng: &mut ChaCha8Rng) -> bool {
    if chance >= 1.0 {
        true
    } else if chance <= 0.0 {
        false
    } else {
        rng.gen::<f32>() < chance
    }
}

/// Write a status effect into `statuses`. Burning and Slowed overwrite their
/// slot; Drained adds a stack, refreshing the oldest one once at the cap.
pub fn apply_status(statuses: &mut StatusEffects, spec: &StatusEffectSpec, source: EntityId) -> StatusKind {
    match *spec {
        StatusEffectSpec::Burning {
            damage_per_tick,
            tick_interval,
            ticks,
        } => {
            statuses.burning = Some(Burning {
                damage_per_tick,
                tick_interval,
                ticks_remaining: ticks,
                accumulator: 0.0,
                source,
            });
            StatusKind::Burning
        }
        StatusEffectSpec::Slowed {
            multiplier,
            duration,
        } => {
            statuses.slowed = Some(Slowed {
                multiplier,
                remaining: duration,
            });
            StatusKind::Slowed
        }
        StatusEffectSpec::Drained {
            per_stack,
            max_stacks,
            duration,
        } => {
            let drained = statuses.drained.get_or_insert_with(|| Drained {
                per_stack,
                max_stacks,
                stacks: Vec::with_capacity(max_stacks as usize),
            });
            drained.per_stack = per_stack;
            drained.max_stacks = max_stacks;
            if drained.stacks.len() > max_stacks as usize {
                // Keep the stacks with the most time left.
                drained.stacks.sort_by(|a, b| b.total_cmp(a));
                drained.stacks.truncate(max_stacks as usize);
            }
            if drained.stacks.len() < max_stacks as usize {
                drained.stacks.push(duration);
            } else if let Some(oldest) = drained
                .stacks
                .iter_mut()
                .min_by(|a, b| a.total_cmp(b))
            {
                *oldest = duration;
            }
            StatusKind::Drained
        }
    }
}

/// Tick cooldowns and fire every Ready attacker, in ascending entity index.
///
/// Firing is simultaneous within the pass: an attacker whose health dropped
/// earlier in the pass still fires, and deaths are resolved afterwards by
/// `resolve_deaths`.
pub fn run(
    world: &mut World,
    rng: &mut ChaCha8Rng,
    dt: f32,
    tick: u64,
    events: &mut Vec<SimEvent>,
) {
    for idx in 0..world.slot_count() {
        let Some(attacker_id) = world.id_at(idx) else {
            continue;
        };
        if !world.is_active(attacker_id) {
            continue;
        }
        let Some(mut attacker) = world.attackers[idx].take() else {
            continue;
        };

        if advance_cooldown(&mut attacker, dt) {
            events.push(SimEvent::WeaponFired(WeaponFiredEvent {
                attacker: attacker_id,
                targets: attacker.targets.clone(),
                tick,
            }));
            for &target in &attacker.targets {
                hit_target(world, rng, &attacker, attacker_id, target, tick, events);
            }
        }

        world.attackers[idx] = Some(attacker);
    }
}

fn hit_target(
    world: &mut World,
    rng: &mut ChaCha8Rng,
    attacker: &Attacker,
    attacker_id: EntityId,
    target: EntityId,
    tick: u64,
    events: &mut Vec<SimEvent>,
) {
    if !world.is_alive(target) {
        return;
    }
    let t = target.slot();
    let Some(health) = world.healths[t].as_mut() else {
        return;
    };
    let hit = apply_hit(
        health,
        world.shields[t].as_mut(),
        attacker.base_damage,
        attacker.shield_multiplier,
        attacker.hull_multiplier,
    );
    let still_alive = !health.is_depleted();
    events.push(SimEvent::DamageApplied(DamageAppliedEvent {
        attacker: attacker_id,
        target,
        shield_damage: hit.shield_damage,
        hull_damage: hit.hull_damage,
        source: DamageSource::Weapon,
        tick,
    }));

    if !still_alive {
        return;
    }
    let Some(WeaponEffect { effect, chance }) = attacker.effect else {
        return;
    };
    if !roll_chance(chance, rng) {
        return;
    }
    let statuses = world.statuses[t].get_or_insert_with(StatusEffects::default);
    let kind = apply_status(statuses, &effect, attacker_id);
    events.push(SimEvent::StatusApplied(StatusAppliedEvent {
        source: attacker_id,
        target,
        kind,
        tick,
    }));
}

/// Queue every depleted entity for destruction and detonate death bursts.
///
/// Deaths are handled as a FIFO worklist seeded in ascending entity index.
/// A burst damages hostile entities around the corpse; anything it kills is
/// appended to the worklist and resolved in the same pass.
pub fn resolve_deaths(
    world: &mut World,
    index: &SpatialIndex,
    tick: u64,
    events: &mut Vec<SimEvent>,
    scratch: &mut Vec<SpatialEntry>,
) -> usize {
    let mut worklist: VecDeque<EntityId> = (0..world.slot_count())
        .filter_map(|idx| world.id_at(idx))
        .filter(|&id| world.is_active(id) && is_depleted(world, id))
        .collect();
    let mut killed = 0;

    while let Some(id) = worklist.pop_front() {
        let idx = id.slot();
        let position = world.transforms[idx].map(|t| t.position).unwrap_or_default();
        let faction = world.factions[idx].unwrap_or_default();
        if !world.queue_destroy(id, DestroyCause::CombatKill) {
            continue;
        }
        killed += 1;
        events.push(SimEvent::EntityDestroyed(EntityDestroyedEvent {
            id,
            cause: DestroyCause::CombatKill,
            position,
            faction,
            tick,
        }));

        let Some(OnDeath { burst }) = world.on_death[idx] else {
            continue;
        };
        index.query_radius_into(position, burst.radius, scratch);
        for entry in scratch.iter() {
            if entry.id == id || !faction.is_hostile_to(entry.faction) || !world.is_active(entry.id) {
                continue;
            }
            let t = entry.id.slot();
            let Some(health) = world.healths[t].as_mut() else {
                continue;
            };
            let was_alive = !health.is_depleted();
            let hit = apply_hit(health, world.shields[t].as_mut(), burst.damage, 1.0, 1.0);
            let now_dead = health.is_depleted();
            events.push(SimEvent::DamageApplied(DamageAppliedEvent {
                attacker: id,
                target: entry.id,
                shield_damage: hit.shield_damage,
                hull_damage: hit.hull_damage,
                source: DamageSource::DeathBurst,
                tick,
            }));
            if was_alive && now_dead {
                worklist.push_back(entry.id);
            }
        }
    }
    killed
}

fn is_depleted(world: &World, id: EntityId) -> bool {
    world.healths[id.slot()].is_some_and(|h| h.is_depleted())
}
