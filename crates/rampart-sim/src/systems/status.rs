//! Status effect ticking: burn damage, slow and drain timers, and the
//! resulting speed multiplier.

use rampart_core::components::{Mobility, StatusEffects};
use rampart_core::enums::DamageSource;
use rampart_core::events::{DamageAppliedEvent, SimEvent};

use crate::ecs::World;

/// Speed multiplier from the active slow and drain, clamped to `[0, 1]`.
pub fn speed_multiplier(statuses: &StatusEffects) -> f32 {
    let slow = statuses.slowed.map_or(1.0, |s| s.multiplier);
    let drain = statuses.drained.as_ref().map_or(0.0, |d| d.magnitude());
    (slow * (1.0 - drain)).clamp(0.0, 1.0)
}

/// Advance every entity's status effects by `dt`, in ascending entity index.
pub fn run(world: &mut World, dt: f32, tick: u64, events: &mut Vec<SimEvent>) {
    for idx in 0..world.slot_count() {
        let Some(id) = world.id_at(idx) else {
            continue;
        };
        if !world.is_active(id) {
            continue;
        }
        let Some(statuses) = world.statuses[idx].as_mut() else {
            continue;
        };

        if let Some(mut burning) = statuses.burning.take() {
            burning.accumulator += dt;
            while burning.ticks_remaining > 0 && burning.accumulator >= burning.tick_interval {
                burning.accumulator -= burning.tick_interval;
                burning.ticks_remaining -= 1;
                let Some(health) = world.healths[idx].as_mut() else {
                    break;
                };
                // Burns bypass the shield.
                let before = health.current;
                health.current = (health.current - burning.damage_per_tick).max(0.0);
                events.push(SimEvent::DamageApplied(DamageAppliedEvent {
                    attacker: burning.source,
                    target: id,
                    shield_damage: 0.0,
                    hull_damage: before - health.current,
                    source: DamageSource::Burn,
                    tick,
                }));
            }
            if burning.ticks_remaining > 0 {
                statuses.burning = Some(burning);
            }
        }

        if let Some(slowed) = statuses.slowed.as_mut() {
            slowed.remaining -= dt;
            if slowed.remaining <= 0.0 {
                statuses.slowed = None;
            }
        }

        if let Some(drained) = statuses.drained.as_mut() {
            drained.stacks.iter_mut().for_each(|s| *s -= dt);
            drained.stacks.retain(|&s| s > 0.0);
            if drained.stacks.is_empty() {
                statuses.drained = None;
            }
        }

        let multiplier = speed_multiplier(statuses);
        if let Some(Mobility {
            speed_multiplier, ..
        }) = world.mobilities[idx].as_mut()
        {
            *speed_multiplier = multiplier;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::components::*;
    use rampart_core::enums::MovementBehavior;
    use rampart_core::types::EntityId;

    fn unit(world: &mut World) -> EntityId {
        let id = world.spawn();
        let idx = id.slot();
        world.healths[idx] = Some(Health::full(20.0));
        world.statuses[idx] = Some(StatusEffects::default());
        world.mobilities[idx] = Some(Mobility {
            base_speed: 10.0,
            behavior: MovementBehavior::FollowFlowField,
            speed_multiplier: 1.0,
        });
        id
    }

    #[test]
    fn burning_ticks_on_interval_and_expires() {
        let mut world = World::new();
        let id = unit(&mut world);
        world.shields[id.slot()] = Some(Shield::full(100.0));
        world.statuses[id.slot()].as_mut().unwrap().burning = Some(Burning {
            damage_per_tick: 3.0,
            tick_interval: 0.5,
            ticks_remaining: 2,
            accumulator: 0.0,
            source: EntityId::new(9, 0),
        });

        let mut events = Vec::new();
        run(&mut world, 0.25, 0, &mut events);
        assert!(events.is_empty());
        run(&mut world, 0.25, 1, &mut events);
        run(&mut world, 0.5, 2, &mut events);

        assert_eq!(events.len(), 2);
        assert_eq!(world.health(id).unwrap().current, 14.0);
        assert_eq!(world.shield(id).unwrap().current, 100.0);
        assert!(world.status(id).unwrap().burning.is_none());
    }

    #[test]
    fn slow_and_drain_combine_then_expire() {
        let mut world = World::new();
        let id = unit(&mut world);
        {
            let statuses = world.statuses[id.slot()].as_mut().unwrap();
            statuses.slowed = Some(Slowed {
                multiplier: 0.5,
                remaining: 1.0,
            });
            statuses.drained = Some(Drained {
                per_stack: 0.2,
                max_stacks: 5,
                stacks: vec![0.5, 2.0],
            });
        }

        run(&mut world, 0.1, 0, &mut Vec::new());
        let m = world.mobilities[id.slot()].unwrap().speed_multiplier;
        assert!((m - 0.5 * 0.6).abs() < 1e-6);

        run(&mut world, 0.5, 1, &mut Vec::new());
        let m = world.mobilities[id.slot()].unwrap().speed_multiplier;
        assert!((m - 0.5 * 0.8).abs() < 1e-6);

        run(&mut world, 2.0, 2, &mut Vec::new());
        assert!(world.status(id).unwrap().is_empty());
        assert_eq!(world.mobilities[id.slot()].unwrap().speed_multiplier, 1.0);
    }

    #[test]
    fn heavy_drain_clamps_to_zero() {
        let statuses = StatusEffects {
            drained: Some(Drained {
                per_stack: 0.4,
                max_stacks: 4,
                stacks: vec![1.0; 4],
            }),
            ..Default::default()
        };
        assert_eq!(speed_multiplier(&statuses), 0.0);
    }
}
