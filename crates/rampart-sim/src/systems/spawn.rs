//! Entity creation from unit templates.

use log::warn;

use rampart_core::commands::SpawnRequest;
use rampart_core::components::*;
use rampart_core::config::SimTables;
use rampart_core::enums::Faction;
use rampart_core::types::{Cell, EntityId};

use crate::ecs::World;
use crate::obstacles::ObstacleGrid;

/// Create an entity from `request.template`. Unknown templates are logged and
/// dropped.
pub fn spawn_unit(world: &mut World, tables: &SimTables, request: &SpawnRequest) -> Option<EntityId> {
    let Some(template) = tables.unit(&request.template) else {
        warn!("dropping spawn request for unknown template '{}'", request.template);
        return None;
    };

    let attacker = match &template.weapon {
        Some(weapon_id) => match tables.weapon(weapon_id) {
            Some(spec) => Some(Attacker::from_spec(spec)),
            None => {
                warn!(
                    "dropping spawn of '{}': unknown weapon '{weapon_id}'",
                    request.template
                );
                return None;
            }
        },
        None => None,
    };

    let id = world.spawn();
    let idx = id.slot();
    let position = tables.grid.clamp_position(request.position);

    world.transforms[idx] = Some(Transform {
        position,
        rotation: 0.0,
    });
    world.velocities[idx] = Some(Velocity::default());
    world.factions[idx] = Some(request.faction);
    if template.max_health > 0.0 {
        world.healths[idx] = Some(Health::full(template.max_health));
        world.statuses[idx] = Some(StatusEffects::default());
        if template.max_shield > 0.0 {
            world.shields[idx] = Some(Shield::full(template.max_shield));
        }
    }
    world.attackers[idx] = attacker;
    world.mobilities[idx] = Some(Mobility {
        base_speed: template.base_speed,
        behavior: template.behavior,
        speed_multiplier: 1.0,
    });
    world.lifetimes[idx] = template.lifetime_secs.map(|remaining_secs| Lifetime { remaining_secs });
    world.markers[idx] = Some(Marker {
        template: request.template.clone(),
    });
    world.on_death[idx] = template.death_burst.map(|burst| OnDeath { burst });

    Some(id)
}

/// Spawn a tower at the centre of `cell`, blocking the cell when asked.
///
/// A blocking tower needs an open cell, so each blocked cell has at most one
/// owner and freeing that owner reopens it.
pub fn place_tower(
    world: &mut World,
    tables: &SimTables,
    obstacles: &mut ObstacleGrid,
    template: &str,
    cell: Cell,
    faction: Faction,
    blocks: bool,
) -> Option<EntityId> {
    if !tables.grid.contains(cell) {
        warn!("dropping tower '{template}' at ({}, {}): outside the grid", cell.x, cell.y);
        return None;
    }
    if blocks && obstacles.is_blocked(cell) {
        warn!(
            "dropping blocking tower '{template}' at ({}, {}): cell already blocked",
            cell.x, cell.y
        );
        return None;
    }
    let request = SpawnRequest {
        template: template.to_string(),
        position: tables.grid.cell_center(cell),
        faction,
    };
    let id = spawn_unit(world, tables, &request)?;
    world.anchors[id.slot()] = Some(Anchor { cell, blocks });
    if blocks {
        obstacles.block(cell);
    }
    Some(id)
}
