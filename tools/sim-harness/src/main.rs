//! sim-harness: run the simulation headless from a scenario file and print a
//! summary of what happened.
//!
//! Usage:
//!   sim-harness --scenario data/scenarios/gauntlet.json --ticks 1800
//!   sim-harness --tables my_tables.json --seed 7 --async

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use log::info;
use serde::Deserialize;

use rampart_core::commands::{SimCommand, SpawnRequest};
use rampart_core::config::SimTables;
use rampart_core::enums::{DamageSource, DestroyCause, Faction, SimPhase};
use rampart_core::events::SimEvent;
use rampart_core::types::{Cell, Vec2};
use rampart_sim::{SimConfig, Simulation};

/// A command issued before the given loop iteration.
#[derive(Debug, Clone, Deserialize)]
struct TimedCommand {
    at_tick: u64,
    command: SimCommand,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Scenario {
    #[serde(default)]
    ticks: Option<u64>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    commands: Vec<TimedCommand>,
}

#[derive(Debug, Default)]
struct Options {
    tables: Option<PathBuf>,
    scenario: Option<PathBuf>,
    ticks: Option<u64>,
    seed: Option<u64>,
    async_flow_field: bool,
}

#[derive(Debug, Default)]
struct Summary {
    ticks_run: u64,
    spawned: usize,
    shots: usize,
    shield_damage: f64,
    hull_damage: f64,
    burn_damage: f64,
    burst_damage: f64,
    statuses: usize,
    kills: usize,
    expired: usize,
    removed: usize,
    leaks: usize,
    leaked_health: f64,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("sim-harness: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!(
        "sim-harness: headless RAMPART simulation runner\n\
         \n\
           --tables <path>    Weapon/unit/grid tables JSON (default: built-in)\n\
           --scenario <path>  Scenario JSON with timed commands (default: built-in demo)\n\
           --ticks <N>        Ticks to run (default: scenario value or 1800)\n\
           --seed <N>         RNG seed (default: scenario value or 42)\n\
           --async            Recompute the flow field on a worker thread\n"
    );
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{name} expects a value"))
        };
        match arg.as_str() {
            "--tables" => options.tables = Some(PathBuf::from(value("--tables")?)),
            "--scenario" => options.scenario = Some(PathBuf::from(value("--scenario")?)),
            "--ticks" => {
                let raw = value("--ticks")?;
                options.ticks = Some(raw.parse().with_context(|| format!("bad --ticks '{raw}'"))?);
            }
            "--seed" => {
                let raw = value("--seed")?;
                options.seed = Some(raw.parse().with_context(|| format!("bad --seed '{raw}'"))?);
            }
            "--async" => options.async_flow_field = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(options)
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read scenario: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse scenario: {}", path.display()))
}

/// A short wave against a small mixed defence.
fn demo_scenario(tables: &SimTables) -> Scenario {
    let grid = &tables.grid;
    let mut commands = Vec::new();
    for (template, x, y) in [
        ("cannon_tower", 12, 10),
        ("frost_tower", 12, 14),
        ("flame_tower", 22, 12),
        ("ion_tower", 30, 9),
        ("flak_tower", 30, 15),
    ] {
        commands.push(TimedCommand {
            at_tick: 0,
            command: SimCommand::PlaceTower {
                template: template.to_string(),
                cell: Cell::new(x, y),
                faction: Faction::DEFENDER,
                blocks: true,
            },
        });
    }
    for y in 4..20 {
        if y != 12 {
            commands.push(TimedCommand {
                at_tick: 0,
                command: SimCommand::PlaceObstacle { cell: Cell::new(18, y) },
            });
        }
    }
    let templates = ["grunt", "runner", "warden", "volatile"];
    for i in 0..24u32 {
        let lane = grid.cell_center(Cell::new(0, 6 + (i % 12)));
        commands.push(TimedCommand {
            at_tick: u64::from(i) * 20,
            command: SimCommand::Spawn(SpawnRequest {
                template: templates[i as usize % templates.len()].to_string(),
                position: lane + Vec2::new(4.0, 0.0),
                faction: Faction::INVADER,
            }),
        });
    }
    commands.push(TimedCommand {
        at_tick: 300,
        command: SimCommand::SetTimeScale { scale: 2.0 },
    });
    Scenario {
        ticks: Some(1800),
        seed: None,
        commands,
    }
}

fn run(args: &[String]) -> Result<()> {
    let options = parse_args(args)?;

    let tables = match &options.tables {
        Some(path) => SimTables::load(path)?,
        None => SimTables::default(),
    };
    let mut scenario = match &options.scenario {
        Some(path) => load_scenario(path)?,
        None => demo_scenario(&tables),
    };
    scenario.commands.sort_by_key(|c| c.at_tick);

    let ticks = options.ticks.or(scenario.ticks).unwrap_or(1800);
    let seed = options.seed.or(scenario.seed).unwrap_or(42);

    let mut sim = Simulation::new(SimConfig {
        seed,
        async_flow_field: options.async_flow_field,
        tables,
        ..Default::default()
    });

    let mut summary = Summary::default();
    let mut pending = scenario.commands.into_iter().peekable();
    let mut last_alive = 0;

    for i in 0..ticks {
        while let Some(timed) = pending.next_if(|c| c.at_tick <= i) {
            sim.queue_command(timed.command);
        }

        let snap = sim.tick();
        summary.ticks_run += 1;
        summary.spawned += snap.diff.created.len();
        for event in &snap.events {
            record(&mut summary, event);
        }
        last_alive = snap.entities.len();

        if snap.phase == SimPhase::Running && snap.time.tick % 300 == 0 {
            info!(
                "tick {}: {} entities, flow epoch {}/{}",
                snap.time.tick,
                snap.entities.len(),
                snap.flow_epoch,
                snap.obstacle_epoch
            );
        }
    }

    print_summary(&summary, &sim, last_alive);
    Ok(())
}

fn record(summary: &mut Summary, event: &SimEvent) {
    match event {
        SimEvent::WeaponFired(_) => summary.shots += 1,
        SimEvent::DamageApplied(d) => match d.source {
            DamageSource::Weapon => {
                summary.shield_damage += f64::from(d.shield_damage);
                summary.hull_damage += f64::from(d.hull_damage);
            }
            DamageSource::Burn => summary.burn_damage += f64::from(d.hull_damage),
            DamageSource::DeathBurst => {
                summary.burst_damage += f64::from(d.shield_damage + d.hull_damage)
            }
        },
        SimEvent::StatusApplied(_) => summary.statuses += 1,
        SimEvent::ObjectiveReached(r) => {
            summary.leaks += 1;
            summary.leaked_health += f64::from(r.remaining_health);
        }
        SimEvent::EntityDestroyed(d) => match d.cause {
            DestroyCause::CombatKill => summary.kills += 1,
            DestroyCause::Expiry => summary.expired += 1,
            DestroyCause::Removed => summary.removed += 1,
            DestroyCause::ObjectiveReached => {}
        },
    }
}

fn print_summary(summary: &Summary, sim: &Simulation, alive: usize) {
    let time = sim.time();
    println!("ticks run:        {} (sim tick {}, {:.2}s)", summary.ticks_run, time.tick, time.elapsed_secs);
    println!("spawned:          {}", summary.spawned);
    println!("alive at end:     {alive}");
    println!("shots fired:      {}", summary.shots);
    println!(
        "weapon damage:    {:.1} shield / {:.1} hull",
        summary.shield_damage, summary.hull_damage
    );
    println!("burn damage:      {:.1}", summary.burn_damage);
    println!("burst damage:     {:.1}", summary.burst_damage);
    println!("statuses applied: {}", summary.statuses);
    println!(
        "destroyed:        {} killed, {} expired, {} removed",
        summary.kills, summary.expired, summary.removed
    );
    println!(
        "leaks:            {} ({:.1} health reached the objective)",
        summary.leaks, summary.leaked_health
    );
    println!(
        "flow field:       epoch {}, {} reachable cells",
        sim.flow_field().epoch(),
        sim.flow_field().reachable_cells()
    );
}
