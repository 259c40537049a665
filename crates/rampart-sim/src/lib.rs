//! Real-time simulation core for RAMPART.
//!
//! Owns the entity registry, spatial index, flow field navigation,
//! targeting, combat resolution and movement. Everything is driven from
//! `Simulation::tick`, which applies queued commands at the tick boundary,
//! runs the systems in a fixed order, and returns a read-only snapshot.

pub mod ecs;
pub mod engine;
pub mod flow_buffer;
pub mod flow_field;
pub mod obstacles;
pub mod spatial;
pub mod systems;

pub use engine::{SimConfig, Simulation};
pub use rampart_core as core;

#[cfg(test)]
mod tests;
