//! Per-tick systems, run by `Simulation::tick` in a fixed order.

pub mod cleanup;
pub mod combat;
pub mod movement;
pub mod snapshot;
pub mod spawn;
pub mod status;
pub mod targeting;
