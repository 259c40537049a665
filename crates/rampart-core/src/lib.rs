//! Core types and definitions for the RAMPART simulation.
//!
//! This crate defines the vocabulary shared by the simulation and its
//! collaborators: components, commands, configuration tables, events,
//! snapshots, and constants. It has no dependency on any runtime framework.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod events;
pub mod state;
pub mod types;
