//! Entity registry and dense component storage.

pub mod entity;
pub mod world;

pub use entity::EntityAllocator;
pub use world::{FreedEntity, World};
