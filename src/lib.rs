//! This is a plugin for the Bevy game engine providing hierarchical pathfinding
//! over a quadtree decomposition of a 2d grid
//!

pub mod quadmap;
pub mod bundle;
pub mod plugin;

pub mod prelude;
