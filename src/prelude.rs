//! `use bevy_quadtree_pathfinding_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::quadmap::{
	bank::*,
	clearance::*,
	graph::*,
	grid::*,
	map::*,
	pathfinder::{astar::*, flow_field::*, *},
	quadtree::*,
	*,
};

#[doc(hidden)]
pub use crate::{
	bundle::*,
	plugin::{path_layer::*, terrain_layer::*, *},
};
