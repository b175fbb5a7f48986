//! Defines a bundle which can be spawned as/inserted into an entity which
//! movable actors can query for pathing data
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Defines all required components for quadtree pathfinding over one grid
#[derive(Bundle)]
pub struct QuadtreePathfindingBundle {
	/// The bank of decompositions serving every configured agent kind
	maps: QuadtreeMaps,
	/// Cache of computed cell paths actors poll
	path_cache: PathCache,
}

impl QuadtreePathfindingBundle {
	/// Create a new instance of [QuadtreePathfindingBundle] with every map
	/// built and ready for queries
	pub fn new(
		width: i32,
		height: i32,
		distance: DistanceCalculator,
		terrain: TerrainTypesChecker,
		settings: Vec<QuadtreeMapSetting>,
		policy: LeafSizePolicy,
	) -> Self {
		let mut maps = QuadtreeMaps::new(width, height, distance, terrain, settings, policy);
		maps.build();
		maps.compute();
		QuadtreePathfindingBundle {
			maps,
			path_cache: PathCache::default(),
		}
	}
}
