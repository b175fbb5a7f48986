//! Defines the Bevy [Plugin] for quadtree pathfinding
//!

use bevy::prelude::*;

pub mod path_layer;
pub mod terrain_layer;

pub struct QuadtreePathfindingPlugin;

impl Plugin for QuadtreePathfindingPlugin {
	fn build(&self, app: &mut App) {
		app.add_event::<terrain_layer::EventUpdateTerrainCell>()
			.add_event::<terrain_layer::EventCleanPathCache>()
			.add_event::<path_layer::EventPathRequest>()
			.add_systems(
				Update,
				(
					terrain_layer::process_terrain_updates,
					terrain_layer::clean_path_cache,
					path_layer::handle_path_requests,
				)
					.chain(),
			);
	}
}
