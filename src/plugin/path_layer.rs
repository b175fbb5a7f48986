//! Logic for answering path requests from actors and caching the results so
//! a crowd heading the same way shares one computation
//!

use std::collections::BTreeMap;

use crate::prelude::*;
use bevy::prelude::*;

/// Identifies a cached path
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct PathMetadata {
	/// Starting cell of the path
	source: (i32, i32),
	/// Destination cell of the path
	target: (i32, i32),
	/// Agent size the path was computed for
	agent_size: i32,
	/// Terrain mask the path was computed for
	terrain_mask: u8,
}

impl PathMetadata {
	/// Create a new instance of [PathMetadata]
	pub fn new(source: (i32, i32), target: (i32, i32), agent_size: i32, terrain_mask: u8) -> Self {
		PathMetadata {
			source,
			target,
			agent_size,
			terrain_mask,
		}
	}
	/// Get the starting cell
	pub fn get_source(&self) -> (i32, i32) {
		self.source
	}
	/// Get the destination cell
	pub fn get_target(&self) -> (i32, i32) {
		self.target
	}
	/// Get the agent size
	pub fn get_agent_size(&self) -> i32 {
		self.agent_size
	}
	/// Get the terrain mask
	pub fn get_terrain_mask(&self) -> u8 {
		self.terrain_mask
	}
}

/// Computed cell-by-cell paths which actors poll instead of running their own
/// searches
#[derive(Component, Default)]
pub struct PathCache(BTreeMap<PathMetadata, Vec<(i32, i32)>>);

impl PathCache {
	/// Get the map of cached paths
	pub fn get(&self) -> &BTreeMap<PathMetadata, Vec<(i32, i32)>> {
		&self.0
	}
	/// Get a mutable reference to the map of cached paths
	pub fn get_mut(&mut self) -> &mut BTreeMap<PathMetadata, Vec<(i32, i32)>> {
		&mut self.0
	}
	/// Get a cached path. Returns [None] if it hasn't been computed
	pub fn get_path(&self, metadata: &PathMetadata) -> Option<&Vec<(i32, i32)>> {
		self.0.get(metadata)
	}
	/// Insert a computed path
	pub fn insert_path(&mut self, metadata: PathMetadata, path: Vec<(i32, i32)>) {
		self.0.insert(metadata, path);
	}
}

/// A request to compute a path from `source` to `target`
#[derive(Event)]
pub struct EventPathRequest {
	/// Starting cell
	source: (i32, i32),
	/// Destination cell
	target: (i32, i32),
	/// Size of the requesting agent
	agent_size: i32,
	/// Terrain the requesting agent can walk
	terrain_mask: u8,
}

impl EventPathRequest {
	/// Create a new instance of [EventPathRequest]
	pub fn new(source: (i32, i32), target: (i32, i32), agent_size: i32, terrain_mask: u8) -> Self {
		EventPathRequest {
			source,
			target,
			agent_size,
			terrain_mask,
		}
	}
}

/// Process [EventPathRequest] by running the staged search, leaf route first
/// and gates after, then filling the cells in between, and publish the result
/// into the [PathCache]
pub fn handle_path_requests(
	mut events: EventReader<EventPathRequest>,
	mut cache_q: Query<(&QuadtreeMaps, &mut PathCache)>,
) {
	for event in events.read() {
		for (maps, mut cache) in cache_q.iter_mut() {
			let metadata = PathMetadata::new(
				event.source,
				event.target,
				event.agent_size,
				event.terrain_mask,
			);
			// only run if the cache doesn't contain the path already
			if cache.get().contains_key(&metadata) {
				continue;
			}
			if let Some(path) = compute_cell_path(maps, &metadata) {
				cache.insert_path(metadata, path);
			} else {
				debug!(
					"No path from {:?} to {:?} for agent size {} on mask {:#010b}",
					event.source, event.target, event.agent_size, event.terrain_mask
				);
			}
		}
	}
}

/// The full staged pipeline for one request: node routes, gate routes pruned
/// by them and straight-line filling between consecutive route cells
fn compute_cell_path(maps: &QuadtreeMaps, metadata: &PathMetadata) -> Option<Vec<(i32, i32)>> {
	let (sx, sy) = metadata.get_source();
	let (tx, ty) = metadata.get_target();
	let mut pathfinder = AStarPathfinder::new(maps);
	if !pathfinder.reset(
		sx,
		sy,
		tx,
		ty,
		metadata.get_agent_size(),
		metadata.get_terrain_mask(),
	) {
		return None;
	}
	pathfinder.compute_node_routes()?;
	let mut route = Vec::new();
	pathfinder.compute_gate_routes(|x, y| route.push((x, y)), true)?;
	let mut path = Vec::new();
	for pair in route.windows(2) {
		let (x1, y1) = pair[0];
		let (x2, y2) = pair[1];
		pathfinder.compute_path_to_next_route_cell(x1, y1, x2, y2, |x, y| {
			if path.last() != Some(&(x, y)) {
				path.push((x, y));
			}
		});
	}
	if route.len() == 1 {
		path.push(route[0]);
	}
	Some(path)
}
