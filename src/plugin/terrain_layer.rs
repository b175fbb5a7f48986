//! Logic for handling terrain changes which in turn rebuild the affected
//! parts of every [QuadtreeMaps] bank and drop cached paths the change may
//! have invalidated
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Emitted by the host after it has mutated the terrain store backing a
/// bank's terrain checker, so the decompositions can catch up
#[derive(Event)]
pub struct EventUpdateTerrainCell {
	/// The `(x, y)` cell whose terrain value changed
	cell: (i32, i32),
}

impl EventUpdateTerrainCell {
	/// Create a new instance of [EventUpdateTerrainCell]
	pub fn new(x: i32, y: i32) -> Self {
		EventUpdateTerrainCell { cell: (x, y) }
	}
	/// Get the changed cell
	pub fn get_cell(&self) -> (i32, i32) {
		self.cell
	}
}

/// Emitted once a bank has been updated so caches depending on the old
/// decomposition can be cleaned
#[derive(Event)]
pub struct EventCleanPathCache {
	/// The `(x, y)` cell whose terrain value changed
	cell: (i32, i32),
}

impl EventCleanPathCache {
	/// Get the changed cell
	pub fn get_cell(&self) -> (i32, i32) {
		self.cell
	}
}

/// Read [EventUpdateTerrainCell] and route each changed cell into every
/// spawned [QuadtreeMaps]
pub fn process_terrain_updates(
	mut events: EventReader<EventUpdateTerrainCell>,
	mut maps_q: Query<&mut QuadtreeMaps>,
	mut event_clean: EventWriter<EventCleanPathCache>,
) {
	for event in events.read() {
		let (x, y) = event.get_cell();
		for mut maps in maps_q.iter_mut() {
			maps.update(x, y);
		}
		event_clean.send(EventCleanPathCache { cell: (x, y) });
	}
}

/// Drop every cached path since a terrain change may have closed the ground
/// it walks over or opened a cheaper route. Actors re-request what they still
/// need and get paths over the fresh decomposition
pub fn clean_path_cache(
	mut events: EventReader<EventCleanPathCache>,
	mut cache_q: Query<&mut PathCache>,
) {
	let mut changed = false;
	for _ in events.read() {
		changed = true;
	}
	if changed {
		for mut cache in cache_q.iter_mut() {
			let count = cache.get().len();
			if count > 0 {
				debug!("Terrain change invalidated {} cached paths", count);
				cache.get_mut().clear();
			}
		}
	}
}
