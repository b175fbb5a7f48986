//! A bank of [QuadtreeMap]s, one per `(agent size, terrain mask)` setting,
//! kept coherent when terrain mutates.
//!
//! Walkability differs per agent: a wide agent cannot squeeze through a one
//! cell corridor and a boat walks different terrain bits than a soldier. Each
//! setting therefore gets its own decomposition, while settings sharing a
//! terrain mask share a single [ClearanceField] so the expensive clearance
//! bookkeeping is done once per mask
//!

use std::collections::HashMap;

use bevy::prelude::*;

use super::{
	clearance::ClearanceField,
	map::QuadtreeMap,
	quadtree::LeafSizePolicy,
	DistanceCalculator, TerrainTypesChecker,
};

/// One `(agent size, terrain mask)` combination the bank should serve
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Reflect)]
pub struct QuadtreeMapSetting {
	/// Smallest obstacle-free square the agent requires
	agent_size: i32,
	/// Terrain bits the agent treats as walkable
	terrain_mask: u8,
}

impl QuadtreeMapSetting {
	/// Create a new instance of [QuadtreeMapSetting]
	pub fn new(agent_size: i32, terrain_mask: u8) -> Self {
		QuadtreeMapSetting {
			agent_size,
			terrain_mask,
		}
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

/// Convenience builder for the common case of serving every combination of
/// some agent sizes with some terrain masks
pub fn cross_settings(agent_sizes: &[i32], terrain_masks: &[u8]) -> Vec<QuadtreeMapSetting> {
	let mut settings = Vec::with_capacity(agent_sizes.len() * terrain_masks.len());
	for size in agent_sizes {
		for mask in terrain_masks {
			settings.push(QuadtreeMapSetting::new(*size, *mask));
		}
	}
	settings
}

/// The bank of [QuadtreeMap]s an application queries for pathfinding. Spawn
/// it as a component and route terrain changes through
/// [QuadtreeMaps::update]
#[derive(Component)]
pub struct QuadtreeMaps {
	/// Number of columns
	width: i32,
	/// Number of rows
	height: i32,
	/// Metric shared by every contained map
	distance: DistanceCalculator,
	/// Reports the current terrain bitmask of a cell
	terrain: TerrainTypesChecker,
	/// The combinations served by this bank
	settings: Vec<QuadtreeMapSetting>,
	/// One clearance field per distinct terrain mask
	clearances: HashMap<u8, ClearanceField>,
	/// One map per setting
	maps: HashMap<(i32, u8), QuadtreeMap>,
}

impl QuadtreeMaps {
	/// Create a new instance of [QuadtreeMaps]. Call [QuadtreeMaps::build]
	/// before issuing queries
	pub fn new(
		width: i32,
		height: i32,
		distance: DistanceCalculator,
		terrain: TerrainTypesChecker,
		settings: Vec<QuadtreeMapSetting>,
		policy: LeafSizePolicy,
	) -> Self {
		let mut clearances = HashMap::new();
		for setting in settings.iter() {
			let mask = setting.terrain_mask;
			let bound = settings
				.iter()
				.filter(|s| s.terrain_mask == mask)
				.map(|s| s.agent_size)
				.max()
				.unwrap();
			clearances
				.entry(mask)
				.or_insert_with(|| ClearanceField::new(width, height, bound));
		}
		let mut maps = HashMap::new();
		for setting in settings.iter() {
			maps.entry((setting.agent_size, setting.terrain_mask))
				.or_insert_with(|| {
					QuadtreeMap::new(
						width,
						height,
						setting.agent_size,
						setting.terrain_mask,
						distance.clone(),
						policy.clone(),
					)
				});
		}
		QuadtreeMaps {
			width,
			height,
			distance,
			terrain,
			settings,
			clearances,
			maps,
		}
	}
	/// Get the number of columns
	pub fn get_width(&self) -> i32 {
		self.width
	}
	/// Get the number of rows
	pub fn get_height(&self) -> i32 {
		self.height
	}
	/// Get the settings served by this bank
	pub fn get_settings(&self) -> &Vec<QuadtreeMapSetting> {
		&self.settings
	}
	/// Get the map serving exactly `(agent_size, terrain_mask)`, [None] when
	/// the combination was not part of the settings
	pub fn get(&self, agent_size: i32, terrain_mask: u8) -> Option<&QuadtreeMap> {
		let map = self.maps.get(&(agent_size, terrain_mask));
		if map.is_none() {
			trace!(
				"No QuadtreeMap for agent size {} and terrain mask {:#010b}",
				agent_size,
				terrain_mask
			);
		}
		map
	}
	/// Build every clearance field and every contained map
	pub fn build(&mut self) {
		for (mask, clearance) in self.clearances.iter_mut() {
			let mask = *mask;
			let terrain = self.terrain.clone();
			clearance.build(&move |x, y| (*terrain)(x, y) & mask == 0);
		}
		for ((agent_size, mask), map) in self.maps.iter_mut() {
			let clearance = &self.clearances[mask];
			let size = *agent_size;
			map.build(&|x, y| clearance.get(x, y) < size);
		}
	}
	/// Route a terrain change at `(x, y)` to every contained map. The terrain
	/// checker is re-queried for the cell's new value; each map re-evaluates
	/// the walkability of every cell whose clearance changed under its own
	/// parameters
	pub fn update(&mut self, x: i32, y: i32) {
		if x < 0 || x >= self.height || y < 0 || y >= self.width {
			warn!("Terrain update out of bounds at ({}, {})", x, y);
			return;
		}
		let value = (*self.terrain)(x, y);
		for (mask, clearance) in self.clearances.iter_mut() {
			let blocked_now = value & *mask == 0;
			let changed = clearance.update(x, y, blocked_now);
			if changed.is_empty() {
				continue;
			}
			for ((agent_size, map_mask), map) in self.maps.iter_mut() {
				if map_mask != mask {
					continue;
				}
				for (cx, cy) in changed.iter() {
					let blocked = clearance.get(*cx, *cy) < *agent_size;
					map.update(*cx, *cy, blocked);
				}
			}
		}
	}
	/// Post-build finalization hook. Updates are applied eagerly by
	/// [QuadtreeMaps::update] so there is currently nothing to flush, the
	/// hook is retained for hosts that stage their rebuild loops
	pub fn compute(&mut self) {}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	use crate::quadmap::grid::chebyshev_distance;
	use std::sync::{Arc, RwLock};

	fn bank_over(
		width: i32,
		height: i32,
		cells: Arc<RwLock<Vec<u8>>>,
		settings: Vec<QuadtreeMapSetting>,
	) -> QuadtreeMaps {
		let terrain: crate::quadmap::TerrainTypesChecker = Arc::new(move |x, y| {
			let cells = cells.read().unwrap();
			cells[(x * width + y) as usize]
		});
		let mut bank = QuadtreeMaps::new(
			width,
			height,
			chebyshev_distance(1),
			terrain,
			settings,
			LeafSizePolicy::default(),
		);
		bank.build();
		bank
	}
	#[test]
	fn cross_settings_covers_every_combination() {
		let result = cross_settings(&[1, 2], &[0b01, 0b10]);
		let actual = vec![
			QuadtreeMapSetting::new(1, 0b01),
			QuadtreeMapSetting::new(1, 0b10),
			QuadtreeMapSetting::new(2, 0b01),
			QuadtreeMapSetting::new(2, 0b10),
		];
		assert_eq!(actual, result);
	}
	#[test]
	fn get_is_exact_match_only() {
		let cells = Arc::new(RwLock::new(vec![1u8; 16]));
		let bank = bank_over(4, 4, cells, vec![QuadtreeMapSetting::new(1, 1)]);
		assert!(bank.get(1, 1).is_some());
		assert!(bank.get(2, 1).is_none());
		assert!(bank.get(1, 2).is_none());
	}
	#[test]
	fn masks_classify_independently() {
		// two terrain kinds split the grid down the middle
		let width = 4;
		let mut values = vec![0u8; 16];
		for x in 0..4 {
			for y in 0..4 {
				values[(x * width + y) as usize] = if y < 2 { 0b01 } else { 0b10 };
			}
		}
		let cells = Arc::new(RwLock::new(values));
		let bank = bank_over(
			4,
			4,
			cells,
			vec![QuadtreeMapSetting::new(1, 0b01), QuadtreeMapSetting::new(1, 0b10)],
		);
		let land = bank.get(1, 0b01).unwrap();
		let water = bank.get(1, 0b10).unwrap();
		assert!(!land.is_obstacle(0, 0));
		assert!(land.is_obstacle(0, 3));
		assert!(water.is_obstacle(0, 0));
		assert!(!water.is_obstacle(0, 3));
	}
	#[test]
	fn update_reclassifies_changed_cells() {
		let cells = Arc::new(RwLock::new(vec![1u8; 64]));
		let handle = cells.clone();
		let mut bank = bank_over(8, 8, cells, vec![QuadtreeMapSetting::new(1, 1)]);
		assert!(!bank.get(1, 1).unwrap().is_obstacle(3, 3));
		handle.write().unwrap()[3 * 8 + 3] = 0;
		bank.update(3, 3);
		assert!(bank.get(1, 1).unwrap().is_obstacle(3, 3));
		handle.write().unwrap()[3 * 8 + 3] = 1;
		bank.update(3, 3);
		assert!(!bank.get(1, 1).unwrap().is_obstacle(3, 3));
	}
	#[test]
	fn wide_agents_cannot_pass_narrow_gaps() {
		//  _________________
		// |__|__|x_|__|__|__|
		// |__|__|x_|__|__|__|
		// |__|__|x_|__|__|__|
		// |__|__|x_|__|__|__|
		// |__|__|__|__|__|__|   narrow gap on the bottom row
		// |__|__|x_|__|__|__|
		let width = 6;
		let mut values = vec![1u8; 36];
		for x in [0, 1, 2, 3, 5] {
			values[(x * width + 2) as usize] = 0;
		}
		let cells = Arc::new(RwLock::new(values));
		let bank = bank_over(
			6,
			6,
			cells,
			vec![QuadtreeMapSetting::new(1, 1), QuadtreeMapSetting::new(2, 1)],
		);
		let small = bank.get(1, 1).unwrap();
		let wide = bank.get(2, 1).unwrap();
		// the single-cell gap is walkable for size 1 but not size 2
		assert!(!small.is_obstacle(4, 2));
		assert!(wide.is_obstacle(4, 2));
	}
}
