//! Shared fixtures for the integration tests: a mutable terrain store to
//! back a bank's terrain checker and a plain cell-level Dijkstra to compare
//! hierarchical results against
//!
#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use bevy_quadtree_pathfinding_plugin::prelude::*;

/// A grid of terrain values the tests can mutate while a bank holds a
/// checker reading from it
pub struct TerrainFixture {
	cells: Arc<RwLock<Vec<u8>>>,
	width: i32,
	height: i32,
}

impl TerrainFixture {
	/// All cells walkable terrain `1`
	pub fn open(width: i32, height: i32) -> Self {
		TerrainFixture {
			cells: Arc::new(RwLock::new(vec![1; (width * height) as usize])),
			width,
			height,
		}
	}
	/// All cells walkable except the listed wall cells
	pub fn with_walls(width: i32, height: i32, walls: &[(i32, i32)]) -> Self {
		let fixture = TerrainFixture::open(width, height);
		for (x, y) in walls {
			fixture.set(*x, *y, 0);
		}
		fixture
	}
	/// A terrain checker reading live from the fixture
	pub fn checker(&self) -> TerrainTypesChecker {
		let cells = self.cells.clone();
		let width = self.width;
		Arc::new(move |x, y| cells.read().unwrap()[(x * width + y) as usize])
	}
	/// Overwrite the terrain value of a cell
	pub fn set(&self, x: i32, y: i32, value: u8) {
		self.cells.write().unwrap()[(x * self.width + y) as usize] = value;
	}
	/// Whether the cell currently carries terrain `0`
	pub fn is_wall(&self, x: i32, y: i32) -> bool {
		self.cells.read().unwrap()[(x * self.width + y) as usize] == 0
	}
	/// A bank over this fixture serving the given settings, built and ready
	pub fn bank(&self, settings: Vec<QuadtreeMapSetting>) -> QuadtreeMaps {
		let mut bank = QuadtreeMaps::new(
			self.width,
			self.height,
			chebyshev_distance(1),
			self.checker(),
			settings,
			LeafSizePolicy::default(),
		);
		bank.build();
		bank
	}
}

/// Plain Dijkstra over the 8-connected cell grid under the same metric,
/// treating terrain `0` as impassable. Returns the cost to reach every cell
/// from `(sx, sy)`, `INF` where unreachable
pub fn reference_costs(
	fixture: &TerrainFixture,
	distance: &DistanceCalculator,
	sx: i32,
	sy: i32,
) -> Vec<i32> {
	use std::cmp::Reverse;
	use std::collections::BinaryHeap;
	let (width, height) = (fixture.width, fixture.height);
	let mut costs = vec![INF; (width * height) as usize];
	if fixture.is_wall(sx, sy) {
		return costs;
	}
	let mut heap = BinaryHeap::new();
	costs[(sx * width + sy) as usize] = 0;
	heap.push(Reverse((0, sx, sy)));
	while let Some(Reverse((cost, x, y))) = heap.pop() {
		if cost > costs[(x * width + y) as usize] {
			continue;
		}
		for dx in -1..=1 {
			for dy in -1..=1 {
				if dx == 0 && dy == 0 {
					continue;
				}
				let (nx, ny) = (x + dx, y + dy);
				if nx < 0 || nx >= height || ny < 0 || ny >= width || fixture.is_wall(nx, ny) {
					continue;
				}
				let next = cost + (**distance)(x, y, nx, ny);
				let index = (nx * width + ny) as usize;
				if next < costs[index] {
					costs[index] = next;
					heap.push(Reverse((next, nx, ny)));
				}
			}
		}
	}
	costs
}

/// Reference cost between a single pair of cells
pub fn reference_cost_between(
	fixture: &TerrainFixture,
	distance: &DistanceCalculator,
	sx: i32,
	sy: i32,
	tx: i32,
	ty: i32,
) -> i32 {
	reference_costs(fixture, distance, sx, sy)[(tx * fixture.width + ty) as usize]
}
