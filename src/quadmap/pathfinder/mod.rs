//! Pathfinders answering queries against a [crate::quadmap::bank::QuadtreeMaps]
//! bank.
//!
//! Both pathfinders stage their work over the same two abstract graphs, the
//! node graph first for a coarse plan and the gate graph for exact routing.
//! Start and target cells are usually not gate cells though, so each query
//! lays a temporary overlay over the gate graph connecting its own cells into
//! the containing leaves. The overlay lives in [PathFinderHelper] and is
//! discarded on every reset, the map itself is never touched by a query
//!

pub mod astar;
pub mod flow_field;

use super::{graph::SimpleDirectedGraph, map::QuadtreeMap, quadtree::NodeId};

/// The per-query temporary graph layered over a map's gate graph
#[derive(Default)]
pub struct PathFinderHelper {
	/// Overlay edges, composed with the gate graph during neighbour visits
	tmp: SimpleDirectedGraph,
}

impl PathFinderHelper {
	/// Discard the overlay of the previous query
	pub fn reset(&mut self) {
		self.tmp.clear();
	}
	/// Connect the non-gate cell `cell` to every gate cell of `node` at
	/// straight-line distance, in both directions. Valid because a walkable
	/// leaf contains no obstacles
	pub fn add_cell_to_node_on_tmp_graph(&mut self, m: &QuadtreeMap, cell: i32, node: NodeId) {
		let mut gate_cells = Vec::new();
		m.for_each_gate_cell_in_node(node, |gate_cell| gate_cells.push(gate_cell));
		for gate_cell in gate_cells {
			if gate_cell == cell {
				continue;
			}
			let weight = m.distance_between(cell, gate_cell);
			self.tmp.add_edge(cell, gate_cell, weight);
			self.tmp.add_edge(gate_cell, cell, weight);
		}
	}
	/// Connect two cells directly at straight-line distance, in both
	/// directions
	pub fn connect_cells_on_tmp_graph(&mut self, m: &QuadtreeMap, u: i32, v: i32) {
		let weight = m.distance_between(u, v);
		self.tmp.add_edge(u, v, weight);
		self.tmp.add_edge(v, u, weight);
	}
	/// Visit the neighbours of `u` on the union of the map's gate graph and
	/// the overlay
	pub fn for_each_neighbour_gate_with_tmp<F: FnMut(i32, i32)>(
		&self,
		m: &QuadtreeMap,
		u: i32,
		mut visitor: F,
	) {
		m.for_each_neighbour_gate(u, |v, weight| visitor(v, weight));
		self.tmp.for_each_neighbours(u, |v, weight| visitor(v, weight));
	}
	/// Visit the neighbours of `u` on the overlay alone
	pub fn for_each_tmp_neighbour<F: FnMut(i32, i32)>(&self, u: i32, visitor: F) {
		self.tmp.for_each_neighbours(u, visitor);
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	use crate::quadmap::{grid::chebyshev_distance, quadtree::LeafSizePolicy};

	fn walled_map() -> QuadtreeMap {
		//  _________________
		// |__|__|__|x_|__|__|
		// |__|__|__|x_|__|__|
		// |__|__|__|__|__|__|
		let mut map = QuadtreeMap::new(
			6,
			6,
			1,
			1,
			chebyshev_distance(1),
			LeafSizePolicy::default(),
		);
		map.build(&|x, y| y == 3 && x < 2);
		map
	}
	#[test]
	fn overlay_connects_a_cell_to_its_leaf_gates() {
		let map = walled_map();
		let mut helper = PathFinderHelper::default();
		let node = map.find_node(0, 0).unwrap();
		let cell = map.pack_xy(0, 0);
		assert!(!map.is_gate_cell(node, cell));
		helper.add_cell_to_node_on_tmp_graph(&map, cell, node);
		let mut reachable = 0;
		helper.for_each_tmp_neighbour(cell, |_, _| reachable += 1);
		assert!(reachable > 0);
	}
	#[test]
	fn overlay_resets_clean() {
		let map = walled_map();
		let mut helper = PathFinderHelper::default();
		let u = map.pack_xy(0, 0);
		let v = map.pack_xy(2, 2);
		helper.connect_cells_on_tmp_graph(&map, u, v);
		helper.reset();
		let mut neighbours = 0;
		helper.for_each_tmp_neighbour(u, |_, _| neighbours += 1);
		assert_eq!(0, neighbours);
	}
	#[test]
	fn union_visits_both_graphs() {
		let map = walled_map();
		let mut helper = PathFinderHelper::default();
		let node = map.find_node(0, 0).unwrap();
		// pick an actual gate cell of the leaf and overlay an extra edge on it
		let mut gate_cell = None;
		map.for_each_gate_cell_in_node(node, |c| {
			if gate_cell.is_none() {
				gate_cell = Some(c);
			}
		});
		let gate_cell = gate_cell.unwrap();
		let extra = map.pack_xy(0, 0);
		helper.connect_cells_on_tmp_graph(&map, gate_cell, extra);
		let mut map_only = 0;
		map.for_each_neighbour_gate(gate_cell, |_, _| map_only += 1);
		let mut with_overlay = 0;
		helper.for_each_neighbour_gate_with_tmp(&map, gate_cell, |_, _| with_overlay += 1);
		let result = with_overlay;
		let actual = map_only + 1;
		assert_eq!(actual, result);
	}
}
