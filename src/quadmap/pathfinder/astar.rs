//! Point-to-point pathfinding as staged refinement: a coarse route over the
//! node graph, an exact route over the gate graph pruned by the coarse one,
//! and finally straight-line cell filling between consecutive route cells.
//!
//! A host typically runs the stages back to back but may stop early, e.g
//! using only the node route to decide whether a journey is worth starting
//!

use std::collections::HashSet;

use bevy::prelude::*;

use super::PathFinderHelper;
use crate::quadmap::{
	bank::QuadtreeMaps,
	graph::compute_astar,
	grid::{compute_straight_line, Rectangle},
	map::QuadtreeMap,
	quadtree::NodeId,
};

/// Computes shortest paths between two cells over a [QuadtreeMap] picked
/// from the bank at reset. The pathfinder owns its scratch state and can be
/// reset for any number of queries
pub struct AStarPathfinder<'a> {
	/// Bank the map is selected from
	maps: &'a QuadtreeMaps,
	/// Map of the current query, [None] until a successful reset
	m: Option<&'a QuadtreeMap>,
	/// Temporary overlay joining the endpoints into the gate graph
	helper: PathFinderHelper,
	/// Packed start cell
	s: i32,
	/// Packed target cell
	t: i32,
	/// Leaf containing the start
	s_node: Option<NodeId>,
	/// Leaf containing the target
	t_node: Option<NodeId>,
	/// Route over the node graph with cumulative costs, start leaf first
	node_path: Vec<(NodeId, i32)>,
}

impl<'a> AStarPathfinder<'a> {
	/// Create a new instance of [AStarPathfinder] querying maps of `maps`
	pub fn new(maps: &'a QuadtreeMaps) -> Self {
		AStarPathfinder {
			maps,
			m: None,
			helper: PathFinderHelper::default(),
			s: 0,
			t: 0,
			s_node: None,
			t_node: None,
			node_path: Vec::new(),
		}
	}
	/// Prepare a query from `(x1, y1)` to `(x2, y2)` for an agent of
	/// `agent_size` walking `terrain_mask`. Returns false when no map serves
	/// the combination, an endpoint is out of bounds or the target cell is an
	/// obstacle; compute calls then yield nothing
	pub fn reset(
		&mut self,
		x1: i32,
		y1: i32,
		x2: i32,
		y2: i32,
		agent_size: i32,
		terrain_mask: u8,
	) -> bool {
		self.m = None;
		self.s_node = None;
		self.t_node = None;
		self.node_path.clear();
		self.helper.reset();
		let Some(m) = self.maps.get(agent_size, terrain_mask) else {
			return false;
		};
		let (Some(s_node), Some(t_node)) = (m.find_node(x1, y1), m.find_node(x2, y2)) else {
			debug!("Path endpoints ({}, {}) -> ({}, {}) out of bounds", x1, y1, x2, y2);
			return false;
		};
		if m.is_obstacle(x2, y2) {
			debug!("Path target ({}, {}) is an obstacle", x2, y2);
			return false;
		}
		self.m = Some(m);
		self.s = m.pack_xy(x1, y1);
		self.t = m.pack_xy(x2, y2);
		self.s_node = Some(s_node);
		self.t_node = Some(t_node);
		// join the endpoints into the gate graph unless they already are on it
		if !m.is_gate_cell(s_node, self.s) {
			self.helper.add_cell_to_node_on_tmp_graph(m, self.s, s_node);
		}
		if !m.is_gate_cell(t_node, self.t) {
			self.helper.add_cell_to_node_on_tmp_graph(m, self.t, t_node);
		}
		// endpoints sharing a leaf can always walk a straight line
		if s_node == t_node && self.s != self.t {
			self.helper.connect_cells_on_tmp_graph(m, self.s, self.t);
		}
		true
	}
	/// A* over the node graph from the start leaf to the target leaf using
	/// leaf centre distance as the heuristic. Records the route for later
	/// stages and returns its cost, [None] when the leaves are disconnected
	pub fn compute_node_routes(&mut self) -> Option<i32> {
		let m = self.m?;
		let s_node = self.s_node?;
		let t_node = self.t_node?;
		self.node_path.clear();
		if s_node == t_node {
			self.node_path.push((s_node, 0));
			return Some(0);
		}
		let target_rect = m.get_node_rect(t_node);
		let (tcx, tcy) = rect_centre(&target_rect);
		let (cost, path) = compute_astar(
			s_node,
			t_node,
			|u, visit| m.for_each_neighbour_nodes(u, |v, weight| visit(v, weight)),
			|v| {
				let rect = m.get_node_rect(v);
				let (cx, cy) = rect_centre(&rect);
				m.distance(cx, cy, tcx, tcy)
			},
			None::<fn(NodeId) -> bool>,
		)?;
		let mut cumulative = 0;
		self.node_path.push((path[0], 0));
		for pair in path.windows(2) {
			cumulative += m.get_node_connection(pair[0], pair[1]).unwrap().distance;
			self.node_path.push((pair[1], cumulative));
		}
		Some(cost)
	}
	/// Number of leaves on the computed node route
	pub fn node_path_size(&self) -> usize {
		self.node_path.len()
	}
	/// Visit the leaves of the computed node route in order
	pub fn visit_computed_node_routes<F: FnMut(NodeId, Rectangle)>(&self, mut visitor: F) {
		let Some(m) = self.m else {
			return;
		};
		for (node, _) in self.node_path.iter() {
			visitor(*node, m.get_node_rect(*node));
		}
	}
	/// A* over the gate graph plus the overlay, emitting the route cells in
	/// order to `collector` and returning the total cost. With
	/// `use_node_path` the search only expands cells inside leaves of the
	/// node route, trading exactness for a much smaller search space; calling
	/// it without a computed node route is a no-op yielding [None]
	pub fn compute_gate_routes<F: FnMut(i32, i32)>(
		&self,
		mut collector: F,
		use_node_path: bool,
	) -> Option<i32> {
		let m = self.m?;
		let (tx, ty) = m.unpack_xy(self.t);
		if m.is_obstacle(tx, ty) {
			return None;
		}
		if use_node_path && self.node_path.is_empty() {
			return None;
		}
		if self.s == self.t {
			let (x, y) = m.unpack_xy(self.s);
			collector(x, y);
			return Some(0);
		}
		let allowed: HashSet<NodeId> = if use_node_path {
			self.node_path.iter().map(|(node, _)| *node).collect()
		} else {
			HashSet::new()
		};
		let (s, t) = (self.s, self.t);
		let filter = move |v: i32| {
			if !use_node_path || v == s || v == t {
				return true;
			}
			let (x, y) = m.unpack_xy(v);
			match m.find_node(x, y) {
				Some(node) => allowed.contains(&node),
				None => false,
			}
		};
		let (cost, path) = compute_astar(
			self.s,
			self.t,
			|u, visit| {
				self.helper
					.for_each_neighbour_gate_with_tmp(m, u, |v, weight| visit(v, weight))
			},
			|v| m.distance_between(v, self.t),
			Some(filter),
		)?;
		for cell in path {
			let (x, y) = m.unpack_xy(cell);
			collector(x, y);
		}
		Some(cost)
	}
	/// Emit the straight line of cells between two consecutive route cells,
	/// inclusive of both. Consecutive route cells always share a leaf or are
	/// adjacent, so the line is guaranteed walkable
	pub fn compute_path_to_next_route_cell<F: FnMut(i32, i32)>(
		&self,
		x1: i32,
		y1: i32,
		x2: i32,
		y2: i32,
		collector: F,
	) {
		compute_straight_line(x1, y1, x2, y2, collector, None);
	}
}

/// Centre cell of a rectangle
fn rect_centre(rect: &Rectangle) -> (i32, i32) {
	((rect.x1 + rect.x2) / 2, (rect.y1 + rect.y2) / 2)
}
