//! Flow-field pathfinding: instead of one path for one agent, a reverse
//! field directing every cell of a destination rectangle towards a shared
//! target, refined over three stages:
//!
//! 1. a node flow field over the leaves, stopping once every leaf touching
//!    the rectangle is settled
//! 2. a gate flow field over the gate cells, optionally pruned to the
//!    crossings the node field plans through
//! 3. the per-cell field inside the rectangle, derived with two dynamic
//!    programming sweeps per leaf rather than another Dijkstra - every leaf
//!    is free of obstacles so optimal in-leaf routes enter from the leaf
//!    border and the sweeps settle them in linear time
//!

use std::collections::HashSet;

use bevy::prelude::*;

use super::PathFinderHelper;
use crate::quadmap::{
	bank::QuadtreeMaps,
	graph::{compute_flow_field, FlowFieldData},
	grid::{compute_straight_line, Rectangle, INF},
	map::QuadtreeMap,
	quadtree::NodeId,
};

/// Reverse flow field over the leaves of the node graph
pub type NodeFlowField = FlowFieldData<NodeId>;
/// Reverse flow field over packed gate cells
pub type GateFlowField = FlowFieldData<i32>;
/// Reverse flow field over the packed cells of the query rectangle
pub type CellFlowField = FlowFieldData<i32>;

/// Computes flow fields guiding every cell of a query rectangle towards a
/// target cell, over a [QuadtreeMap] picked from the bank at reset
pub struct FlowFieldPathfinder<'a> {
	/// Bank the map is selected from
	maps: &'a QuadtreeMaps,
	/// Map of the current query, [None] until a successful reset
	m: Option<&'a QuadtreeMap>,
	/// Temporary overlay joining the target and rectangle interior into the
	/// gate graph
	helper: PathFinderHelper,
	/// Packed target cell
	t: i32,
	/// Target cell coordinates
	tx: i32,
	ty: i32,
	/// Leaf containing the target
	t_node: Option<NodeId>,
	/// Destination rectangle of the query
	qrange: Rectangle,
	/// Obstacle-free leaves overlapping the rectangle
	nodes_overlapping: HashSet<NodeId>,
	/// Gate cells (and overlay virtual gates) inside those leaves, the
	/// coverage goal of the gate stage
	gates_in_overlapping: HashSet<i32>,
	/// Gate cells on the node field's plan, the prune set of the gate stage
	gate_cells_on_node_fields: HashSet<i32>,
	/// Stage 1 result
	node_field: NodeFlowField,
	/// Stage 2 result
	gate_field: GateFlowField,
	/// Stage 3 result
	final_field: CellFlowField,
}

impl<'a> FlowFieldPathfinder<'a> {
	/// Create a new instance of [FlowFieldPathfinder] querying maps of `maps`
	pub fn new(maps: &'a QuadtreeMaps) -> Self {
		FlowFieldPathfinder {
			maps,
			m: None,
			helper: PathFinderHelper::default(),
			t: 0,
			tx: 0,
			ty: 0,
			t_node: None,
			qrange: Rectangle::default(),
			nodes_overlapping: HashSet::new(),
			gates_in_overlapping: HashSet::new(),
			gate_cells_on_node_fields: HashSet::new(),
			node_field: NodeFlowField::default(),
			gate_field: GateFlowField::default(),
			final_field: CellFlowField::default(),
		}
	}
	/// Get the computed node flow field
	pub fn get_node_flow_field(&self) -> &NodeFlowField {
		&self.node_field
	}
	/// Get the computed gate flow field
	pub fn get_gate_flow_field(&self) -> &GateFlowField {
		&self.gate_field
	}
	/// Get the computed per-cell flow field of the query rectangle
	pub fn get_final_flow_field(&self) -> &CellFlowField {
		&self.final_field
	}
	/// Prepare a query directing cells of `qrange` towards `(tx, ty)` for an
	/// agent of `agent_size` walking `terrain_mask`. Returns false when the
	/// rectangle is malformed, no map serves the combination or the target is
	/// out of bounds; compute calls then yield nothing
	pub fn reset(
		&mut self,
		tx: i32,
		ty: i32,
		qrange: Rectangle,
		agent_size: i32,
		terrain_mask: u8,
	) -> bool {
		self.m = None;
		self.t_node = None;
		self.qrange = qrange;
		self.nodes_overlapping.clear();
		self.gates_in_overlapping.clear();
		self.gate_cells_on_node_fields.clear();
		self.node_field.clear();
		self.gate_field.clear();
		self.final_field.clear();
		self.helper.reset();
		if !qrange.is_valid() {
			debug!("Flow field query range {:?} is malformed", qrange);
			return false;
		}
		let Some(m) = self.maps.get(agent_size, terrain_mask) else {
			return false;
		};
		let Some(t_node) = m.find_node(tx, ty) else {
			debug!("Flow field target ({}, {}) out of bounds", tx, ty);
			return false;
		};
		self.m = Some(m);
		self.t = m.pack_xy(tx, ty);
		self.tx = tx;
		self.ty = ty;
		self.t_node = Some(t_node);
		// the rectangle only ever receives directions within obstacle-free
		// leaves, blocked cells are their own leaves and excluded here
		m.nodes_in_range(&qrange, |node| {
			if m.is_empty_leaf(node) {
				self.nodes_overlapping.insert(node);
			}
		});
		for node in self.nodes_overlapping.iter() {
			m.for_each_gate_cell_in_node(*node, |cell| {
				self.gates_in_overlapping.insert(cell);
			});
		}
		// join the target into the gate graph; as a virtual gate it also
		// counts towards the coverage goal when it sits inside the rectangle
		if !m.is_gate_cell(t_node, self.t) {
			self.helper.add_cell_to_node_on_tmp_graph(m, self.t, t_node);
			if qrange.contains(tx, ty) {
				self.gates_in_overlapping.insert(self.t);
			}
		}
		// where the target's own leaf overlaps the rectangle the best route
		// is a straight line, so the interior cells of the overlap connect
		// directly to the target as virtual gates. Gate cells of the leaf are
		// skipped, they already reach the target through the graph above
		if let Some(overlap) = m.get_node_rect(t_node).overlap(&qrange) {
			for x in overlap.x1..=overlap.x2 {
				for y in overlap.y1..=overlap.y2 {
					let u = m.pack_xy(x, y);
					if u != self.t && !m.is_gate_cell(t_node, u) {
						self.helper.connect_cells_on_tmp_graph(m, u, self.t);
						self.gates_in_overlapping.insert(u);
					}
				}
			}
		}
		true
	}
	/// Stage 1: reverse shortest paths from the target leaf over the node
	/// graph, stopping once every leaf overlapping the rectangle is settled
	pub fn compute_node_flow_field(&mut self) -> bool {
		let Some(m) = self.m else {
			return false;
		};
		let Some(t_node) = self.t_node else {
			return false;
		};
		if m.is_obstacle(self.tx, self.ty) {
			return false;
		}
		if !self.node_field.is_empty() {
			self.node_field.clear();
		}
		let field = &mut self.node_field;
		let goal_nodes = &self.nodes_overlapping;
		let goal_total = goal_nodes.len();
		let mut settled = 0;
		compute_flow_field(
			t_node,
			field,
			|u, visit| m.for_each_neighbour_nodes(u, |v, weight| visit(v, weight)),
			None::<fn(NodeId) -> bool>,
			Some(move |node: NodeId| {
				if goal_nodes.contains(&node) {
					settled += 1;
				}
				settled >= goal_total
			}),
		);
		true
	}
	/// Stage 2: reverse shortest paths from the target over the gate graph
	/// plus the overlay, stopping once every gate inside the rectangle's
	/// leaves is settled. With `use_node_field` expansion is restricted to
	/// the gates along the node field's plan, pruning most of the graph at
	/// the cost of possibly suboptimal per-cell routes; calling it without a
	/// computed node field is then a no-op yielding false
	pub fn compute_gate_flow_field(&mut self, use_node_field: bool) -> bool {
		let Some(m) = self.m else {
			return false;
		};
		if self.t_node.is_none() {
			return false;
		}
		if m.is_obstacle(self.tx, self.ty) {
			return false;
		}
		if !self.gate_field.is_empty() {
			self.gate_field.clear();
		}
		if use_node_field {
			if self.node_field.is_empty() {
				return false;
			}
			self.gate_cells_on_node_fields.clear();
			self.collect_gate_cells_on_node_field();
		}
		let field = &mut self.gate_field;
		let goal_gates = &self.gates_in_overlapping;
		let plan_gates = &self.gate_cells_on_node_fields;
		let helper = &self.helper;
		let goal_total = goal_gates.len();
		let mut settled = 0;
		compute_flow_field(
			self.t,
			field,
			|u, visit| helper.for_each_neighbour_gate_with_tmp(m, u, |v, weight| visit(v, weight)),
			Some(move |v: i32| !use_node_field || plan_gates.contains(&v)),
			Some(move |cell: i32| {
				if goal_gates.contains(&cell) {
					settled += 1;
				}
				settled >= goal_total
			}),
		);
		true
	}
	/// The gates the node field routes through: for every leaf on the field
	/// the gates crossing to its next leaf, plus the target and its overlay
	/// neighbours
	fn collect_gate_cells_on_node_field(&mut self) {
		let m = self.m.unwrap();
		let t_node = self.t_node.unwrap();
		let plan = &mut self.gate_cells_on_node_fields;
		plan.insert(self.t);
		self.helper.for_each_tmp_neighbour(self.t, |v, _| {
			if !m.is_gate_cell(t_node, v) {
				plan.insert(v);
			}
		});
		for (node, next, _) in self.node_field.iter() {
			// the target leaf routes to itself
			if node == t_node {
				continue;
			}
			m.for_each_gate_in_node(node, |gate| {
				if gate.b_node == next {
					plan.insert(gate.a);
					plan.insert(gate.b);
				}
			});
		}
	}
	/// Stage 3: the per-cell field of the query rectangle. Gate field entries
	/// seed the costs, then every overlapping leaf is settled with a forward
	/// and a backward relaxation sweep
	pub fn compute_final_flow_field_in_query_range(&mut self) -> bool {
		let Some(m) = self.m else {
			return false;
		};
		if self.t_node.is_none() {
			return false;
		}
		if m.is_obstacle(self.tx, self.ty) {
			return false;
		}
		if !self.final_field.is_empty() {
			self.final_field.clear();
		}
		let width = m.get_width();
		let height = m.get_height();
		let size = (width * height) as usize;
		// f is the best known cost to the target per cell, from the
		// neighbour cell that cost arrives through
		let mut f = vec![INF; size];
		let mut from = vec![-1i32; size];
		// cells seeded from the gate field keep their authoritative cost
		let mut seeded = vec![false; size];
		for (v, next, cost) in self.gate_field.iter() {
			let (x, y) = m.unpack_xy(v);
			let index = v as usize;
			f[index] = cost;
			if self.qrange.contains(x, y) {
				let (nx, ny) = m.unpack_xy(next);
				let (sx, sy) = find_neighbour_cell_by_next(x, y, nx, ny);
				from[index] = m.pack_xy(sx, sy);
			}
			seeded[index] = true;
		}
		let c1 = m.distance(0, 0, 0, 1);
		let c2 = m.distance(0, 0, 1, 1);
		for node in self.nodes_overlapping.iter() {
			let rect = m.get_node_rect(*node);
			sweep_forward(m, &rect, &mut f, &mut from, &seeded, c1, c2);
			sweep_backward(m, &rect, &mut f, &mut from, &seeded, c1, c2);
		}
		let x_from = self.qrange.x1.max(0);
		let x_to = self.qrange.x2.min(height - 1);
		let y_from = self.qrange.y1.max(0);
		let y_to = self.qrange.y2.min(width - 1);
		for x in x_from..=x_to {
			for y in y_from..=y_to {
				let index = (x * width + y) as usize;
				if f[index] >= INF || from[index] < 0 {
					continue;
				}
				self.final_field
					.insert(m.pack_xy(x, y), from[index], f[index]);
			}
		}
		true
	}
	/// Emit a computed field through `visitor` as
	/// `(x, y, x_next, y_next, cost)` entries
	pub fn visit_cell_flow_field<F: FnMut(i32, i32, i32, i32, i32)>(
		&self,
		field: &CellFlowField,
		mut visitor: F,
	) {
		let Some(m) = self.m else {
			return;
		};
		for (v, next, cost) in field.iter() {
			let (x, y) = m.unpack_xy(v);
			let (nx, ny) = m.unpack_xy(next);
			visitor(x, y, nx, ny, cost);
		}
	}
}

/// Forward relaxation sweep of one leaf, top-left towards bottom-right,
/// pulling costs from the up/left/diagonal neighbours within the leaf
fn sweep_forward(
	m: &QuadtreeMap,
	rect: &Rectangle,
	f: &mut [i32],
	from: &mut [i32],
	seeded: &[bool],
	c1: i32,
	c2: i32,
) {
	let width = m.get_width();
	for x in rect.x1..=rect.x2 {
		for y in rect.y1..=rect.y2 {
			let index = (x * width + y) as usize;
			if seeded[index] {
				continue;
			}
			let mut relax = |nx: i32, ny: i32, step: i32| {
				let neighbour = (nx * width + ny) as usize;
				if f[index] > f[neighbour] + step {
					f[index] = f[neighbour] + step;
					from[index] = nx * width + ny;
				}
			};
			if x > rect.x1 && y > rect.y1 {
				relax(x - 1, y - 1, c2);
			}
			if x > rect.x1 {
				relax(x - 1, y, c1);
			}
			if y > rect.y1 {
				relax(x, y - 1, c1);
			}
			if x > rect.x1 && y < rect.y2 {
				relax(x - 1, y + 1, c2);
			}
		}
	}
}

/// Backward relaxation sweep of one leaf, bottom-right towards top-left,
/// pulling costs from the down/right/diagonal neighbours within the leaf
fn sweep_backward(
	m: &QuadtreeMap,
	rect: &Rectangle,
	f: &mut [i32],
	from: &mut [i32],
	seeded: &[bool],
	c1: i32,
	c2: i32,
) {
	let width = m.get_width();
	for x in (rect.x1..=rect.x2).rev() {
		for y in (rect.y1..=rect.y2).rev() {
			let index = (x * width + y) as usize;
			if seeded[index] {
				continue;
			}
			let mut relax = |nx: i32, ny: i32, step: i32| {
				let neighbour = (nx * width + ny) as usize;
				if f[index] > f[neighbour] + step {
					f[index] = f[neighbour] + step;
					from[index] = nx * width + ny;
				}
			};
			if x < rect.x2 && y < rect.y2 {
				relax(x + 1, y + 1, c2);
			}
			if x < rect.x2 {
				relax(x + 1, y, c1);
			}
			if y < rect.y2 {
				relax(x, y + 1, c1);
			}
			if x < rect.x2 && y > rect.y1 {
				relax(x + 1, y - 1, c2);
			}
		}
	}
}

/// The neighbour of `(x, y)` on the way to `(nx, ny)`: the next cell itself
/// when it is already adjacent, otherwise the second cell of the straight
/// line towards it
fn find_neighbour_cell_by_next(x: i32, y: i32, nx: i32, ny: i32) -> (i32, i32) {
	let dx = nx - x;
	let dy = ny - y;
	if (-1..=1).contains(&dx) && (-1..=1).contains(&dy) {
		return (nx, ny);
	}
	let mut result = (x, y);
	compute_straight_line(
		x,
		y,
		nx,
		ny,
		|cx, cy| {
			if cx != x || cy != y {
				result = (cx, cy);
			}
		},
		Some(2),
	);
	result
}
