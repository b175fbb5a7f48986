//! Weighted graph storage plus the two search engines shared by every layer
//! of the pathfinders.
//!
//! The node graph, the gate graph and the per-query temporary overlay all
//! expose their adjacency as a neighbour-visitor closure, so a single A* and
//! a single reverse-Dijkstra implementation serve all of them and composing
//! two graphs is just calling two visitors
//!

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::hash::Hash;

use super::grid::INF;

/// A directed graph of packed cells with integer edge weights. Inserting an
/// existing edge overwrites its weight, making gate maintenance idempotent
#[derive(Default, Clone, Debug)]
pub struct SimpleDirectedGraph {
	/// Neighbours per vertex, ordered for deterministic visitation
	edges: HashMap<i32, BTreeMap<i32, i32>>,
}

impl SimpleDirectedGraph {
	/// Add the edge `u -> v` with `weight`, replacing any existing weight
	pub fn add_edge(&mut self, u: i32, v: i32, weight: i32) {
		self.edges.entry(u).or_default().insert(v, weight);
	}
	/// Remove the edge `u -> v` if present
	pub fn remove_edge(&mut self, u: i32, v: i32) {
		if let Some(neighbours) = self.edges.get_mut(&u) {
			neighbours.remove(&v);
			if neighbours.is_empty() {
				self.edges.remove(&u);
			}
		}
	}
	/// Remove every edge
	pub fn clear(&mut self) {
		self.edges.clear();
	}
	/// Visit every neighbour of `u` with the edge weight
	pub fn for_each_neighbours<F: FnMut(i32, i32)>(&self, u: i32, mut visitor: F) {
		if let Some(neighbours) = self.edges.get(&u) {
			for (v, weight) in neighbours.iter() {
				visitor(*v, *weight);
			}
		}
	}
}

/// A reverse flow field over vertices of type `V`: for every covered vertex
/// the cost of the cheapest route to the target and the next vertex along it.
/// The target itself carries cost `0` and points at itself
#[derive(Clone, Debug)]
pub struct FlowFieldData<V: Copy + Eq + Hash> {
	/// Cost to the target per vertex
	costs: HashMap<V, i32>,
	/// Next vertex towards the target per vertex
	nexts: HashMap<V, V>,
}

impl<V: Copy + Eq + Hash> Default for FlowFieldData<V> {
	fn default() -> Self {
		FlowFieldData {
			costs: HashMap::new(),
			nexts: HashMap::new(),
		}
	}
}

impl<V: Copy + Eq + Hash> FlowFieldData<V> {
	/// Remove every entry
	pub fn clear(&mut self) {
		self.costs.clear();
		self.nexts.clear();
	}
	/// Number of covered vertices
	pub fn len(&self) -> usize {
		self.costs.len()
	}
	/// Whether the field covers no vertices
	pub fn is_empty(&self) -> bool {
		self.costs.is_empty()
	}
	/// Cost from `v` to the target, [None] when `v` is not covered
	pub fn get_cost(&self, v: V) -> Option<i32> {
		self.costs.get(&v).copied()
	}
	/// Next vertex from `v` towards the target, [None] when `v` is not covered
	pub fn get_next(&self, v: V) -> Option<V> {
		self.nexts.get(&v).copied()
	}
	/// Record `v` routing through `next` at `cost`
	pub(crate) fn insert(&mut self, v: V, next: V, cost: i32) {
		self.costs.insert(v, cost);
		self.nexts.insert(v, next);
	}
	/// Iterate over `(vertex, next, cost)` entries
	pub fn iter(&self) -> impl Iterator<Item = (V, V, i32)> + '_ {
		self.costs.iter().map(|(v, cost)| (*v, self.nexts[v], *cost))
	}
}

/// A* from `start` to `target` over whatever adjacency `neighbours` exposes.
///
/// Vertices are expanded cheapest f-score first, ties broken by the smaller
/// g-score and then by insertion order. `filter` can reject neighbours before
/// they are relaxed, pruning the search space. Returns the total cost and the
/// vertex sequence, [None] when the target is unreachable
pub(crate) fn compute_astar<V, NF, HF, TF>(
	start: V,
	target: V,
	mut neighbours: NF,
	heuristic: HF,
	mut filter: Option<TF>,
) -> Option<(i32, Vec<V>)>
where
	V: Copy + Eq + Hash + Ord,
	NF: FnMut(V, &mut dyn FnMut(V, i32)),
	HF: Fn(V) -> i32,
	TF: FnMut(V) -> bool,
{
	let mut g_scores: HashMap<V, i32> = HashMap::new();
	let mut parents: HashMap<V, V> = HashMap::new();
	let mut heap: BinaryHeap<Reverse<(i32, i32, u64, V)>> = BinaryHeap::new();
	let mut sequence: u64 = 0;
	g_scores.insert(start, 0);
	heap.push(Reverse((heuristic(start), 0, sequence, start)));
	while let Some(Reverse((_, g, _, u))) = heap.pop() {
		if g > *g_scores.get(&u).unwrap_or(&INF) {
			// a cheaper route to u was found after this entry was queued
			continue;
		}
		if u == target {
			let mut path = vec![u];
			let mut cursor = u;
			while let Some(parent) = parents.get(&cursor) {
				cursor = *parent;
				path.push(cursor);
			}
			path.reverse();
			return Some((g, path));
		}
		neighbours(u, &mut |v, weight| {
			if let Some(test) = filter.as_mut() {
				if !test(v) {
					return;
				}
			}
			let tentative = g + weight;
			if tentative < *g_scores.get(&v).unwrap_or(&INF) {
				g_scores.insert(v, tentative);
				parents.insert(v, u);
				sequence += 1;
				heap.push(Reverse((tentative + heuristic(v), tentative, sequence, v)));
			}
		});
	}
	None
}

/// Reverse Dijkstra from `source`, writing every settled vertex into `field`.
///
/// Because the graphs are symmetric the settled cost of a vertex is its cost
/// *to* the source and the recorded next vertex is the first hop towards it.
/// `stop` is consulted as each vertex settles and ends the expansion once it
/// returns true; `filter` rejects neighbours before relaxation
pub(crate) fn compute_flow_field<V, NF, TF, SF>(
	source: V,
	field: &mut FlowFieldData<V>,
	mut neighbours: NF,
	mut filter: Option<TF>,
	mut stop: Option<SF>,
) where
	V: Copy + Eq + Hash + Ord,
	NF: FnMut(V, &mut dyn FnMut(V, i32)),
	TF: FnMut(V) -> bool,
	SF: FnMut(V) -> bool,
{
	let mut g_scores: HashMap<V, i32> = HashMap::new();
	let mut parents: HashMap<V, V> = HashMap::new();
	let mut heap: BinaryHeap<Reverse<(i32, u64, V)>> = BinaryHeap::new();
	let mut sequence: u64 = 0;
	g_scores.insert(source, 0);
	heap.push(Reverse((0, sequence, source)));
	while let Some(Reverse((g, _, u))) = heap.pop() {
		if g > *g_scores.get(&u).unwrap_or(&INF) {
			continue;
		}
		if field.get_cost(u).is_some() {
			continue;
		}
		let next = *parents.get(&u).unwrap_or(&u);
		field.insert(u, next, g);
		if let Some(check) = stop.as_mut() {
			if check(u) {
				return;
			}
		}
		neighbours(u, &mut |v, weight| {
			if let Some(test) = filter.as_mut() {
				if !test(v) {
					return;
				}
			}
			let tentative = g + weight;
			if tentative < *g_scores.get(&v).unwrap_or(&INF) {
				g_scores.insert(v, tentative);
				parents.insert(v, u);
				sequence += 1;
				heap.push(Reverse((tentative, sequence, v)));
			}
		});
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Two routes of equal length from 0 to 3, plus a long detour
	fn diamond() -> SimpleDirectedGraph {
		let mut graph = SimpleDirectedGraph::default();
		graph.add_edge(0, 1, 1);
		graph.add_edge(0, 2, 1);
		graph.add_edge(1, 3, 1);
		graph.add_edge(2, 3, 1);
		graph.add_edge(0, 3, 5);
		graph
	}
	#[test]
	fn astar_picks_the_cheap_route() {
		let graph = diamond();
		let result = compute_astar(
			0,
			3,
			|u, visit| graph.for_each_neighbours(u, |v, w| visit(v, w)),
			|_| 0,
			None::<fn(i32) -> bool>,
		);
		let (cost, path) = result.unwrap();
		assert_eq!(2, cost);
		assert_eq!(3, path.len());
	}
	#[test]
	fn astar_unreachable_is_none() {
		let graph = diamond();
		let result = compute_astar(
			3,
			0,
			|u, visit| graph.for_each_neighbours(u, |v, w| visit(v, w)),
			|_| 0,
			None::<fn(i32) -> bool>,
		);
		assert!(result.is_none());
	}
	#[test]
	fn astar_filter_prunes() {
		let graph = diamond();
		// refusing both middle vertices leaves only the expensive edge
		let result = compute_astar(
			0,
			3,
			|u, visit| graph.for_each_neighbours(u, |v, w| visit(v, w)),
			|_| 0,
			Some(|v: i32| v != 1 && v != 2),
		);
		let (cost, path) = result.unwrap();
		assert_eq!(5, cost);
		assert_eq!(vec![0, 3], path);
	}
	#[test]
	fn flow_field_costs_and_nexts() {
		let mut graph = SimpleDirectedGraph::default();
		// a line of vertices with symmetric edges
		for v in 0..4 {
			graph.add_edge(v, v + 1, 2);
			graph.add_edge(v + 1, v, 2);
		}
		let mut field = FlowFieldData::default();
		compute_flow_field(
			0,
			&mut field,
			|u, visit| graph.for_each_neighbours(u, |v, w| visit(v, w)),
			None::<fn(i32) -> bool>,
			None::<fn(i32) -> bool>,
		);
		assert_eq!(Some(0), field.get_cost(0));
		assert_eq!(Some(0), field.get_next(0));
		assert_eq!(Some(6), field.get_cost(3));
		assert_eq!(Some(2), field.get_next(3));
	}
	#[test]
	fn flow_field_stops_early() {
		let mut graph = SimpleDirectedGraph::default();
		for v in 0..10 {
			graph.add_edge(v, v + 1, 1);
			graph.add_edge(v + 1, v, 1);
		}
		let mut field = FlowFieldData::default();
		compute_flow_field(
			0,
			&mut field,
			|u, visit| graph.for_each_neighbours(u, |v, w| visit(v, w)),
			None::<fn(i32) -> bool>,
			Some(|v: i32| v == 3),
		);
		assert_eq!(Some(3), field.get_cost(3));
		assert!(field.get_cost(9).is_none());
	}
	#[test]
	fn removed_edges_stop_being_visited() {
		let mut graph = diamond();
		graph.remove_edge(0, 3);
		let mut visited = Vec::new();
		graph.for_each_neighbours(0, |v, _| visited.push(v));
		let actual = vec![1, 2];
		assert_eq!(actual, visited);
	}
}
