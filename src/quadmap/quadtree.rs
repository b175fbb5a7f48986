//! An arena-allocated region quadtree over a grid of cells. The tree
//! recursively splits the grid into rectangular leaves until every leaf is
//! either free of blocking cells or is a single blocked cell:
//!
//! ```text
//!  _________________________
//! |            |     |      |
//! |            |_____|__ ___|
//! |            |_|x|_|      |
//! |            |_|_|_|      |
//! |____________|_____|______|
//! ```
//!
//! Leaves are addressed by stable [NodeId] indices into the arena so that
//! derived structures (gates, graphs) never hold pointers into the tree.
//! Point mutations return the sets of removed and created leaves which the
//! owner uses to reconcile that derived state
//!

use super::{grid::Rectangle, StepFunction};

/// Stable arena index of a quadtree node
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct NodeId(u32);

impl NodeId {
	fn index(&self) -> usize {
		self.0 as usize
	}
}

/// A node of the quadtree covering a rectangle of cells
#[derive(Clone)]
struct QuadNode {
	/// Region of the grid covered by this node
	rect: Rectangle,
	/// Parent node, [None] for the root
	parent: Option<NodeId>,
	/// Child nodes, populated when the node has been split
	children: [Option<NodeId>; 4],
	/// Whether this node is currently a leaf of the tree
	is_leaf: bool,
	/// Number of blocking cells within `rect`
	blocked: i32,
}

/// Controls how large a leaf free of blocking cells is allowed to grow.
///
/// Bigger leaves mean fewer nodes but more gate cells per crossing, smaller
/// leaves the reverse. Any field `<= 0` disables that bound. When `stepf` is
/// set it overrides `step`, computing the permitted size from the dimensions
/// of the node under consideration; it must be monotonic so that a node
/// permitted at some size is also permitted at every smaller size
#[derive(Clone, Default)]
pub struct LeafSizePolicy {
	/// Fixed permitted leaf side length
	step: i32,
	/// Scale-dependent permitted leaf side length, overrides `step`
	stepf: Option<StepFunction>,
	/// Hard cap on leaf width
	max_node_width: i32,
	/// Hard cap on leaf height
	max_node_height: i32,
}

impl LeafSizePolicy {
	/// Create a new instance of [LeafSizePolicy]
	pub fn new(
		step: i32,
		stepf: Option<StepFunction>,
		max_node_width: i32,
		max_node_height: i32,
	) -> Self {
		LeafSizePolicy {
			step,
			stepf,
			max_node_width,
			max_node_height,
		}
	}
	/// Whether a node of `width` columns and `height` rows is permitted to be
	/// a leaf
	pub fn fits(&self, width: i32, height: i32) -> bool {
		let step = match &self.stepf {
			Some(f) => (**f)(width, height),
			None => self.step,
		};
		let mut allowed_width = i32::MAX;
		let mut allowed_height = i32::MAX;
		if self.max_node_width > 0 {
			allowed_width = self.max_node_width;
		}
		if self.max_node_height > 0 {
			allowed_height = self.max_node_height;
		}
		if step > 0 {
			allowed_width = allowed_width.min(step);
			allowed_height = allowed_height.min(step);
		}
		width <= allowed_width && height <= allowed_height
	}
}

/// Leaves affected by a point mutation of the tree
#[derive(Default, Debug)]
pub struct LeafChanges {
	/// Leaves that no longer exist (either deleted or turned into internal nodes)
	pub removed: Vec<NodeId>,
	/// Leaves that were created or whose content changed
	pub created: Vec<NodeId>,
}

/// A region quadtree over a `height x width` grid of cells
pub struct Quadtree {
	/// Number of columns in the grid
	width: i32,
	/// Number of rows in the grid
	height: i32,
	/// Permitted leaf sizes
	policy: LeafSizePolicy,
	/// Arena of nodes
	nodes: Vec<QuadNode>,
	/// Recycled arena slots
	free: Vec<u32>,
	/// Root node of the tree
	root: Option<NodeId>,
}

impl Quadtree {
	/// Create a new instance of [Quadtree]. Panics if either dimension is
	/// smaller than a single cell
	pub fn new(width: i32, height: i32, policy: LeafSizePolicy) -> Self {
		if width < 1 || height < 1 {
			panic!(
				"Quadtree dimensions `({}, {})` must cover at least one cell",
				width, height
			);
		}
		Quadtree {
			width,
			height,
			policy,
			nodes: Vec::new(),
			free: Vec::new(),
			root: None,
		}
	}
	/// Get the number of columns covered
	pub fn get_width(&self) -> i32 {
		self.width
	}
	/// Get the number of rows covered
	pub fn get_height(&self) -> i32 {
		self.height
	}
	/// Get the rectangle covered by a node
	pub fn get_rect(&self, id: NodeId) -> Rectangle {
		self.nodes[id.index()].rect
	}
	/// Get the number of blocking cells within a node
	pub fn get_blocked_count(&self, id: NodeId) -> i32 {
		self.nodes[id.index()].blocked
	}
	/// Whether the cell `(x, y)` is a blocking cell. By the leaf invariant a
	/// blocking cell is always its own single-cell leaf
	pub fn is_blocked_cell(&self, x: i32, y: i32) -> bool {
		match self.find_leaf(x, y) {
			Some(id) => self.nodes[id.index()].blocked > 0,
			None => false,
		}
	}
	/// Rebuild the tree from scratch, classifying every cell through the
	/// `is_blocked` oracle
	pub fn build(&mut self, is_blocked: &dyn Fn(i32, i32) -> bool) {
		self.nodes.clear();
		self.free.clear();
		// prefix sums of blocking cells so any rectangle can be counted in
		// constant time during the recursive construction
		let w = self.width as usize;
		let h = self.height as usize;
		let mut prefix = vec![0i32; (w + 1) * (h + 1)];
		for x in 0..h {
			for y in 0..w {
				let blocked = if is_blocked(x as i32, y as i32) { 1 } else { 0 };
				prefix[(x + 1) * (w + 1) + (y + 1)] = blocked
					+ prefix[x * (w + 1) + (y + 1)]
					+ prefix[(x + 1) * (w + 1) + y]
					- prefix[x * (w + 1) + y];
			}
		}
		let full = Rectangle::new(0, 0, self.height - 1, self.width - 1);
		let root = self.build_node(full, None, &prefix);
		self.root = Some(root);
	}
	/// Count blocking cells of `rect` from the build-time prefix sums
	fn count_in(&self, rect: &Rectangle, prefix: &[i32]) -> i32 {
		let w = self.width as usize + 1;
		let (x1, y1) = (rect.x1 as usize, rect.y1 as usize);
		let (x2, y2) = (rect.x2 as usize + 1, rect.y2 as usize + 1);
		prefix[x2 * w + y2] - prefix[x1 * w + y2] - prefix[x2 * w + y1] + prefix[x1 * w + y1]
	}
	/// Recursively create the node covering `rect` and split it until the
	/// leaf invariant and the size policy hold
	fn build_node(&mut self, rect: Rectangle, parent: Option<NodeId>, prefix: &[i32]) -> NodeId {
		let blocked = self.count_in(&rect, prefix);
		let id = self.alloc(QuadNode {
			rect,
			parent,
			children: [None; 4],
			is_leaf: true,
			blocked,
		});
		if self.needs_split(&rect, blocked) {
			self.nodes[id.index()].is_leaf = false;
			let mut children = [None; 4];
			for (i, quadrant) in quadrants(&rect).into_iter().enumerate() {
				children[i] = Some(self.build_node(quadrant, Some(id), prefix));
			}
			self.nodes[id.index()].children = children;
		}
		id
	}
	/// A node must split while it mixes blocking and free cells or while it
	/// exceeds the permitted leaf size
	fn needs_split(&self, rect: &Rectangle, blocked: i32) -> bool {
		let single_cell = rect.width() == 1 && rect.height() == 1;
		if single_cell {
			return false;
		}
		if blocked > 0 {
			return true;
		}
		!self.policy.fits(rect.width(), rect.height())
	}
	/// Allocate an arena slot, reusing a freed one when available
	fn alloc(&mut self, node: QuadNode) -> NodeId {
		match self.free.pop() {
			Some(slot) => {
				self.nodes[slot as usize] = node;
				NodeId(slot)
			}
			None => {
				self.nodes.push(node);
				NodeId(self.nodes.len() as u32 - 1)
			}
		}
	}
	/// Find the leaf containing the cell `(x, y)`, [None] when out of bounds
	pub fn find_leaf(&self, x: i32, y: i32) -> Option<NodeId> {
		if x < 0 || x >= self.height || y < 0 || y >= self.width {
			return None;
		}
		let mut current = self.root?;
		loop {
			let node = &self.nodes[current.index()];
			if node.is_leaf {
				return Some(current);
			}
			let mut next = None;
			for child in node.children.iter().flatten() {
				if self.nodes[child.index()].rect.contains(x, y) {
					next = Some(*child);
					break;
				}
			}
			current = next?;
		}
	}
	/// Visit every leaf overlapping `range`
	pub fn leaves_in_range<F: FnMut(NodeId)>(&self, range: &Rectangle, mut visitor: F) {
		let Some(root) = self.root else {
			return;
		};
		let mut stack = vec![root];
		while let Some(id) = stack.pop() {
			let node = &self.nodes[id.index()];
			if node.rect.overlap(range).is_none() {
				continue;
			}
			if node.is_leaf {
				visitor(id);
			} else {
				for child in node.children.iter().flatten() {
					stack.push(*child);
				}
			}
		}
	}
	/// Visit every leaf of the tree
	pub fn for_each_leaf<F: FnMut(NodeId)>(&self, mut visitor: F) {
		let Some(root) = self.root else {
			return;
		};
		let mut stack = vec![root];
		while let Some(id) = stack.pop() {
			let node = &self.nodes[id.index()];
			if node.is_leaf {
				visitor(id);
			} else {
				for child in node.children.iter().flatten() {
					stack.push(*child);
				}
			}
		}
	}
	/// Mark the cell `(x, y)` as blocking. The containing leaf is split until
	/// the leaf invariant holds again. The cell must currently be free
	pub fn add_blocked(&mut self, x: i32, y: i32) -> LeafChanges {
		let mut changes = LeafChanges::default();
		let Some(leaf) = self.find_leaf(x, y) else {
			return changes;
		};
		// bump the blocking count along the path from the root
		self.adjust_counts(leaf, 1);
		let rect = self.nodes[leaf.index()].rect;
		if rect.width() == 1 && rect.height() == 1 {
			// the leaf is the blocked cell itself, no structural change
			changes.created.push(leaf);
			return changes;
		}
		changes.removed.push(leaf);
		self.split_for_add(leaf, x, y, &mut changes.created);
		changes
	}
	/// Split a former leaf containing exactly one blocking cell at `(x, y)`
	fn split_for_add(&mut self, id: NodeId, x: i32, y: i32, created: &mut Vec<NodeId>) {
		let rect = self.nodes[id.index()].rect;
		let blocked = self.nodes[id.index()].blocked;
		if !self.needs_split(&rect, blocked) {
			self.nodes[id.index()].is_leaf = true;
			created.push(id);
			return;
		}
		self.nodes[id.index()].is_leaf = false;
		let mut children = [None; 4];
		for (i, quadrant) in quadrants(&rect).into_iter().enumerate() {
			let child_blocked = if quadrant.contains(x, y) { 1 } else { 0 };
			let child = self.alloc(QuadNode {
				rect: quadrant,
				parent: Some(id),
				children: [None; 4],
				is_leaf: true,
				blocked: child_blocked,
			});
			children[i] = Some(child);
			self.split_for_add(child, x, y, created);
		}
		self.nodes[id.index()].children = children;
	}
	/// Mark the blocking cell `(x, y)` as free again, merging the largest
	/// fully-free ancestor permitted by the size policy back into a single
	/// leaf. The cell must currently be blocking
	pub fn clear_blocked(&mut self, x: i32, y: i32) -> LeafChanges {
		let mut changes = LeafChanges::default();
		let Some(leaf) = self.find_leaf(x, y) else {
			return changes;
		};
		self.adjust_counts(leaf, -1);
		// climb to the highest ancestor that is now free of blocking cells
		// and whose size the policy permits as a leaf, mirroring what a fresh
		// build of the same grid would produce
		let mut best = leaf;
		let mut cursor = self.nodes[leaf.index()].parent;
		while let Some(parent) = cursor {
			let node = &self.nodes[parent.index()];
			if node.blocked == 0 && self.policy.fits(node.rect.width(), node.rect.height()) {
				best = parent;
				cursor = node.parent;
			} else {
				break;
			}
		}
		if best == leaf {
			changes.created.push(leaf);
			return changes;
		}
		// delete the subtree under the merge target, recording its leaves
		let mut stack: Vec<NodeId> = self.nodes[best.index()].children.iter().flatten().copied().collect();
		while let Some(id) = stack.pop() {
			let node = self.nodes[id.index()].clone();
			if node.is_leaf {
				changes.removed.push(id);
			} else {
				for child in node.children.iter().flatten() {
					stack.push(*child);
				}
			}
			self.free.push(id.0);
		}
		let target = &mut self.nodes[best.index()];
		target.children = [None; 4];
		target.is_leaf = true;
		changes.created.push(best);
		changes
	}
	/// Adjust blocking counts along the path from the root to `leaf`
	fn adjust_counts(&mut self, leaf: NodeId, amount: i32) {
		let mut cursor = Some(leaf);
		while let Some(id) = cursor {
			self.nodes[id.index()].blocked += amount;
			cursor = self.nodes[id.index()].parent;
		}
	}
}

/// The up-to-4 sub-rectangles a node splits into. Degenerate single-row or
/// single-column nodes produce only two
fn quadrants(rect: &Rectangle) -> Vec<Rectangle> {
	let xm = (rect.x1 + rect.x2) / 2;
	let ym = (rect.y1 + rect.y2) / 2;
	let mut result = Vec::with_capacity(4);
	let candidates = [
		Rectangle::new(rect.x1, rect.y1, xm, ym),
		Rectangle::new(rect.x1, ym + 1, xm, rect.y2),
		Rectangle::new(xm + 1, rect.y1, rect.x2, ym),
		Rectangle::new(xm + 1, ym + 1, rect.x2, rect.y2),
	];
	for candidate in candidates {
		if candidate.is_valid() {
			result.push(candidate);
		}
	}
	result
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Collect `(rect, blocked)` of every leaf for comparisons
	fn leaves(tree: &Quadtree) -> Vec<(Rectangle, i32)> {
		let mut result = Vec::new();
		tree.for_each_leaf(|id| result.push((tree.get_rect(id), tree.get_blocked_count(id))));
		result.sort();
		result
	}
	#[test]
	fn empty_grid_is_single_leaf() {
		let mut tree = Quadtree::new(8, 8, LeafSizePolicy::default());
		tree.build(&|_, _| false);
		let result = leaves(&tree);
		let actual = vec![(Rectangle::new(0, 0, 7, 7), 0)];
		assert_eq!(actual, result);
	}
	#[test]
	fn blocked_cell_becomes_single_cell_leaf() {
		//  _____________
		// |__|__|__|__|
		// |__|x_|__|__|
		// |__|__|__|__|
		// |__|__|__|__|
		let mut tree = Quadtree::new(4, 4, LeafSizePolicy::default());
		tree.build(&|x, y| x == 1 && y == 1);
		let leaf = tree.find_leaf(1, 1).unwrap();
		assert_eq!(Rectangle::new(1, 1, 1, 1), tree.get_rect(leaf));
		assert!(tree.is_blocked_cell(1, 1));
		assert!(!tree.is_blocked_cell(0, 0));
	}
	#[test]
	fn every_leaf_upholds_the_invariant() {
		let walls = [(2, 0), (2, 1), (2, 2), (2, 3), (5, 5)];
		let mut tree = Quadtree::new(8, 8, LeafSizePolicy::default());
		tree.build(&|x, y| walls.contains(&(x, y)));
		let mut checked = 0;
		tree.for_each_leaf(|id| {
			let rect = tree.get_rect(id);
			let blocked = tree.get_blocked_count(id);
			let single_cell = rect.width() == 1 && rect.height() == 1;
			assert!(blocked == 0 || (blocked == 1 && single_cell));
			checked += 1;
		});
		assert!(checked > 1);
	}
	#[test]
	fn step_limits_leaf_size() {
		let mut tree = Quadtree::new(8, 8, LeafSizePolicy::new(4, None, -1, -1));
		tree.build(&|_, _| false);
		tree.for_each_leaf(|id| {
			let rect = tree.get_rect(id);
			assert!(rect.width() <= 4 && rect.height() <= 4);
		});
	}
	#[test]
	fn add_then_clear_restores_the_tree() {
		let mut tree = Quadtree::new(8, 8, LeafSizePolicy::default());
		tree.build(&|_, _| false);
		let before = leaves(&tree);
		let added = tree.add_blocked(3, 4);
		assert!(!added.created.is_empty());
		assert!(tree.is_blocked_cell(3, 4));
		let cleared = tree.clear_blocked(3, 4);
		assert!(!cleared.removed.is_empty());
		let result = leaves(&tree);
		assert_eq!(before, result);
	}
	#[test]
	fn mutation_matches_fresh_build() {
		let mut incremental = Quadtree::new(8, 8, LeafSizePolicy::default());
		incremental.build(&|_, _| false);
		incremental.add_blocked(1, 6);
		incremental.add_blocked(6, 2);
		incremental.clear_blocked(1, 6);
		let mut fresh = Quadtree::new(8, 8, LeafSizePolicy::default());
		fresh.build(&|x, y| x == 6 && y == 2);
		assert_eq!(leaves(&fresh), leaves(&incremental));
	}
	#[test]
	fn leaves_in_range_skips_distant_nodes() {
		let mut tree = Quadtree::new(8, 8, LeafSizePolicy::new(2, None, -1, -1));
		tree.build(&|_, _| false);
		let mut visited = Vec::new();
		tree.leaves_in_range(&Rectangle::new(0, 0, 1, 1), |id| visited.push(id));
		assert_eq!(1, visited.len());
		assert_eq!(Rectangle::new(0, 0, 1, 1), tree.get_rect(visited[0]));
	}
}
