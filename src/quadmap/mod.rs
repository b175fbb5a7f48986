//! Quadtree maps are a means of answering pathfinding queries over very large
//! grids without walking every cell.
//!
//! A map is recursively partitioned into rectangular leaves where each leaf is
//! either entirely walkable or a single blocked cell. Walkable leaves are
//! stitched together by Gates, pairs of adjacent cells crossing from one leaf
//! into another:
//!
//! ```text
//!  _________________________
//! |            |            |
//! |            G G          |
//! |   leaf a   |   leaf b   |
//! |            |            |
//! |____________|______ _____|
//! |      |x|         |      |
//! |______|_|_________|______|
//! ```
//!
//! Two abstract graphs are maintained over the decomposition: the node graph
//! (vertices are leaves) and the gate graph (vertices are gate cells, with
//! straight-line edges inside a leaf and crossing edges between leaves).
//! Pathfinding queries refine an answer down the layers: leaf route, then
//! gate route, then individual cells.
//!
//! Definitions:
//!
//! * Leaf - a rectangular region of the grid, entirely walkable or one blocked cell
//! * Gate - a directed pair of adjacent walkable cells crossing between two leaves
//! * Gate cell - a cell appearing as an endpoint of any gate
//! * Flow field - a mapping of vertex to `(next, cost)` guiding movement towards a target
//!

use std::sync::Arc;

pub mod bank;
pub mod clearance;
pub mod graph;
pub mod grid;
pub mod map;
pub mod pathfinder;
pub mod quadtree;

/// Computes the distance between a pair of cells `(x1, y1)` and `(x2, y2)`.
///
/// Any metric may be supplied provided it is non-negative, zero for identical
/// cells and satisfies the triangle inequality. Built-in constructors live in
/// [grid::euclidean_distance], [grid::chebyshev_distance] and
/// [grid::octile_distance]
pub type DistanceCalculator = Arc<dyn Fn(i32, i32, i32, i32) -> i32 + Send + Sync>;

/// Reports the terrain bitmask value of a cell. A value of `0` denotes an
/// obstacle for every kind of agent, any other value uses at most 8 bit
/// positions to describe the kind of terrain occupying the cell
pub type TerrainTypesChecker = Arc<dyn Fn(i32, i32) -> u8 + Send + Sync>;

/// From the width and height of a quadtree node computes the permitted leaf
/// size at that scale, allowing a host to trade node count against gate count
pub type StepFunction = Arc<dyn Fn(i32, i32) -> i32 + Send + Sync>;
