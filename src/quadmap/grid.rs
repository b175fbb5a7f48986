//! Primitive cell and rectangle tools shared by the quadtree, the gate
//! machinery and the pathfinders
//!

use std::sync::Arc;

use bevy::reflect::Reflect;

use super::DistanceCalculator;

/// Sentinel cost for an unreachable vertex, large enough that summing a pair
/// of costs cannot overflow an `i32`
pub const INF: i32 = 0x3f3f3f3f;

/// An axis-aligned rectangle of cells with inclusive bounds, `x` addressing
/// rows and `y` addressing columns
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct Rectangle {
	/// First row of the rectangle
	pub x1: i32,
	/// First column of the rectangle
	pub y1: i32,
	/// Last row of the rectangle
	pub x2: i32,
	/// Last column of the rectangle
	pub y2: i32,
}

impl Rectangle {
	/// Create a new instance of [Rectangle]
	pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
		Rectangle { x1, y1, x2, y2 }
	}
	/// A rectangle is valid when neither pair of bounds is inverted
	pub fn is_valid(&self) -> bool {
		self.x1 <= self.x2 && self.y1 <= self.y2
	}
	/// Number of columns spanned
	pub fn width(&self) -> i32 {
		self.y2 - self.y1 + 1
	}
	/// Number of rows spanned
	pub fn height(&self) -> i32 {
		self.x2 - self.x1 + 1
	}
	/// Whether the cell `(x, y)` sits within the rectangle
	pub fn contains(&self, x: i32, y: i32) -> bool {
		x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
	}
	/// A new rectangle grown by `amount` cells in every direction
	pub fn expand(&self, amount: i32) -> Rectangle {
		Rectangle::new(
			self.x1 - amount,
			self.y1 - amount,
			self.x2 + amount,
			self.y2 + amount,
		)
	}
	/// Compute the intersection of two rectangles, [None] when they do not
	/// overlap
	pub fn overlap(&self, other: &Rectangle) -> Option<Rectangle> {
		let result = Rectangle::new(
			self.x1.max(other.x1),
			self.y1.max(other.y1),
			self.x2.min(other.x2),
			self.y2.min(other.y2),
		);
		if result.is_valid() {
			Some(result)
		} else {
			None
		}
	}
}

/// Emit the cells along a straight line from `(x1, y1)` to `(x2, y2)`
/// inclusive of both endpoints. When `stop_after` is set emission is truncated
/// after that many cells
pub fn compute_straight_line<F: FnMut(i32, i32)>(
	x1: i32,
	y1: i32,
	x2: i32,
	y2: i32,
	mut collector: F,
	stop_after: Option<usize>,
) {
	let dx = (x2 - x1).abs();
	let dy = (y2 - y1).abs();
	let sx = if x1 < x2 { 1 } else { -1 };
	let sy = if y1 < y2 { 1 } else { -1 };
	let mut err = dx - dy;
	let (mut x, mut y) = (x1, y1);
	let mut emitted = 0;
	loop {
		collector(x, y);
		emitted += 1;
		if let Some(limit) = stop_after {
			if emitted >= limit {
				break;
			}
		}
		if x == x2 && y == y2 {
			break;
		}
		let e2 = 2 * err;
		if e2 > -dy {
			err -= dy;
			x += sx;
		}
		if e2 < dx {
			err += dx;
			y += sy;
		}
	}
}

/// Straight-line distance scaled by `unit` and floored to an integer
pub fn euclidean_distance(unit: i32) -> DistanceCalculator {
	Arc::new(move |x1, y1, x2, y2| {
		let dx = (x2 - x1) as f64;
		let dy = (y2 - y1) as f64;
		(dx.hypot(dy) * unit as f64).floor() as i32
	})
}

/// Chessboard distance, `unit` per step where a diagonal step costs the same
/// as an axial one
pub fn chebyshev_distance(unit: i32) -> DistanceCalculator {
	Arc::new(move |x1, y1, x2, y2| {
		let dx = (x2 - x1).abs();
		let dy = (y2 - y1).abs();
		unit * dx.max(dy)
	})
}

/// Grid walking distance where an axial step costs `unit` and a diagonal step
/// costs `unit * sqrt(2)`, i.e the exact cost of the cheapest 8-direction
/// walk between the cells
pub fn octile_distance(unit: i32) -> DistanceCalculator {
	Arc::new(move |x1, y1, x2, y2| {
		let dx = (x2 - x1).abs();
		let dy = (y2 - y1).abs();
		let diagonal = dx.min(dy);
		unit * dx.max(dy) + (unit * 414 / 1000) * diagonal
	})
}
