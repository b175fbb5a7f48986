//! The ClearanceField records, for every cell, the side length of the largest
//! obstacle-free square anchored at that cell and extending towards +x/+y.
//! An agent of size `s` can stand at `(x, y)` only when the clearance there
//! is at least `s`.
//!
//! Values are capped at a bound (the largest agent size the field serves)
//! which keeps incremental updates local: a terrain change at `(x, y)` can
//! only influence cells within `bound - 1` rows/columns up-left of it.
//!
//! With a bound of 3 and a single obstacle the field looks like:
//!
//! ```text
//!  ________________________
//! |  3 |  3 |  3 |  3 |  3 |
//! |____|____|____|____|____|
//! |  3 |  2 |  2 |  3 |  3 |
//! |____|____|____|____|____|
//! |  3 |  2 |  1 |  3 |  3 |
//! |____|____|____|____|____|
//! |  3 |  1 |  x |  3 |  3 |
//! |____|____|____|____|____|
//! |  3 |  3 |  3 |  3 |  3 |
//! |____|____|____|____|____|
//! ```
//!

/// Largest obstacle-free anchored square per cell, capped at a bound
pub struct ClearanceField {
	/// Number of columns
	width: i32,
	/// Number of rows
	height: i32,
	/// Cap on clearance values, propagation distance of updates
	bound: i32,
	/// Whether each cell is currently an obstacle
	blocked: Vec<bool>,
	/// Clearance value per cell
	values: Vec<i32>,
}

impl ClearanceField {
	/// Create a new instance of [ClearanceField]. `bound` is the largest
	/// agent size the field needs to distinguish
	pub fn new(width: i32, height: i32, bound: i32) -> Self {
		let size = (width * height) as usize;
		ClearanceField {
			width,
			height,
			bound: bound.max(1),
			blocked: vec![false; size],
			values: vec![0; size],
		}
	}
	fn index(&self, x: i32, y: i32) -> usize {
		(x * self.width + y) as usize
	}
	/// Get the clearance value of the cell `(x, y)`
	pub fn get(&self, x: i32, y: i32) -> i32 {
		self.values[self.index(x, y)]
	}
	/// Classify every cell through `is_blocked` and compute the field
	pub fn build(&mut self, is_blocked: &dyn Fn(i32, i32) -> bool) {
		for x in 0..self.height {
			for y in 0..self.width {
				let i = self.index(x, y);
				self.blocked[i] = is_blocked(x, y);
			}
		}
		for x in (0..self.height).rev() {
			for y in (0..self.width).rev() {
				let value = self.compute_cell(x, y);
				let i = self.index(x, y);
				self.values[i] = value;
			}
		}
	}
	/// Clearance of one cell from its already-correct down-right neighbours
	fn compute_cell(&self, x: i32, y: i32) -> i32 {
		if self.blocked[self.index(x, y)] {
			return 0;
		}
		let down = if x + 1 < self.height {
			self.values[self.index(x + 1, y)]
		} else {
			0
		};
		let right = if y + 1 < self.width {
			self.values[self.index(x, y + 1)]
		} else {
			0
		};
		let diagonal = if x + 1 < self.height && y + 1 < self.width {
			self.values[self.index(x + 1, y + 1)]
		} else {
			0
		};
		(1 + down.min(right).min(diagonal)).min(self.bound)
	}
	/// Record that the obstacle status of `(x, y)` changed and rework the
	/// window of cells whose clearance may depend on it. Returns every cell
	/// whose value actually changed, the caller forwards those to interested
	/// consumers
	pub fn update(&mut self, x: i32, y: i32, blocked_now: bool) -> Vec<(i32, i32)> {
		let i = self.index(x, y);
		let mut changed = Vec::new();
		if self.blocked[i] == blocked_now {
			return changed;
		}
		self.blocked[i] = blocked_now;
		// only cells whose anchored square could contain (x, y) can change,
		// the cap bounds that square to the window below
		let x_from = (x - self.bound + 1).max(0);
		let y_from = (y - self.bound + 1).max(0);
		for cx in (x_from..=x).rev() {
			for cy in (y_from..=y).rev() {
				let value = self.compute_cell(cx, cy);
				let index = self.index(cx, cy);
				if self.values[index] != value {
					self.values[index] = value;
					changed.push((cx, cy));
				}
			}
		}
		changed
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn open_field_values() {
		let mut field = ClearanceField::new(4, 4, 8);
		field.build(&|_, _| false);
		let result = field.get(0, 0);
		let actual = 4;
		assert_eq!(actual, result);
		assert_eq!(1, field.get(3, 3));
		assert_eq!(2, field.get(2, 1));
	}
	#[test]
	fn values_capped_at_bound() {
		let mut field = ClearanceField::new(10, 10, 3);
		field.build(&|_, _| false);
		let result = field.get(0, 0);
		let actual = 3;
		assert_eq!(actual, result);
	}
	#[test]
	fn obstacle_shrinks_up_left_neighbours() {
		//  _____________
		// |__|__|__|__|
		// |__|__|__|__|
		// |__|__|x_|__|
		// |__|__|__|__|
		let mut field = ClearanceField::new(4, 4, 8);
		field.build(&|x, y| x == 2 && y == 2);
		assert_eq!(0, field.get(2, 2));
		assert_eq!(2, field.get(0, 0));
		assert_eq!(1, field.get(1, 1));
		// the right-most column can never anchor more than a 1-square
		assert_eq!(1, field.get(0, 3));
	}
	#[test]
	fn update_matches_rebuild() {
		let mut incremental = ClearanceField::new(6, 6, 4);
		incremental.build(&|_, _| false);
		let changed = incremental.update(3, 3, true);
		assert!(changed.contains(&(3, 3)));
		let mut fresh = ClearanceField::new(6, 6, 4);
		fresh.build(&|x, y| x == 3 && y == 3);
		for x in 0..6 {
			for y in 0..6 {
				assert_eq!(fresh.get(x, y), incremental.get(x, y));
			}
		}
	}
	#[test]
	fn update_reports_only_changes() {
		let mut field = ClearanceField::new(6, 6, 2);
		field.build(&|_, _| false);
		let changed = field.update(5, 5, true);
		// with a bound of 2 only the 2x2 window can be touched
		for (x, y) in changed.iter() {
			assert!(*x >= 4 && *y >= 4);
		}
		let reverted = field.update(5, 5, false);
		assert!(reverted.contains(&(5, 5)));
	}
}
