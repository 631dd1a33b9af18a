//! Uniform spatial grid for bounded-range pair queries.
//!
//! Forces that only act within a fixed distance bucket the nodes by that
//! distance, then only compare nodes in the same or adjacent cells. Cells are
//! kept in a `BTreeMap` so pair order, and with it the floating point sums,
//! is reproducible for a given input.

use std::collections::BTreeMap;

/// Neighbour offsets visited from each cell. Together with the cell itself
/// these cover every adjacent cell pair exactly once.
const FORWARD: [(i64, i64); 4] = [(1, -1), (1, 0), (1, 1), (0, 1)];

pub(super) struct NeighborGrid {
	cells: BTreeMap<(i64, i64), Vec<usize>>,
}

impl NeighborGrid {
	/// Bucket `points` into square cells of side `cell`.
	pub(super) fn build(points: impl IntoIterator<Item = (f64, f64)>, cell: f64) -> Self {
		let cell = if cell.is_finite() && cell > 0.0 { cell } else { 1.0 };
		let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
		for (index, (x, y)) in points.into_iter().enumerate() {
			// `as` saturates, and maps NaN to 0.
			let key = ((x / cell).floor() as i64, (y / cell).floor() as i64);
			cells.entry(key).or_default().push(index);
		}
		Self { cells }
	}

	/// Call `f(i, j)` once for every unordered pair of points in the same or
	/// adjacent cells, with `i < j`.
	pub(super) fn for_each_pair(&self, mut f: impl FnMut(usize, usize)) {
		for (&(cx, cy), members) in &self.cells {
			for (a, &i) in members.iter().enumerate() {
				for &j in &members[a + 1..] {
					f(i.min(j), i.max(j));
				}
			}
			for (dx, dy) in FORWARD {
				let Some(others) = self.cells.get(&(cx.saturating_add(dx), cy.saturating_add(dy)))
				else {
					continue;
				};
				for &i in members {
					for &j in others {
						f(i.min(j), i.max(j));
					}
				}
			}
		}
	}
}
