//! Mapping of simulated coordinates into the drawable rectangle.
//!
//! The simulation is unbounded; only what gets drawn is clamped. Nothing in
//! here feeds back into the physics.

use log::warn;

use crate::config::ViewportConfig;

/// Clamp one coordinate into `[radius + padding, dimension - radius - padding]`.
///
/// `NaN` (an unplaced node) maps to the lower bound. Infinite values clamp to
/// the nearest bound. If the dimension is too small for both margins the
/// lower bound wins.
pub fn clamp(value: f64, dimension: f64, radius: f64, padding: f64) -> f64 {
	let low = radius + padding;
	if value.is_nan() {
		return low;
	}
	value.min(dimension - radius - padding).max(low)
}

/// The drawable surface and the margins kept clear around its border.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
	/// Visual node radius.
	pub radius: f64,
	/// Extra clearance for edges and labels.
	pub padding: f64,
}

impl Viewport {
	/// Build a viewport from a measured container size.
	///
	/// A missing, zero or non-finite measurement falls back to the configured
	/// default for that axis.
	pub fn from_container(width: Option<f64>, height: Option<f64>, config: &ViewportConfig) -> Self {
		let measured = |value: Option<f64>, fallback: f64, axis: &str| match value {
			Some(v) if v.is_finite() && v > 0.0 => v,
			_ => {
				warn!("graph-live: container {axis} unavailable, using {fallback}");
				fallback
			}
		};
		Self {
			width: measured(width, config.width, "width"),
			height: measured(height, config.height, "height"),
			radius: config.node_radius,
			padding: config.padding,
		}
	}

	pub fn center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}

	pub fn clamp_x(&self, x: f64) -> f64 {
		clamp(x, self.width, self.radius, self.padding)
	}

	pub fn clamp_y(&self, y: f64) -> f64 {
		clamp(y, self.height, self.radius, self.padding)
	}

	/// Clamp a simulated point.
	pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
		(self.clamp_x(x), self.clamp_y(y))
	}

	/// Label anchor for an edge: midpoint of the raw endpoints, then clamped.
	///
	/// Every caller goes through here so labels never drift from their line.
	pub fn midpoint(&self, (x1, y1): (f64, f64), (x2, y2): (f64, f64)) -> (f64, f64) {
		self.project((x1 + x2) / 2.0, (y1 + y2) / 2.0)
	}
}

impl Default for Viewport {
	fn default() -> Self {
		let config = ViewportConfig::default();
		Self {
			width: config.width,
			height: config.height,
			radius: config.node_radius,
			padding: config.padding,
		}
	}
}
