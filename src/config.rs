//! Runtime configuration.
//!
//! Read once at startup from an optional inline JSON element:
//!
//! ```html
//! <script id="graph-config" type="application/json">
//!   { "data_url": "/graph-data", "simulation": { "link_distance": 120 } }
//! </script>
//! ```
//!
//! Every field has a default, so partial documents are fine.

use serde::Deserialize;

/// Top-level application configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
	/// Endpoint returning `{ nodes, links }`.
	pub data_url: String,
	/// WebSocket endpoint of the change notification channel.
	pub socket_url: String,
	/// Event name that triggers a refetch.
	pub update_event: String,
	/// Seed for initial placement. Random per page load when absent.
	pub seed: Option<u64>,
	/// Name of the visual theme (`light` or `midnight`).
	pub theme: String,
	pub simulation: SimulationConfig,
	pub viewport: ViewportConfig,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			data_url: "http://localhost:3000/graph-data".to_string(),
			socket_url: "ws://localhost:3000/socket.io/?EIO=4&transport=websocket".to_string(),
			update_event: "graph-update".to_string(),
			seed: None,
			theme: "light".to_string(),
			simulation: SimulationConfig::default(),
			viewport: ViewportConfig::default(),
		}
	}
}

/// Force and cooling parameters of the layout engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
	/// Many-body strength; negative repels.
	pub charge_strength: f64,
	/// Distances below this are softened to avoid blow-ups.
	pub charge_distance_min: f64,
	/// Pairs further apart than this do not interact.
	pub charge_distance_max: f64,
	/// Rest length of every edge spring.
	pub link_distance: f64,
	/// Collision radius per node (visual radius plus buffer).
	pub collide_radius: f64,
	pub collide_strength: f64,
	/// Fraction of the centroid offset corrected each tick.
	pub center_strength: f64,
	/// Alpha on (re)start.
	pub alpha_max: f64,
	/// Below this alpha the layout counts as settled.
	pub alpha_min: f64,
	pub alpha_decay: f64,
	pub alpha_target: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	/// Half-width of the random offset applied to unplaced nodes.
	pub initial_jitter: f64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		let alpha_min = 0.001_f64;
		Self {
			charge_strength: -300.0,
			charge_distance_min: 1.0,
			charge_distance_max: 1000.0,
			link_distance: 150.0,
			collide_radius: 20.0,
			collide_strength: 1.0,
			center_strength: 1.0,
			alpha_max: 1.0,
			alpha_min,
			// Reaches alpha_min after 300 ticks.
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			alpha_target: 0.0,
			velocity_decay: 0.4,
			initial_jitter: 50.0,
		}
	}
}

/// Drawing surface defaults and margins.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
	/// Used when the container width cannot be measured.
	pub width: f64,
	/// Used when the container height cannot be measured.
	pub height: f64,
	pub node_radius: f64,
	pub padding: f64,
	/// Offset of a node label from its circle center.
	pub label_offset: (f64, f64),
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			width: 900.0,
			height: 700.0,
			node_radius: 10.0,
			padding: 20.0,
			label_offset: (12.0, 5.0),
		}
	}
}

impl GraphConfig {
	/// Parse a configuration document, keeping defaults for absent fields.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}
}
