//! Retained scene: one glyph per node and per edge, repositioned every tick.
//!
//! Glyphs are stored in the same order as the snapshot they were built from,
//! so node `i` of the simulation always owns `nodes[i]` here. Nothing is ever
//! searched for by kind. A refresh builds a whole new scene rather than
//! reconciling against the old one.

use log::debug;

use super::adapter::GraphSnapshot;
use super::simulation::Simulation;
use super::theme::{Color, OrdinalPalette};
use super::viewport::Viewport;

/// Circle and identifier label of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeGlyph {
	pub id: String,
	pub fill: Color,
	pub placeholder: bool,
	/// Circle center in canvas coordinates.
	pub center: (f64, f64),
	pub radius: f64,
	/// Baseline origin of the label text.
	pub label_at: (f64, f64),
}

/// Line and type label of one edge.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeGlyph {
	/// Relationship type shown at the midpoint.
	pub label: String,
	pub source: usize,
	pub target: usize,
	pub from: (f64, f64),
	pub to: (f64, f64),
	pub label_at: (f64, f64),
}

/// Everything drawn for one snapshot.
#[derive(Clone, Debug)]
pub struct Scene {
	generation: u64,
	viewport: Viewport,
	label_offset: (f64, f64),
	pub nodes: Vec<NodeGlyph>,
	pub edges: Vec<EdgeGlyph>,
}

impl Scene {
	/// Create glyphs for every node and edge of `snapshot`.
	///
	/// Colors come from `palette` so an identifier keeps its color across
	/// rebuilds.
	pub fn build(
		snapshot: &GraphSnapshot,
		palette: &mut OrdinalPalette,
		viewport: Viewport,
		label_offset: (f64, f64),
		generation: u64,
	) -> Self {
		let nodes = snapshot
			.nodes
			.iter()
			.map(|node| NodeGlyph {
				id: node.id.clone(),
				fill: palette.color_for(&node.id),
				placeholder: node.placeholder,
				center: (0.0, 0.0),
				radius: viewport.radius,
				label_at: (0.0, 0.0),
			})
			.collect();
		let edges = snapshot
			.edges
			.iter()
			.map(|edge| EdgeGlyph {
				label: edge.kind.clone(),
				source: edge.source,
				target: edge.target,
				from: (0.0, 0.0),
				to: (0.0, 0.0),
				label_at: (0.0, 0.0),
			})
			.collect();

		let mut scene = Self {
			generation,
			viewport,
			label_offset,
			nodes,
			edges,
		};
		scene.place(snapshot.nodes.iter().map(|n| (n.x, n.y)));
		scene
	}

	/// Move every glyph to the simulation's current positions.
	///
	/// Refuses, and returns `false`, when the simulation belongs to a
	/// different generation or its shape does not match this scene.
	pub fn update(&mut self, simulation: &Simulation, generation: u64) -> bool {
		if generation != self.generation || simulation.nodes().len() != self.nodes.len() {
			debug!(
				"graph-live: ignoring tick of generation {generation} for scene {}",
				self.generation
			);
			return false;
		}
		self.place(simulation.nodes().iter().map(|n| (n.x, n.y)));
		true
	}

	fn place(&mut self, positions: impl Iterator<Item = (f64, f64)>) {
		let raw: Vec<(f64, f64)> = positions.collect();
		let (dx, dy) = self.label_offset;
		for (glyph, &(x, y)) in self.nodes.iter_mut().zip(&raw) {
			let (cx, cy) = self.viewport.project(x, y);
			glyph.center = (cx, cy);
			glyph.label_at = (cx + dx, cy + dy);
		}
		for glyph in &mut self.edges {
			let (Some(&a), Some(&b)) = (raw.get(glyph.source), raw.get(glyph.target)) else {
				continue;
			};
			glyph.from = self.viewport.project(a.0, a.1);
			glyph.to = self.viewport.project(b.0, b.1);
			glyph.label_at = self.viewport.midpoint(a, b);
		}
	}

	/// Index of the topmost node whose circle contains `(x, y)`.
	pub fn node_at(&self, x: f64, y: f64) -> Option<usize> {
		self.nodes.iter().rposition(|glyph| {
			let (dx, dy) = (glyph.center.0 - x, glyph.center.1 - y);
			dx * dx + dy * dy <= glyph.radius * glyph.radius
		})
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}
}
