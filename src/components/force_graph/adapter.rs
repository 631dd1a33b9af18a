//! Conversion of raw link records into the typed graph the simulation runs on.
//!
//! Node identity is the identifier string. Edges refer to nodes by index into
//! the snapshot's node list, so a snapshot owns all of its nodes and the
//! simulation can mutate positions without any shared references.

use std::collections::{HashMap, HashSet};

use log::warn;

use super::types::RawLink;

/// A simulated node.
///
/// Positions are `NaN` until the simulation places the node.
#[derive(Clone, Debug)]
pub struct SimNode {
	pub id: String,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	/// Pinned x position, if any.
	pub fx: Option<f64>,
	/// Pinned y position, if any.
	pub fy: Option<f64>,
	/// Synthesized for an unresolvable endpoint.
	pub placeholder: bool,
}

impl SimNode {
	/// An unplaced, unpinned node.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			x: f64::NAN,
			y: f64::NAN,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
			placeholder: false,
		}
	}

	fn placeholder(id: String) -> Self {
		Self {
			placeholder: true,
			..Self::new(id)
		}
	}

	/// Whether the node has a usable position.
	pub fn is_positioned(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}

	/// Whether the node is held in place.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}
}

/// A typed relationship between two nodes of the same snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimEdge {
	pub source: usize,
	pub target: usize,
	/// Relationship type label.
	pub kind: String,
}

/// All nodes and edges of one data refresh.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
	pub nodes: Vec<SimNode>,
	pub edges: Vec<SimEdge>,
}

impl GraphSnapshot {
	/// Build a snapshot from link records.
	///
	/// Nodes are every distinct identifier used as a source or target, in
	/// order of first appearance. A blank identifier cannot be matched to
	/// anything, so each occurrence gets its own placeholder node whose
	/// identifier is distinct from every other in the snapshot.
	pub fn from_links(links: &[RawLink]) -> Self {
		let mut nodes = Vec::new();
		let mut index: HashMap<&str, usize> = HashMap::new();
		let mut minted: HashSet<String> = HashSet::new();

		for link in links {
			for id in [link.source.as_str(), link.target.as_str()] {
				if is_blank(id) || index.contains_key(id) {
					continue;
				}
				index.insert(id, nodes.len());
				nodes.push(SimNode::new(id));
			}
		}

		let mut edges = Vec::with_capacity(links.len());
		for (i, link) in links.iter().enumerate() {
			let mut resolve = |id: &str, side: &str| match index.get(id) {
				Some(&idx) => idx,
				None => {
					warn!("graph-live: link {i} has unresolvable {side} {id:?}, using placeholder");
					let mut id = format!("?{i}:{side}");
					while index.contains_key(id.as_str()) || minted.contains(&id) {
						id.push('\'');
					}
					minted.insert(id.clone());
					nodes.push(SimNode::placeholder(id));
					nodes.len() - 1
				}
			};
			let source = resolve(&link.source, "source");
			let target = resolve(&link.target, "target");
			edges.push(SimEdge {
				source,
				target,
				kind: link.kind.clone().unwrap_or_default(),
			});
		}

		Self { nodes, edges }
	}

	/// Number of edges touching each node. Self-loops count twice.
	pub fn degrees(&self) -> Vec<usize> {
		let mut degrees = vec![0; self.nodes.len()];
		for edge in &self.edges {
			degrees[edge.source] += 1;
			degrees[edge.target] += 1;
		}
		degrees
	}

	/// Whether the snapshot has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

fn is_blank(id: &str) -> bool {
	id.trim().is_empty()
}
