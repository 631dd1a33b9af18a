//! Wire format of the graph data endpoint.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::GraphError;

/// A node record as returned by the graph store.
///
/// The layout does not use these; node identity comes from the links.
#[derive(Clone, Debug, Deserialize)]
pub struct RawNode {
	/// Node name, which doubles as its identifier.
	pub name: String,
	/// Store label of the node, if any.
	#[serde(default, rename = "type")]
	pub label: Option<String>,
}

/// A relationship record between two node names.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawLink {
	/// Source node identifier. Blank when absent or unusable.
	#[serde(default, deserialize_with = "endpoint")]
	pub source: String,
	/// Target node identifier. Blank when absent or unusable.
	#[serde(default, deserialize_with = "endpoint")]
	pub target: String,
	/// Relationship type. Missing or null becomes the empty string.
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
}

impl RawLink {
	/// Shorthand used by fixtures and tests.
	pub fn new(source: &str, target: &str, kind: &str) -> Self {
		Self {
			source: source.to_string(),
			target: target.to_string(),
			kind: Some(kind.to_string()),
		}
	}
}

/// Numbers and booleans keep their JSON text; null, arrays and objects become
/// blank and are left to the adapter to replace with a placeholder.
fn endpoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	Ok(match Value::deserialize(deserializer)? {
		Value::String(id) => id,
		Value::Number(n) => n.to_string(),
		Value::Bool(b) => b.to_string(),
		Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
	})
}

/// Complete response of the graph data endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphResponse {
	#[serde(default)]
	pub nodes: Vec<RawNode>,
	#[serde(default)]
	pub links: Vec<RawLink>,
}

/// Decode a graph data response body.
pub fn parse_graph_response(text: &str) -> Result<GraphResponse, GraphError> {
	Ok(serde_json::from_str(text)?)
}
