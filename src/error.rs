//! Error type shared by the data, transport and rendering layers.

use thiserror::Error;

/// Everything that can go wrong between the graph store and the canvas.
///
/// None of these are fatal: callers log them and keep whatever is already on
/// screen.
#[derive(Debug, Error)]
pub enum GraphError {
	/// The graph data request failed at the transport or HTTP level.
	#[error("graph data unavailable: {0}")]
	FetchFailure(String),
	/// The response body was not a graph document.
	#[error("graph data unavailable: malformed response: {0}")]
	Decode(#[from] serde_json::Error),
	/// No canvas or 2d context to draw on.
	#[error("render target unavailable")]
	RenderTargetUnavailable,
	/// The change notification socket could not be opened.
	#[error("notification channel unavailable: {0}")]
	Socket(String),
}

impl GraphError {
	/// Whether the error belongs to the data retrieval path.
	pub fn is_fetch_failure(&self) -> bool {
		matches!(self, GraphError::FetchFailure(_) | GraphError::Decode(_))
	}
}
