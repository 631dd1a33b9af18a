//! Graph data retrieval.
//!
//! Fetches are fire-and-forget: the caller hands over a completion and gets it
//! invoked exactly once with either the decoded response or a failure. There
//! is no timeout, retry or cancellation.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::XmlHttpRequest;

use crate::components::force_graph::{GraphResponse, parse_graph_response};
use crate::error::GraphError;

/// Completion of one graph data request.
pub type FetchCallback = Box<dyn FnOnce(Result<GraphResponse, GraphError>)>;

/// Anything that can produce the current graph.
pub trait GraphSource {
	/// Start a request. `done` runs once, possibly before this returns.
	fn fetch(&self, done: FetchCallback);
}

/// `GET`s the graph document from a fixed URL using `XMLHttpRequest`.
pub struct XhrGraphSource {
	url: String,
}

impl XhrGraphSource {
	/// Source reading from `url`.
	pub fn new(url: impl Into<String>) -> Self {
		Self { url: url.into() }
	}

	fn start(&self, finish: impl FnOnce(Result<GraphResponse, GraphError>) + 'static) -> Result<(), GraphError> {
		let xhr = XmlHttpRequest::new().map_err(js_failure)?;
		xhr.open_with_async("GET", &self.url, true).map_err(js_failure)?;

		// `loadend` fires exactly once per request whatever the outcome, so a
		// single one-shot closure is always consumed.
		let xhr_done = xhr.clone();
		let onloadend = Closure::once_into_js(move || {
			let status = xhr_done.status().unwrap_or(0);
			let body = xhr_done.response_text().ok().flatten().unwrap_or_default();
			finish(outcome(status, &body));
		});
		xhr.set_onloadend(Some(onloadend.unchecked_ref()));

		debug!("graph-live: GET {}", self.url);
		xhr.send().map_err(js_failure)
	}
}

impl GraphSource for XhrGraphSource {
	fn fetch(&self, done: FetchCallback) {
		let done = Rc::new(RefCell::new(Some(done)));
		let finish = move |result: Result<GraphResponse, GraphError>| {
			if let Some(done) = done.borrow_mut().take() {
				done(result);
			}
		};
		if let Err(e) = self.start(finish.clone()) {
			finish(Err(e));
		}
	}
}

/// Classify a finished request. Status 0 means it never got a response.
fn outcome(status: u16, body: &str) -> Result<GraphResponse, GraphError> {
	match status {
		0 => Err(GraphError::FetchFailure("network error".to_string())),
		200..=299 => parse_graph_response(body),
		status => Err(GraphError::FetchFailure(format!("HTTP {status}"))),
	}
}

fn js_failure(value: JsValue) -> GraphError {
	GraphError::FetchFailure(format!("{value:?}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn success_status_decodes_body() {
		let response = outcome(200, r#"{"links": [{"source": "A", "target": "B"}]}"#).unwrap();
		assert_eq!(response.links.len(), 1);
	}

	#[test]
	fn unreachable_and_error_statuses_are_fetch_failures() {
		for (status, expected) in [(0, "network error"), (404, "HTTP 404"), (503, "HTTP 503")] {
			let err = outcome(status, "{}").unwrap_err();
			assert!(err.is_fetch_failure());
			assert!(err.to_string().ends_with(expected), "{err}");
		}
	}

	#[test]
	fn success_with_garbage_body_is_a_fetch_failure() {
		assert!(outcome(204, "").unwrap_err().is_fetch_failure());
	}
}
