//! graph-live: live force-directed graph visualization.
//!
//! Fetches a `{ nodes, links }` document from a graph store, lays it out with
//! a cooling force simulation and redraws it on a canvas every animation
//! frame. A socket.io notification channel triggers refetches, each of which
//! rebuilds the layout from scratch.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;
pub mod config;
pub mod error;
pub mod services;

pub use components::force_graph::{GraphView, Orchestrator, Scene, Simulation};
pub use config::GraphConfig;
pub use error::GraphError;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("graph-live: logging initialized");
}

/// Load configuration from a script element with id="graph-config".
/// Missing element means defaults; a malformed one is logged and ignored.
fn load_config() -> GraphConfig {
	let Some(json_text) = config_text() else {
		return GraphConfig::default();
	};

	match GraphConfig::from_json(&json_text) {
		Ok(config) => {
			info!("graph-live: config loaded, data from {}", config.data_url);
			config
		}
		Err(e) => {
			warn!("graph-live: failed to parse config, using defaults: {}", e);
			GraphConfig::default()
		}
	}
}

fn config_text() -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("graph-config")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Main application component.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_config();
	let theme = config.theme.clone();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme=theme />
		<Title text="Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph" style="width: 100vw; height: 100vh;">
			<GraphView config=config />
			<div class="graph-overlay">
				<p class="subtitle">"Drag a node to pin it. Double-click to release."</p>
			</div>
		</div>
	}
}
