//! Live force-directed graph visualization.
//!
//! Data flows one way through the submodules:
//! - [`types`]: wire format of the graph endpoint
//! - [`adapter`]: raw links to a deduplicated [`GraphSnapshot`]
//! - [`simulation`]: d3-style cooling force layout over a snapshot
//! - [`viewport`]: clamping of simulated coordinates into the canvas
//! - [`scene`]: per-node and per-edge glyphs repositioned every tick
//! - [`orchestrator`]: fetch, rebuild and restart on change notifications
//!
//! `component` and `render` bind all of that to a canvas in the browser.
//!
//! # Example
//!
//! ```ignore
//! use graph_live::{GraphConfig, GraphView};
//!
//! view! { <GraphView config=GraphConfig::default() /> }
//! ```

pub mod adapter;
mod component;
mod grid;
pub mod orchestrator;
mod render;
pub mod scene;
pub mod simulation;
pub mod theme;
mod types;
pub mod viewport;

pub use adapter::{GraphSnapshot, SimEdge, SimNode};
pub use component::GraphView;
pub use orchestrator::{LoadState, Orchestrator, Session};
pub use scene::{EdgeGlyph, NodeGlyph, Scene};
pub use simulation::Simulation;
pub use theme::{OrdinalPalette, Theme};
pub use types::{GraphResponse, RawLink, RawNode, parse_graph_response};
pub use viewport::{Viewport, clamp};
