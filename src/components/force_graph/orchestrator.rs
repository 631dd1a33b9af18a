//! Reaction to data refreshes: fetch, rebuild, restart.
//!
//! The orchestrator owns at most one [`Session`], the pairing of a simulation
//! with the scene drawn from it. A successful fetch drops the current session
//! and builds a new one from scratch. A failed fetch leaves it alone. Fetches
//! are not sequenced, so whichever completes last is what stays on screen.
//!
//! The reported state stays `Loading` while any request is in flight. A
//! failure only counts if no rebuild has landed since that request started.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::adapter::GraphSnapshot;
use super::scene::Scene;
use super::simulation::Simulation;
use super::theme::OrdinalPalette;
use super::types::GraphResponse;
use super::viewport::Viewport;
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::services::GraphSource;

/// Alpha the layout is kept at while a node is dragged or released.
const INTERACTION_ALPHA: f64 = 0.3;

/// Data loading status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
	#[default]
	Idle,
	Loading,
	Ready,
	Error,
}

impl LoadState {
	/// Status line to show, if any.
	pub fn message(self) -> Option<&'static str> {
		match self {
			LoadState::Loading => Some("Loading graph…"),
			LoadState::Error => Some("Graph data unavailable"),
			LoadState::Idle | LoadState::Ready => None,
		}
	}
}

/// One snapshot's simulation and the scene painted from it.
pub struct Session {
	generation: u64,
	simulation: Simulation,
	scene: Scene,
}

impl Session {
	fn tick(&mut self) {
		self.simulation.tick();
		self.scene.update(&self.simulation, self.generation);
	}

	/// Generation this session was built as.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	pub fn scene(&self) -> &Scene {
		&self.scene
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		debug!(
			"graph-live: session {} torn down after {} ticks",
			self.generation,
			self.simulation.tick_count()
		);
	}
}

/// A node being dragged, bound to the session it was grabbed in.
#[derive(Clone, Copy, Debug)]
struct DragState {
	generation: u64,
	node: usize,
}

/// Drives fetch → adapter → simulation → scene.
pub struct Orchestrator {
	config: GraphConfig,
	viewport: Viewport,
	palette: OrdinalPalette,
	state: LoadState,
	session: Option<Session>,
	generation: u64,
	requests: u64,
	in_flight: usize,
	/// Requests started before the most recent successful rebuild.
	covered: u64,
	/// Outcome to report once nothing is in flight.
	settled: LoadState,
	seeds: SmallRng,
	drag: Option<DragState>,
}

impl Orchestrator {
	/// `seed` feeds the per-session layout seeds, so equal seeds replay
	/// identical layouts.
	pub fn new(config: GraphConfig, viewport: Viewport, seed: u64) -> Self {
		Self {
			config,
			viewport,
			palette: OrdinalPalette::default(),
			state: LoadState::Idle,
			session: None,
			generation: 0,
			requests: 0,
			in_flight: 0,
			covered: 0,
			settled: LoadState::Idle,
			seeds: SmallRng::seed_from_u64(seed),
			drag: None,
		}
	}

	/// Fetch the graph from `source` and rebuild when it arrives.
	///
	/// The completion only holds a weak reference, so a request outliving the
	/// view is simply dropped.
	pub fn refresh(this: &Rc<RefCell<Self>>, source: &dyn GraphSource) {
		let request = this.borrow_mut().begin_load();
		let weak = Rc::downgrade(this);
		source.fetch(Box::new(move |result| match weak.upgrade() {
			Some(orchestrator) => orchestrator.borrow_mut().complete(request, result),
			None => debug!("graph-live: request {request} finished after teardown"),
		}));
	}

	/// Mark a request as started and return its number.
	pub fn begin_load(&mut self) -> u64 {
		self.requests += 1;
		self.in_flight += 1;
		self.state = LoadState::Loading;
		debug!("graph-live: request {} started, {} in flight", self.requests, self.in_flight);
		self.requests
	}

	/// Apply the outcome of request `request`.
	pub fn complete(&mut self, request: u64, result: Result<GraphResponse, GraphError>) {
		self.in_flight = self.in_flight.saturating_sub(1);
		match result {
			Ok(response) => {
				self.rebuild(GraphSnapshot::from_links(&response.links));
				info!(
					"graph-live: request {request} applied as generation {}",
					self.generation
				);
				self.covered = self.requests;
				self.settled = LoadState::Ready;
			}
			Err(e) if request <= self.covered => {
				warn!("graph-live: request {request} failed after a newer graph was applied: {e}");
			}
			Err(e) => {
				warn!("graph-live: request {request} failed: {e}");
				self.settled = LoadState::Error;
			}
		}
		self.state = if self.in_flight > 0 {
			LoadState::Loading
		} else {
			self.settled
		};
	}

	fn rebuild(&mut self, snapshot: GraphSnapshot) {
		// Old session goes first so nothing of it survives into the new one.
		drop(self.session.take());
		self.drag = None;
		self.generation += 1;

		info!(
			"graph-live: building {} nodes, {} edges",
			snapshot.nodes.len(),
			snapshot.edges.len()
		);
		let scene = Scene::build(
			&snapshot,
			&mut self.palette,
			self.viewport,
			self.config.viewport.label_offset,
			self.generation,
		);
		let simulation = Simulation::new(
			snapshot,
			self.config.simulation.clone(),
			self.viewport.center(),
			self.seeds.r#gen(),
		);
		let mut session = Session {
			generation: self.generation,
			simulation,
			scene,
		};
		session.scene.update(&session.simulation, session.generation);
		self.session = Some(session);
	}

	/// Advance the current session by one tick. Returns whether there was one.
	pub fn tick(&mut self) -> bool {
		match self.session.as_mut() {
			Some(session) => {
				session.tick();
				true
			}
			None => false,
		}
	}

	/// Grab the node under `(x, y)`, pinning it there. Returns whether one was hit.
	pub fn begin_drag(&mut self, x: f64, y: f64) -> bool {
		let Some(session) = self.session.as_mut() else {
			return false;
		};
		let Some(node) = session.scene.node_at(x, y) else {
			return false;
		};
		session.simulation.pin(node, x, y);
		session.simulation.set_alpha_target(INTERACTION_ALPHA);
		session.simulation.reheat(INTERACTION_ALPHA);
		self.drag = Some(DragState {
			generation: session.generation,
			node,
		});
		true
	}

	/// Move the grabbed node, if it still belongs to the current session.
	pub fn drag_to(&mut self, x: f64, y: f64) {
		if let Some((session, drag)) = self.dragged_session() {
			session.simulation.pin(drag.node, x, y);
		}
	}

	/// Let go of the grabbed node. It stays pinned where it was dropped.
	pub fn end_drag(&mut self) {
		if let Some((session, _)) = self.dragged_session() {
			session.simulation.set_alpha_target(0.0);
		}
		self.drag = None;
	}

	/// Unpin the node under `(x, y)` and let the layout adjust around it.
	pub fn release_at(&mut self, x: f64, y: f64) -> bool {
		let Some(session) = self.session.as_mut() else {
			return false;
		};
		let Some(node) = session.scene.node_at(x, y) else {
			return false;
		};
		session.simulation.unpin(node);
		session.simulation.reheat(INTERACTION_ALPHA);
		true
	}

	fn dragged_session(&mut self) -> Option<(&mut Session, DragState)> {
		let drag = self.drag?;
		self.session
			.as_mut()
			.filter(|session| session.generation == drag.generation)
			.map(|session| (session, drag))
	}

	/// Whether a node is currently grabbed.
	pub fn is_dragging(&self) -> bool {
		self.drag.is_some()
	}

	pub fn state(&self) -> LoadState {
		self.state
	}

	/// Requests started but not yet completed.
	pub fn in_flight(&self) -> usize {
		self.in_flight
	}

	pub fn session(&self) -> Option<&Session> {
		self.session.as_ref()
	}

	pub fn scene(&self) -> Option<&Scene> {
		self.session.as_ref().map(Session::scene)
	}

	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::RawLink;
	use crate::services::FetchCallback;

	/// Holds completions until the test decides to resolve them.
	#[derive(Default)]
	struct DeferredSource {
		pending: RefCell<Vec<Option<FetchCallback>>>,
	}

	impl GraphSource for DeferredSource {
		fn fetch(&self, done: FetchCallback) {
			self.pending.borrow_mut().push(Some(done));
		}
	}

	impl DeferredSource {
		fn resolve(&self, index: usize, result: Result<GraphResponse, GraphError>) {
			let done = self.pending.borrow_mut()[index].take().expect("already resolved");
			done(result);
		}
	}

	/// Answers synchronously from inside `fetch`.
	struct ImmediateSource(Vec<RawLink>);

	impl GraphSource for ImmediateSource {
		fn fetch(&self, done: FetchCallback) {
			done(Ok(response(self.0.clone())));
		}
	}

	fn response(links: Vec<RawLink>) -> GraphResponse {
		GraphResponse {
			nodes: Vec::new(),
			links,
		}
	}

	fn example_links() -> Vec<RawLink> {
		vec![RawLink::new("A", "B", "knows"), RawLink::new("B", "C", "owns")]
	}

	fn orchestrator() -> Rc<RefCell<Orchestrator>> {
		Rc::new(RefCell::new(Orchestrator::new(
			GraphConfig::default(),
			Viewport::default(),
			1,
		)))
	}

	fn node_labels(o: &Orchestrator) -> Vec<String> {
		o.scene()
			.map(|s| s.nodes.iter().map(|g| g.id.clone()).collect())
			.unwrap_or_default()
	}

	#[test]
	fn successful_fetch_builds_scene() {
		let o = orchestrator();
		let source = DeferredSource::default();
		assert_eq!(o.borrow().state(), LoadState::Idle);

		Orchestrator::refresh(&o, &source);
		assert_eq!(o.borrow().state(), LoadState::Loading);
		assert!(o.borrow().scene().is_none());

		source.resolve(0, Ok(response(example_links())));
		let o = o.borrow();
		assert_eq!(o.state(), LoadState::Ready);
		assert_eq!(o.in_flight(), 0);
		assert_eq!(node_labels(&o), ["A", "B", "C"]);
		let scene = o.scene().unwrap();
		let kinds: Vec<&str> = scene.edges.iter().map(|e| e.label.as_str()).collect();
		assert_eq!(kinds, ["knows", "owns"]);
		assert_eq!(o.session().unwrap().simulation().alpha(), 1.0);
	}

	#[test]
	fn example_graph_runs_to_convergence() {
		let o = orchestrator();
		Orchestrator::refresh(&o, &ImmediateSource(example_links()));
		let mut o = o.borrow_mut();
		for _ in 0..300 {
			assert!(o.tick());
		}
		let session = o.session().unwrap();
		let nodes = session.simulation().nodes();
		let dist = |a: usize, b: usize| ((nodes[a].x - nodes[b].x).powi(2) + (nodes[a].y - nodes[b].y).powi(2)).sqrt();
		assert!((dist(0, 1) - 150.0).abs() < 25.0);
		assert!((dist(1, 2) - 150.0).abs() < 25.0);
		assert!(dist(0, 2) > 100.0);

		let scene = session.scene();
		assert_eq!(scene.nodes.len(), 3);
		assert_eq!(scene.edges.len(), 2);
		for (glyph, node) in scene.nodes.iter().zip(nodes) {
			assert_eq!(glyph.center, scene.viewport().project(node.x, node.y));
		}
	}

	#[test]
	fn failed_fetch_keeps_previous_scene() {
		let o = orchestrator();
		let source = DeferredSource::default();
		Orchestrator::refresh(&o, &source);
		source.resolve(0, Ok(response(example_links())));
		for _ in 0..20 {
			o.borrow_mut().tick();
		}
		let before = o.borrow().scene().unwrap().clone();

		Orchestrator::refresh(&o, &source);
		source.resolve(1, Err(GraphError::FetchFailure("HTTP 503".into())));

		let o = o.borrow();
		assert_eq!(o.state(), LoadState::Error);
		assert_eq!(o.in_flight(), 0);
		let after = o.scene().unwrap();
		assert_eq!(after.generation(), before.generation());
		assert_eq!(after.nodes, before.nodes);
		assert_eq!(after.edges, before.edges);
	}

	#[test]
	fn last_completed_fetch_wins() {
		let o = orchestrator();
		let source = DeferredSource::default();
		Orchestrator::refresh(&o, &source);
		Orchestrator::refresh(&o, &source);
		assert_eq!(o.borrow().in_flight(), 2);

		source.resolve(1, Ok(response(vec![RawLink::new("X", "Y", "newer")])));
		assert_eq!(node_labels(&o.borrow()), ["X", "Y"]);
		assert_eq!(o.borrow().state(), LoadState::Loading);

		source.resolve(0, Ok(response(example_links())));
		let o = o.borrow();
		assert_eq!(o.state(), LoadState::Ready);
		assert_eq!(node_labels(&o), ["A", "B", "C"]);
		let scene = o.scene().unwrap();
		assert_eq!(scene.generation(), 2);
		assert_eq!(scene.edges.len(), 2);
		assert!(scene.edges.iter().all(|e| e.label != "newer"));
	}

	#[test]
	fn older_failure_after_newer_success_stays_ready() {
		let o = orchestrator();
		let source = DeferredSource::default();
		Orchestrator::refresh(&o, &source);
		Orchestrator::refresh(&o, &source);

		source.resolve(1, Ok(response(example_links())));
		assert_eq!(o.borrow().state(), LoadState::Loading);
		assert_eq!(o.borrow().in_flight(), 1);

		source.resolve(0, Err(GraphError::FetchFailure("HTTP 500".into())));
		let o = o.borrow();
		assert_eq!(o.state(), LoadState::Ready);
		assert_eq!(o.in_flight(), 0);
		assert_eq!(o.scene().unwrap().generation(), 1);
	}

	#[test]
	fn overlapping_failures_report_error_once_drained() {
		let o = orchestrator();
		let source = DeferredSource::default();
		Orchestrator::refresh(&o, &source);
		source.resolve(0, Ok(response(example_links())));
		Orchestrator::refresh(&o, &source);
		Orchestrator::refresh(&o, &source);

		source.resolve(1, Err(GraphError::FetchFailure("HTTP 500".into())));
		assert_eq!(o.borrow().state(), LoadState::Loading);
		source.resolve(2, Err(GraphError::FetchFailure("network error".into())));
		let o = o.borrow();
		assert_eq!(o.state(), LoadState::Error);
		assert_eq!(o.scene().unwrap().generation(), 1);
	}

	#[test]
	fn completion_after_teardown_is_ignored() {
		let o = orchestrator();
		let source = DeferredSource::default();
		Orchestrator::refresh(&o, &source);
		drop(o);
		source.resolve(0, Ok(response(example_links())));
	}

	#[test]
	fn tick_without_session_is_noop() {
		let mut o = Orchestrator::new(GraphConfig::default(), Viewport::default(), 0);
		assert!(!o.tick());
	}

	#[test]
	fn empty_graph_is_ready_and_empty() {
		let o = orchestrator();
		Orchestrator::refresh(&o, &ImmediateSource(Vec::new()));
		let mut o = o.borrow_mut();
		assert_eq!(o.state(), LoadState::Ready);
		assert!(o.tick());
		assert!(o.scene().unwrap().nodes.is_empty());
	}

	#[test]
	fn dragging_pins_node_within_its_session() {
		let o = orchestrator();
		Orchestrator::refresh(&o, &ImmediateSource(example_links()));
		let mut o = o.borrow_mut();
		for _ in 0..50 {
			o.tick();
		}
		let (x, y) = o.scene().unwrap().nodes[1].center;
		assert!(o.begin_drag(x, y));
		o.drag_to(200.0, 220.0);
		for _ in 0..5 {
			o.tick();
		}
		let node = &o.session().unwrap().simulation().nodes()[1];
		assert_eq!((node.x, node.y), (200.0, 220.0));
		assert!(o.session().unwrap().simulation().alpha() >= 0.3 * 0.9);

		o.end_drag();
		assert!(!o.is_dragging());
		assert!(o.release_at(200.0, 220.0));
		assert!(!o.session().unwrap().simulation().nodes()[1].is_pinned());
		assert!(!o.begin_drag(5.0, 5.0));
	}

	#[test]
	fn rebuild_cancels_drag() {
		let o = orchestrator();
		let source = DeferredSource::default();
		Orchestrator::refresh(&o, &source);
		source.resolve(0, Ok(response(example_links())));
		let (x, y) = o.borrow().scene().unwrap().nodes[0].center;
		assert!(o.borrow_mut().begin_drag(x, y));

		Orchestrator::refresh(&o, &source);
		source.resolve(1, Ok(response(example_links())));
		let mut o = o.borrow_mut();
		assert!(!o.is_dragging());
		o.drag_to(100.0, 100.0);
		assert!(o.session().unwrap().simulation().nodes().iter().all(|n| !n.is_pinned()));
	}
}
