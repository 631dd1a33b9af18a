//! Force-directed layout engine.
//!
//! A cooling particle simulation in the style of d3-force. Each tick applies
//! four independent contributors to node velocities, integrates, then decays
//! `alpha`:
//!
//! 1. many-body repulsion within a bounded neighbourhood,
//! 2. edge springs toward a rest length,
//! 3. centering of the node set on the viewport center,
//! 4. collision separation of node circles.
//!
//! Repulsion and springs scale with `alpha`. Centering and collision are
//! constraints and act at full strength until the layout is settled.
//!
//! The simulation never stops on its own; callers keep ticking and may poll
//! [`Simulation::is_settled`].

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::adapter::{GraphSnapshot, SimEdge, SimNode};
use super::grid::NeighborGrid;
use crate::config::SimulationConfig;

/// Physics state over one graph snapshot.
pub struct Simulation {
	nodes: Vec<SimNode>,
	edges: Vec<SimEdge>,
	config: SimulationConfig,
	center: (f64, f64),
	alpha: f64,
	alpha_target: f64,
	tick_count: u64,
	/// Per-edge spring stiffness, `1 / min(degree)` of its endpoints.
	link_strength: Vec<f64>,
	/// Share of a spring correction applied to the target node.
	link_bias: Vec<f64>,
	rng: SmallRng,
	last_displacement: f64,
}

impl Simulation {
	/// Start a simulation over `snapshot`, centered on `center`.
	pub fn new(snapshot: GraphSnapshot, config: SimulationConfig, center: (f64, f64), seed: u64) -> Self {
		let mut sim = Self {
			nodes: Vec::new(),
			edges: Vec::new(),
			alpha: config.alpha_max,
			alpha_target: config.alpha_target,
			config,
			center,
			tick_count: 0,
			link_strength: Vec::new(),
			link_bias: Vec::new(),
			rng: SmallRng::seed_from_u64(seed),
			last_displacement: 0.0,
		};
		sim.restart(snapshot);
		sim
	}

	/// Replace the node and edge set and start cooling again from full alpha.
	///
	/// Nodes that already carry a position keep it; the rest are scattered
	/// around the center.
	pub fn restart(&mut self, snapshot: GraphSnapshot) {
		let degrees = snapshot.degrees();
		let GraphSnapshot { nodes, edges } = snapshot;
		self.nodes = nodes;
		self.edges = edges;
		self.initialize_nodes();
		self.initialize_links(&degrees);
		self.alpha = self.config.alpha_max;
		self.tick_count = 0;
		self.last_displacement = 0.0;
	}

	fn initialize_nodes(&mut self) {
		let (cx, cy) = self.center;
		let jitter = self.config.initial_jitter.abs();
		for node in &mut self.nodes {
			if let Some(fx) = node.fx {
				node.x = fx;
			}
			if let Some(fy) = node.fy {
				node.y = fy;
			}
			if !node.is_positioned() {
				node.x = cx + self.rng.gen_range(-jitter..=jitter);
				node.y = cy + self.rng.gen_range(-jitter..=jitter);
			}
			if !node.vx.is_finite() || !node.vy.is_finite() {
				node.vx = 0.0;
				node.vy = 0.0;
			}
		}
	}

	fn initialize_links(&mut self, degrees: &[usize]) {
		self.link_strength = self
			.edges
			.iter()
			.map(|e| 1.0 / degrees[e.source].min(degrees[e.target]).max(1) as f64)
			.collect();
		self.link_bias = self
			.edges
			.iter()
			.map(|e| {
				let (s, t) = (degrees[e.source] as f64, degrees[e.target] as f64);
				s / (s + t)
			})
			.collect();
	}

	/// Advance the layout by one step.
	pub fn tick(&mut self) {
		let alpha = self.alpha;
		self.apply_charge(alpha);
		self.apply_links(alpha);
		self.apply_center();
		self.apply_collide();
		self.integrate();
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		self.tick_count += 1;
	}

	fn jiggle(&mut self) -> f64 {
		(self.rng.r#gen::<f64>() - 0.5) * 1e-6
	}

	fn apply_charge(&mut self, alpha: f64) {
		let strength = self.config.charge_strength;
		let max = self.config.charge_distance_max;
		if strength == 0.0 || self.nodes.len() < 2 {
			return;
		}
		let (max2, min2) = (max * max, self.config.charge_distance_min.powi(2));

		let grid = NeighborGrid::build(self.nodes.iter().map(|n| (n.x, n.y)), max);
		let mut pairs = Vec::new();
		grid.for_each_pair(|i, j| pairs.push((i, j)));

		for (i, j) in pairs {
			let mut dx = self.nodes[j].x - self.nodes[i].x;
			let mut dy = self.nodes[j].y - self.nodes[i].y;
			let mut l = dx * dx + dy * dy;
			if l >= max2 {
				continue;
			}
			if dx == 0.0 {
				dx = self.jiggle();
				l += dx * dx;
			}
			if dy == 0.0 {
				dy = self.jiggle();
				l += dy * dy;
			}
			if l < min2 {
				l = (min2 * l).sqrt();
			}
			let w = strength * alpha / l;
			self.nodes[i].vx += dx * w;
			self.nodes[i].vy += dy * w;
			self.nodes[j].vx -= dx * w;
			self.nodes[j].vy -= dy * w;
		}
	}

	fn apply_links(&mut self, alpha: f64) {
		let distance = self.config.link_distance;
		for k in 0..self.edges.len() {
			let (s, t) = (self.edges[k].source, self.edges[k].target);
			if s == t {
				continue;
			}
			let (source, target) = (&self.nodes[s], &self.nodes[t]);
			let mut dx = target.x + target.vx - source.x - source.vx;
			let mut dy = target.y + target.vy - source.y - source.vy;
			if dx == 0.0 {
				dx = self.jiggle();
			}
			if dy == 0.0 {
				dy = self.jiggle();
			}
			let l = (dx * dx + dy * dy).sqrt();
			let factor = (l - distance) / l * alpha * self.link_strength[k];
			let (dx, dy) = (dx * factor, dy * factor);
			let bias = self.link_bias[k];

			self.nodes[t].vx -= dx * bias;
			self.nodes[t].vy -= dy * bias;
			self.nodes[s].vx += dx * (1.0 - bias);
			self.nodes[s].vy += dy * (1.0 - bias);
		}
	}

	fn apply_center(&mut self) {
		if self.nodes.is_empty() {
			return;
		}
		let n = self.nodes.len() as f64;
		let (sx, sy) = self
			.nodes
			.iter()
			.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
		let strength = self.config.center_strength;
		let (shift_x, shift_y) = (
			(sx / n - self.center.0) * strength,
			(sy / n - self.center.1) * strength,
		);
		for node in &mut self.nodes {
			node.x -= shift_x;
			node.y -= shift_y;
		}
	}

	fn apply_collide(&mut self) {
		let radius = self.config.collide_radius;
		let strength = self.config.collide_strength;
		if radius <= 0.0 || strength == 0.0 || self.nodes.len() < 2 {
			return;
		}
		let reach = 2.0 * radius;
		// Resolve against where nodes are about to be, not where they are.
		let predicted: Vec<(f64, f64)> = self
			.nodes
			.iter()
			.map(|n| (n.x + n.vx, n.y + n.vy))
			.collect();

		let grid = NeighborGrid::build(predicted.iter().copied(), reach);
		let mut pairs = Vec::new();
		grid.for_each_pair(|i, j| pairs.push((i, j)));

		// Uniform radii, so each side takes half of the correction.
		let share = 0.5;
		for (i, j) in pairs {
			let mut dx = predicted[i].0 - predicted[j].0;
			let mut dy = predicted[i].1 - predicted[j].1;
			let mut l = dx * dx + dy * dy;
			if l >= reach * reach {
				continue;
			}
			if dx == 0.0 {
				dx = self.jiggle();
				l += dx * dx;
			}
			if dy == 0.0 {
				dy = self.jiggle();
				l += dy * dy;
			}
			let l = l.sqrt();
			let factor = (reach - l) / l * strength;
			let (dx, dy) = (dx * factor, dy * factor);

			self.nodes[i].vx += dx * share;
			self.nodes[i].vy += dy * share;
			self.nodes[j].vx -= dx * (1.0 - share);
			self.nodes[j].vy -= dy * (1.0 - share);
		}
	}

	fn integrate(&mut self) {
		let keep = 1.0 - self.config.velocity_decay;
		let mut moved = 0.0;
		for node in &mut self.nodes {
			let (x0, y0) = (node.x, node.y);
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= keep;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= keep;
					node.y += node.vy;
				}
			}
			moved += ((node.x - x0).powi(2) + (node.y - y0).powi(2)).sqrt();
		}
		self.last_displacement = if self.nodes.is_empty() {
			0.0
		} else {
			moved / self.nodes.len() as f64
		};
	}

	/// Hold a node at `(x, y)` until [`unpin`](Self::unpin) is called.
	pub fn pin(&mut self, index: usize, x: f64, y: f64) {
		if let Some(node) = self.nodes.get_mut(index) {
			node.fx = Some(x);
			node.fy = Some(y);
		}
	}

	/// Let a pinned node move freely again.
	pub fn unpin(&mut self, index: usize) {
		if let Some(node) = self.nodes.get_mut(index) {
			node.fx = None;
			node.fy = None;
		}
	}

	/// Set the value alpha decays toward. Non-zero keeps the layout warm.
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, self.config.alpha_max);
	}

	/// Raise alpha to at least `alpha` without touching positions.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha.min(self.config.alpha_max));
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn tick_count(&self) -> u64 {
		self.tick_count
	}

	/// Whether alpha has cooled below the configured floor.
	pub fn is_settled(&self) -> bool {
		self.alpha < self.config.alpha_min
	}

	/// Mean distance a node moved during the last tick.
	pub fn mean_displacement(&self) -> f64 {
		self.last_displacement
	}

	/// Current node states, in snapshot order.
	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::RawLink;

	const CENTER: (f64, f64) = (450.0, 350.0);

	fn sim_from_links(links: &[RawLink], seed: u64) -> Simulation {
		Simulation::new(
			GraphSnapshot::from_links(links),
			SimulationConfig::default(),
			CENTER,
			seed,
		)
	}

	fn distance(sim: &Simulation, a: usize, b: usize) -> f64 {
		let (na, nb) = (&sim.nodes()[a], &sim.nodes()[b]);
		((na.x - nb.x).powi(2) + (na.y - nb.y).powi(2)).sqrt()
	}

	fn run(sim: &mut Simulation, ticks: usize) {
		for _ in 0..ticks {
			sim.tick();
		}
	}

	#[test]
	fn unplaced_nodes_start_near_center() {
		let sim = sim_from_links(&[RawLink::new("A", "B", "knows"), RawLink::new("B", "C", "owns")], 3);
		for node in sim.nodes() {
			assert!((node.x - CENTER.0).abs() <= 50.0);
			assert!((node.y - CENTER.1).abs() <= 50.0);
		}
		assert_eq!(sim.alpha(), 1.0);
		assert_eq!(sim.tick_count(), 0);
	}

	#[test]
	fn restart_resets_alpha_regardless_of_ticks() {
		let mut sim = sim_from_links(&[RawLink::new("A", "B", "knows")], 1);
		run(&mut sim, 250);
		assert!(sim.alpha() < 0.01);

		sim.restart(GraphSnapshot::from_links(&[RawLink::new("X", "Y", "owns")]));
		assert_eq!(sim.alpha(), 1.0);
		assert_eq!(sim.tick_count(), 0);
		assert_eq!(sim.nodes()[0].id, "X");
	}

	#[test]
	fn spring_stiffness_and_bias_follow_snapshot_degrees() {
		let links = [
			RawLink::new("hub", "a", "x"),
			RawLink::new("hub", "b", "x"),
			RawLink::new("hub", "c", "x"),
			RawLink::new("a", "b", "y"),
		];
		let snapshot = GraphSnapshot::from_links(&links);
		assert_eq!(snapshot.degrees(), [3, 2, 2, 1]);

		let sim = Simulation::new(snapshot, SimulationConfig::default(), CENTER, 0);
		assert_eq!(sim.link_strength, [0.5, 0.5, 1.0, 0.5]);
		assert_eq!(sim.link_bias, [0.6, 0.6, 0.75, 0.5]);
	}

	#[test]
	fn alpha_settles_after_about_300_ticks() {
		let mut sim = sim_from_links(&[RawLink::new("A", "B", "knows")], 9);
		run(&mut sim, 299);
		assert!(!sim.is_settled());
		run(&mut sim, 2);
		assert!(sim.is_settled());
	}

	#[test]
	fn repulsion_and_centering_converge_without_edges() {
		let snapshot = GraphSnapshot {
			nodes: (0..6).map(|i| SimNode::new(format!("n{i}"))).collect(),
			edges: Vec::new(),
		};
		let mut sim = Simulation::new(snapshot, SimulationConfig::default(), CENTER, 42);
		run(&mut sim, 400);

		assert!(sim.mean_displacement() < 0.05, "still moving: {}", sim.mean_displacement());
		let n = sim.nodes().len() as f64;
		let mean_x = sim.nodes().iter().map(|n| n.x).sum::<f64>() / n;
		let mean_y = sim.nodes().iter().map(|n| n.y).sum::<f64>() / n;
		assert!((mean_x - CENTER.0).abs() < 1.0);
		assert!((mean_y - CENTER.1).abs() < 1.0);
		for a in 0..6 {
			for b in a + 1..6 {
				assert!(distance(&sim, a, b) > 20.0);
			}
		}
	}

	#[test]
	fn single_edge_settles_near_rest_distance() {
		let mut sim = sim_from_links(&[RawLink::new("A", "B", "knows")], 5);
		run(&mut sim, 300);
		let d = distance(&sim, 0, 1);
		assert!((d - 150.0).abs() < 15.0, "separation {d}");
	}

	#[test]
	fn chain_settles_with_both_links_near_rest_distance() {
		let mut sim = sim_from_links(&[RawLink::new("A", "B", "knows"), RawLink::new("B", "C", "owns")], 11);
		run(&mut sim, 300);
		let (ab, bc, ac) = (distance(&sim, 0, 1), distance(&sim, 1, 2), distance(&sim, 0, 2));
		assert!((ab - 150.0).abs() < 25.0, "AB {ab}");
		assert!((bc - 150.0).abs() < 25.0, "BC {bc}");
		assert!(ac > 100.0, "AC {ac}");
	}

	#[test]
	fn coincident_nodes_are_separated() {
		let mut snapshot = GraphSnapshot::from_links(&[RawLink::new("A", "B", "knows")]);
		for node in &mut snapshot.nodes {
			node.x = 300.0;
			node.y = 300.0;
		}
		let mut sim = Simulation::new(snapshot, SimulationConfig::default(), CENTER, 0);
		run(&mut sim, 50);
		assert!(distance(&sim, 0, 1) > 20.0);
		assert!(sim.nodes().iter().all(SimNode::is_positioned));
	}

	#[test]
	fn pinned_node_stays_put() {
		let mut sim = sim_from_links(&[RawLink::new("A", "B", "knows"), RawLink::new("A", "C", "knows")], 2);
		sim.pin(0, 100.0, 120.0);
		run(&mut sim, 100);
		assert_eq!((sim.nodes()[0].x, sim.nodes()[0].y), (100.0, 120.0));
		assert!(sim.nodes()[0].is_pinned());

		sim.unpin(0);
		assert!(!sim.nodes()[0].is_pinned());
	}

	#[test]
	fn alpha_target_keeps_layout_warm() {
		let mut sim = sim_from_links(&[RawLink::new("A", "B", "knows")], 4);
		run(&mut sim, 400);
		sim.set_alpha_target(0.3);
		run(&mut sim, 200);
		assert!(sim.alpha() > 0.25);
		sim.set_alpha_target(0.0);
		run(&mut sim, 400);
		assert!(sim.is_settled());
	}

	#[test]
	fn reheat_never_lowers_alpha() {
		let mut sim = sim_from_links(&[RawLink::new("A", "B", "knows")], 4);
		sim.reheat(0.3);
		assert_eq!(sim.alpha(), 1.0);
		run(&mut sim, 400);
		sim.reheat(0.3);
		assert_eq!(sim.alpha(), 0.3);
		assert_eq!(sim.tick_count(), 400);
	}

	#[test]
	fn same_seed_same_layout() {
		let links = [RawLink::new("A", "B", "knows"), RawLink::new("B", "C", "owns"), RawLink::new("C", "A", "likes")];
		let mut first = sim_from_links(&links, 77);
		let mut second = sim_from_links(&links, 77);
		run(&mut first, 120);
		run(&mut second, 120);
		for (a, b) in first.nodes().iter().zip(second.nodes()) {
			assert_eq!((a.x, a.y), (b.x, b.y));
		}
	}

	#[test]
	fn empty_snapshot_ticks_harmlessly() {
		let mut sim = Simulation::new(GraphSnapshot::default(), SimulationConfig::default(), CENTER, 0);
		run(&mut sim, 10);
		assert_eq!(sim.tick_count(), 10);
		assert_eq!(sim.mean_displacement(), 0.0);
	}
}
