//! Force layout for the record graph.
//!
//! Wraps the `force_graph` physics simulation, which provides the `link`
//! springs and the many-body `charge` repulsion, and layers the `collide` and
//! `center` forces on top after every engine step. A d3-style `alpha` cools
//! the layout so it settles and stops ticking; [`Simulation::restart`] heats
//! it up again from the current positions.
//!
//! Force parameters are fixed when the simulation is built. Changing them (or
//! the viewport) goes through [`Simulation::init`], which rebuilds the engine
//! and carries every node position and pin across.

use std::collections::{HashMap, HashSet};

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::options::GraphOptions;
use super::types::{GraphLink, GraphNode, Position};

/// Below this alpha the layout counts as settled.
pub const ALPHA_MIN: f64 = 0.001;
/// Per-tick alpha decay: settles in roughly 300 ticks.
const ALPHA_DECAY: f64 = 0.0228;
/// Fraction of the overlap resolved per tick.
const COLLIDE_STRENGTH: f64 = 1.0;
/// Smallest collision radius when sizing from labels.
const MIN_AUTO_RADIUS: f64 = 4.0;
/// Collision radius per label character.
const RADIUS_PER_CHAR: f64 = 2.8;

/// Per-node data attached to each simulation node.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	pub name_len: usize,
	pub collide_radius: f64,
}

/// Spring pull between linked nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkForce {
	pub strength: f64,
}

/// Many-body force; negative strength repels.
#[derive(Clone, Debug, PartialEq)]
pub struct ChargeForce {
	pub strength: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CollideRadius {
	Fixed(f64),
	/// Proportional to the node's name length.
	Auto,
}

/// Keeps nodes from overlapping.
#[derive(Clone, Debug, PartialEq)]
pub struct CollideForce {
	pub radius: CollideRadius,
}

impl CollideForce {
	pub fn radius_for(&self, name_len: usize) -> f64 {
		match self.radius {
			CollideRadius::Fixed(radius) => radius,
			CollideRadius::Auto => (name_len as f64 * RADIUS_PER_CHAR).max(MIN_AUTO_RADIUS),
		}
	}
}

/// Recenters the layout on the viewport midpoint. Pinned nodes neither move
/// nor count towards the layout's center.
#[derive(Clone, Debug, PartialEq)]
pub struct CenterForce {
	pub x: f64,
	pub y: f64,
}

/// The four named forces of the layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Forces {
	pub link: LinkForce,
	pub charge: ChargeForce,
	pub collide: CollideForce,
	pub center: CenterForce,
}

impl Forces {
	pub fn from_options(options: &GraphOptions) -> Self {
		Self {
			link: LinkForce {
				strength: options.link_strength,
			},
			charge: ChargeForce {
				strength: -options.charge_strength,
			},
			collide: CollideForce {
				radius: if options.auto_collision_radius {
					CollideRadius::Auto
				} else {
					CollideRadius::Fixed(options.collision_radius)
				},
			},
			center: CenterForce {
				x: options.width / 2.0,
				y: options.height / 2.0,
			},
		}
	}

	fn parameters(&self) -> SimulationParameters {
		SimulationParameters {
			// force_graph repels with a positive charge
			force_charge: (-self.charge.strength) as f32,
			force_spring: self.link.strength as f32,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

/// Position of one node after a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePosition {
	pub id: String,
	pub x: f64,
	pub y: f64,
}

/// Receives the node positions after every tick.
pub type TickCallback = Box<dyn FnMut(&[NodePosition])>;

/// Owns the physics state for one graph view.
pub struct Simulation {
	graph: ForceGraph<NodeInfo, ()>,
	forces: Forces,
	indices: HashMap<String, DefaultNodeIdx>,
	links: Vec<(String, String)>,
	link_ids: HashSet<String>,
	alpha: f64,
	positions: Vec<NodePosition>,
	on_tick: Option<TickCallback>,
}

impl Simulation {
	pub fn new(options: &GraphOptions) -> Self {
		let forces = Forces::from_options(options);
		Self {
			graph: ForceGraph::new(forces.parameters()),
			forces,
			indices: HashMap::new(),
			links: Vec::new(),
			link_ids: HashSet::new(),
			alpha: 1.0,
			positions: Vec::new(),
			on_tick: None,
		}
	}

	pub fn forces(&self) -> &Forces {
		&self.forces
	}

	pub fn node_count(&self) -> usize {
		self.indices.len()
	}

	pub fn link_count(&self) -> usize {
		self.links.len()
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn is_running(&self) -> bool {
		self.alpha >= ALPHA_MIN
	}

	/// Rebuilds all four forces from `options`, keeping node positions.
	pub fn init(&mut self, options: &GraphOptions) {
		self.forces = Forces::from_options(options);

		let mut nodes = Vec::with_capacity(self.indices.len());
		self.graph.visit_nodes(|node| {
			nodes.push((node.data.user_data.clone(), node.x(), node.y(), node.data.is_anchor));
		});

		self.graph = ForceGraph::new(self.forces.parameters());
		self.indices.clear();
		for (mut info, x, y, is_anchor) in nodes {
			info.collide_radius = self.forces.collide.radius_for(info.name_len);
			let id = info.id.clone();
			let idx = self.graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: info,
			});
			self.indices.insert(id, idx);
		}
		for (source, target) in &self.links {
			if let (Some(&src), Some(&tgt)) = (self.indices.get(source), self.indices.get(target)) {
				self.graph.add_edge(src, tgt, EdgeData::default());
			}
		}
	}

	/// Adds nodes and links not yet in the simulation. Existing nodes keep
	/// their simulated positions.
	pub fn set_data(&mut self, nodes: &[GraphNode], links: &[GraphLink]) {
		for node in nodes {
			if self.indices.contains_key(&node.id) {
				continue;
			}
			let name_len = node.name_len();
			let (x, y) = node.fixed.map_or((node.x, node.y), |pin| (pin.x, pin.y));
			let idx = self.graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				mass: 10.0,
				is_anchor: node.fixed.is_some(),
				user_data: NodeInfo {
					id: node.id.clone(),
					name_len,
					collide_radius: self.forces.collide.radius_for(name_len),
				},
			});
			self.indices.insert(node.id.clone(), idx);
		}
		for link in links {
			if self.link_ids.contains(&link.id) {
				continue;
			}
			let (Some(&src), Some(&tgt)) = (self.indices.get(&link.source), self.indices.get(&link.target))
			else {
				continue;
			};
			self.graph.add_edge(src, tgt, EdgeData::default());
			self.links.push((link.source.clone(), link.target.clone()));
			self.link_ids.insert(link.id.clone());
		}
	}

	/// Re-reads the label size of a node whose record was replaced.
	pub fn refresh_node(&mut self, node: &GraphNode) {
		let name_len = node.name_len();
		let collide_radius = self.forces.collide.radius_for(name_len);
		self.update_node(&node.id, |data| {
			data.user_data.name_len = name_len;
			data.user_data.collide_radius = collide_radius;
		});
	}

	/// Reheats the layout from its current positions.
	pub fn restart(&mut self) {
		self.alpha = 1.0;
	}

	/// Registers the callback receiving positions after each tick, replacing
	/// any previous one.
	pub fn on_tick(&mut self, callback: impl FnMut(&[NodePosition]) + 'static) {
		self.on_tick = Some(Box::new(callback));
	}

	pub fn clear_on_tick(&mut self) {
		self.on_tick = None;
	}

	/// Advances the layout one step. Returns the new positions, or `None`
	/// once the layout has settled.
	pub fn tick(&mut self, dt: f32) -> Option<&[NodePosition]> {
		if !self.is_running() {
			return None;
		}
		self.alpha -= self.alpha * ALPHA_DECAY;

		self.graph.update(dt * self.alpha as f32);
		self.apply_collide();
		self.apply_center();

		self.positions.clear();
		let positions = &mut self.positions;
		self.graph.visit_nodes(|node| {
			positions.push(NodePosition {
				id: node.data.user_data.id.clone(),
				x: node.x() as f64,
				y: node.y() as f64,
			});
		});
		if let Some(callback) = self.on_tick.as_mut() {
			callback(&self.positions);
		}
		Some(&self.positions)
	}

	pub fn position(&self, id: &str) -> Option<Position> {
		let idx = *self.indices.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(Position::new(node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	pub fn collide_radius(&self, id: &str) -> Option<f64> {
		let idx = *self.indices.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(node.data.user_data.collide_radius);
			}
		});
		found
	}

	/// Fixes a node at `position`; forces no longer move it.
	pub fn pin(&mut self, id: &str, position: Position) {
		self.update_node(id, |data| {
			data.x = position.x as f32;
			data.y = position.y as f32;
			data.is_anchor = true;
		});
	}

	pub fn unpin(&mut self, id: &str) {
		self.update_node(id, |data| data.is_anchor = false);
	}

	/// Topmost node within `radius` of `point`.
	pub fn node_at(&self, point: Position, radius: f64) -> Option<String> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - point.x, node.y() as f64 - point.y);
			if (dx * dx + dy * dy).sqrt() < radius {
				found = Some(node.data.user_data.id.clone());
			}
		});
		found
	}

	fn update_node(&mut self, id: &str, mut update: impl FnMut(&mut NodeData<NodeInfo>)) {
		let Some(&idx) = self.indices.get(id) else {
			return;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				update(&mut node.data);
			}
		});
	}

	fn apply_collide(&mut self) {
		let mut bodies = Vec::with_capacity(self.indices.len());
		self.graph.visit_nodes(|node| {
			bodies.push((
				node.index(),
				node.x() as f64,
				node.y() as f64,
				node.data.user_data.collide_radius,
				node.data.is_anchor,
			));
		});

		let mut shifts: HashMap<DefaultNodeIdx, (f64, f64)> = HashMap::new();
		for (i, a) in bodies.iter().enumerate() {
			for b in &bodies[i + 1..] {
				let min_dist = a.3 + b.3;
				let (dx, dy) = (b.1 - a.1, b.2 - a.2);
				let dist_sq = dx * dx + dy * dy;
				if min_dist <= 0.0 || dist_sq >= min_dist * min_dist {
					continue;
				}
				let dist = dist_sq.sqrt();
				let (ux, uy) = if dist > 1e-9 { (dx / dist, dy / dist) } else { (1.0, 0.0) };
				let overlap = (min_dist - dist) * COLLIDE_STRENGTH;
				let (share_a, share_b) = match (a.4, b.4) {
					(true, true) => (0.0, 0.0),
					(true, false) => (0.0, 1.0),
					(false, true) => (1.0, 0.0),
					(false, false) => (0.5, 0.5),
				};
				let shift_a = shifts.entry(a.0).or_default();
				shift_a.0 -= ux * overlap * share_a;
				shift_a.1 -= uy * overlap * share_a;
				let shift_b = shifts.entry(b.0).or_default();
				shift_b.0 += ux * overlap * share_b;
				shift_b.1 += uy * overlap * share_b;
			}
		}
		if shifts.is_empty() {
			return;
		}
		self.graph.visit_nodes_mut(|node| {
			if let Some(&(sx, sy)) = shifts.get(&node.index()) {
				node.data.x += sx as f32;
				node.data.y += sy as f32;
			}
		});
	}

	fn apply_center(&mut self) {
		let (mut sum_x, mut sum_y, mut count) = (0.0, 0.0, 0usize);
		self.graph.visit_nodes(|node| {
			if !node.data.is_anchor {
				sum_x += node.x() as f64;
				sum_y += node.y() as f64;
				count += 1;
			}
		});
		if count == 0 {
			return;
		}
		let center = &self.forces.center;
		let (sx, sy) = (
			(center.x - sum_x / count as f64) as f32,
			(center.y - sum_y / count as f64) as f32,
		);
		self.graph.visit_nodes_mut(|node| {
			if !node.data.is_anchor {
				node.data.x += sx;
				node.data.y += sy;
			}
		});
	}
}
