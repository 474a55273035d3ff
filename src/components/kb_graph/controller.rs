//! Graph controller.
//!
//! Owns the graph collections together with the simulation, legend and
//! selection state, and applies every user action to them. The controller
//! never touches the network: a click that needs neighbors returns
//! [`ClickOutcome::Expand`], and the caller hands the response back through
//! [`GraphController::finish_expansion`].

use std::collections::HashSet;

use log::{debug, info, warn};
use serde_json::Value;

use super::expand::{GraphData, MergeReport, depth_budget, position_init};
use super::interaction::Selection;
use super::options::{ColorKey, GraphOptions, OptionChange};
use super::props_map::{DEFAULT_MAX_VALUE_LEN, PropsMap};
use super::simulation::{NodePosition, Simulation};
use super::types::{EdgeType, GraphLink, GraphNode, Position};
use crate::api::ApiError;

/// Neighbor hops fetched when expanding a node.
pub const EXPAND_NEIGHBORS: u32 = 3;

/// Notifications to the embedding page.
pub trait GraphEvents {
	/// A record was shown or its neighbors loaded.
	fn node_added(&mut self, _record: &Value) {}
	fn node_clicked(&mut self, _id: &str) {}
	/// An expansion finished, with the records it added.
	fn neighbors_expanded(&mut self, _root_id: &str, _records: &[Value]) {}
}

/// Logs every event.
#[derive(Debug, Default)]
pub struct LogEvents;

impl GraphEvents for LogEvents {
	fn node_added(&mut self, record: &Value) {
		debug!("kb-graph: node added {}", record.get("@rid").unwrap_or(&Value::Null));
	}

	fn node_clicked(&mut self, id: &str) {
		debug!("kb-graph: node clicked {id}");
	}

	fn neighbors_expanded(&mut self, root_id: &str, records: &[Value]) {
		info!("kb-graph: expanded {root_id} with {} records", records.len());
	}
}

/// What a click requires from the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
	/// Focus moved to the clicked node.
	Focused,
	/// Fetch the node with `neighbors` hops and pass it to
	/// [`GraphController::finish_expansion`].
	Expand { id: String, neighbors: u32 },
	/// Nothing to fetch.
	Acknowledged,
}

pub struct GraphController {
	pub data: GraphData,
	pub props: PropsMap,
	pub options: GraphOptions,
	pub selection: Selection,
	/// Option slot the color picker writes to.
	pub color_key: ColorKey,
	simulation: Simulation,
	edge_types: Vec<EdgeType>,
	pending: HashSet<String>,
	events: Box<dyn GraphEvents>,
	active: bool,
}

impl GraphController {
	pub fn new(options: GraphOptions, events: Box<dyn GraphEvents>) -> Self {
		Self {
			data: GraphData::default(),
			props: PropsMap::new(DEFAULT_MAX_VALUE_LEN),
			simulation: Simulation::new(&options),
			options,
			selection: Selection::default(),
			color_key: ColorKey::default(),
			edge_types: Vec::new(),
			pending: HashSet::new(),
			events,
			active: true,
		}
	}

	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	pub fn edge_types(&self) -> &[EdgeType] {
		&self.edge_types
	}

	/// Replaces the edge-class catalog and recomputes expandability.
	pub fn set_edge_types(&mut self, edge_types: Vec<EdgeType>) {
		self.edge_types = edge_types;
		self.data.refresh_expandable(&self.edge_types);
	}

	pub fn is_active(&self) -> bool {
		self.active
	}

	pub fn is_pending(&self, id: &str) -> bool {
		self.pending.contains(id)
	}

	fn center(&self) -> Position {
		Position::new(self.options.width / 2.0, self.options.height / 2.0)
	}

	/// Shows the `index`-th of `count` records requested on load, merging
	/// `depth` hops of its neighborhood. The first one takes focus.
	pub fn show_initial(
		&mut self,
		record: &Value,
		index: usize,
		count: usize,
		depth: u32,
	) -> MergeReport {
		if !self.active {
			return MergeReport::default();
		}
		let origin = if count > 1 {
			position_init(self.center(), index, count)
		} else {
			self.center()
		};
		let report = self.data.merge_record(record, origin, depth, &self.edge_types);
		if let Some(root) = report.root.as_deref() {
			if index == 0 {
				self.selection.focus(root, &self.data.links);
			}
			self.events.node_added(record);
		}
		self.absorb(&report);
		report
	}

	/// Handles a click on a node.
	///
	/// The first click focuses the node. Clicking the focused node again asks
	/// for its neighbors when some are still unloaded and no fetch for it is
	/// in flight.
	pub fn click(&mut self, id: &str) -> ClickOutcome {
		let Some(node) = self.data.node(id) else {
			return ClickOutcome::Acknowledged;
		};
		self.events.node_clicked(id);

		if !self.selection.is_focused(id) {
			self.selection.focus(id, &self.data.links);
			return ClickOutcome::Focused;
		}
		if self.pending.contains(id) {
			debug!("kb-graph: expansion of {id} already in flight");
			return ClickOutcome::Acknowledged;
		}
		if self.data.is_expandable(id) {
			self.pending.insert(id.to_string());
			return ClickOutcome::Expand {
				id: id.to_string(),
				neighbors: EXPAND_NEIGHBORS,
			};
		}
		let record = node.data.clone();
		self.events.node_added(&record);
		ClickOutcome::Acknowledged
	}

	/// Merges the response of an expansion started by [`Self::click`].
	/// Returns whether the graph changed. Failures leave it untouched.
	pub fn finish_expansion(&mut self, id: &str, response: Result<Value, ApiError>) -> bool {
		self.pending.remove(id);
		if !self.active {
			return false;
		}
		let record = match response {
			Ok(record) => record,
			Err(e) => {
				warn!("kb-graph: failed to expand {id}: {e}");
				return false;
			}
		};

		let origin = self
			.data
			.node(id)
			.map(GraphNode::position)
			.unwrap_or_else(|| self.center());
		let report = self.data.merge_record(
			&record,
			origin,
			depth_budget(EXPAND_NEIGHBORS),
			&self.edge_types,
		);
		if report.root.is_none() {
			return false;
		}
		self.selection.focus(id, &self.data.links);
		self.absorb(&report);

		let added: Vec<Value> = report
			.new_nodes
			.iter()
			.filter_map(|new| self.data.node(new))
			.map(|node| node.data.clone())
			.collect();
		self.events.node_added(&record);
		self.events.neighbors_expanded(id, &added);
		info!(
			"kb-graph: expanded {id}: +{} nodes, +{} links",
			report.new_nodes.len(),
			report.new_links.len()
		);
		true
	}

	/// Feeds a merge into the legend and the simulation.
	fn absorb(&mut self, report: &MergeReport) {
		for id in report.new_nodes.iter().chain(&report.updated) {
			if let Some(node) = self.data.node(id) {
				self.props.load_node(&node.data);
			}
		}
		for id in &report.updated {
			if let Some(node) = self.data.node(id) {
				self.simulation.refresh_node(node);
			}
		}
		for id in &report.new_links {
			if let Some(link) = self.data.link(id) {
				self.props.load_link(&link.data);
			}
		}
		if let Some(focused) = self.selection.expand_id.clone() {
			self.selection.focus(&focused, &self.data.links);
		}
		if !report.is_empty() {
			self.simulation.set_data(&self.data.nodes, &self.data.links);
			self.simulation.restart();
		}
	}

	/// Advances the layout and copies the new positions into the nodes.
	/// Returns `false` once the layout has settled.
	pub fn tick(&mut self, dt: f32) -> bool {
		let Some(positions) = self.simulation.tick(dt) else {
			return false;
		};
		for NodePosition { id, x, y } in positions {
			if let Some(node) = self.data.node_mut(id) {
				node.x = *x;
				node.y = *y;
			}
		}
		true
	}

	/// Registers a callback run after every simulation tick.
	pub fn on_tick(&mut self, callback: impl FnMut(&[NodePosition]) + 'static) {
		self.simulation.on_tick(callback);
	}

	/// Applies a toolbar edit, rebuilding the forces when it changes them.
	pub fn set_option(&mut self, change: OptionChange) {
		if self.options.apply(change) {
			self.simulation.init(&self.options);
			self.simulation.restart();
		}
	}

	/// Recenters the layout for a new viewport size.
	pub fn resize(&mut self, width: f64, height: f64) {
		if width == self.options.width && height == self.options.height {
			return;
		}
		self.options.width = width;
		self.options.height = height;
		self.simulation.init(&self.options);
		self.simulation.restart();
	}

	pub fn set_color_key(&mut self, key: ColorKey) {
		self.color_key = key;
	}

	/// Writes a picked color to the slot chosen by [`Self::color_key`].
	pub fn pick_color(&mut self, color: impl Into<String>) {
		self.options.set_color(self.color_key, color);
	}

	pub fn node_color(&self, node: &GraphNode) -> String {
		let legend = self
			.options
			.nodes_color
			.as_deref()
			.and_then(|path| self.props.nodes.color_of(path, &node.data));
		self.selection
			.color(&node.id, &self.options, legend.as_deref())
			.to_string()
	}

	/// Legend color of a link, `None` when links are not colored by property.
	pub fn link_color(&self, link: &GraphLink) -> Option<String> {
		let path = self.options.links_color.as_deref()?;
		self.props.links.color_of(path, &link.data)
	}

	/// Moves a node under the pointer and pins it there.
	pub fn drag_node(&mut self, id: &str, position: Position) {
		let Some(node) = self.data.node_mut(id) else {
			return;
		};
		node.x = position.x;
		node.y = position.y;
		node.fixed = Some(position);
		self.simulation.pin(id, position);
		self.simulation.restart();
	}

	/// Releases a pinned node back to the forces.
	pub fn release_node(&mut self, id: &str) {
		if let Some(node) = self.data.node_mut(id) {
			node.fixed = None;
			self.simulation.unpin(id);
			self.simulation.restart();
		}
	}

	/// Topmost node within `radius` of `point`.
	pub fn node_at(&self, point: Position, radius: f64) -> Option<String> {
		self.simulation.node_at(point, radius)
	}

	/// Stops reacting to responses and drops the tick callback.
	pub fn teardown(&mut self) {
		self.active = false;
		self.pending.clear();
		self.simulation.clear_on_tick();
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use serde_json::json;

	use super::*;

	#[derive(Default)]
	struct Recorded {
		added: Vec<String>,
		clicked: Vec<String>,
		expanded: Vec<(String, usize)>,
	}

	struct Recorder(Rc<RefCell<Recorded>>);

	impl GraphEvents for Recorder {
		fn node_added(&mut self, record: &Value) {
			let id = record["@rid"].as_str().unwrap_or_default().to_string();
			self.0.borrow_mut().added.push(id);
		}

		fn node_clicked(&mut self, id: &str) {
			self.0.borrow_mut().clicked.push(id.to_string());
		}

		fn neighbors_expanded(&mut self, root_id: &str, records: &[Value]) {
			self.0.borrow_mut().expanded.push((root_id.to_string(), records.len()));
		}
	}

	fn controller() -> (GraphController, Rc<RefCell<Recorded>>) {
		let recorded = Rc::new(RefCell::new(Recorded::default()));
		let mut options = GraphOptions::default();
		options.width = 400.0;
		options.height = 300.0;
		let mut controller = GraphController::new(options, Box::new(Recorder(recorded.clone())));
		controller.set_edge_types(vec![EdgeType::new("AliasOf"), EdgeType::new("SubClassOf")]);
		(controller, recorded)
	}

	fn alias_record() -> Value {
		json!({
			"@rid": "#1",
			"name": "A",
			"out_AliasOf": [{
				"@rid": "#10",
				"@class": "AliasOf",
				"in": { "@rid": "#1" },
				"out": { "@rid": "#2", "name": "B" },
			}],
		})
	}

	#[test]
	fn loads_and_clicks_without_fetching() {
		let (mut controller, recorded) = controller();
		controller.show_initial(&alias_record(), 0, 1, 1);

		assert_eq!(controller.data.nodes.len(), 2);
		assert_eq!(controller.data.links[0].kind, "alias");
		assert!(controller.selection.is_focused("#1"));
		assert_eq!(controller.simulation().node_count(), 2);
		assert_eq!(controller.props.nodes.colorable().count(), 1);

		assert_eq!(controller.click("#2"), ClickOutcome::Focused);
		assert_eq!(controller.click("#2"), ClickOutcome::Acknowledged);
		assert!(!controller.data.is_expandable("#2"));
		assert_eq!(recorded.borrow().clicked, ["#2", "#2"]);
		assert_eq!(recorded.borrow().added, ["#1", "#2"]);
	}

	#[test]
	fn expansion_round_trip() {
		let (mut controller, recorded) = controller();
		let record = json!({ "@rid": "#1", "name": "A", "in_SubClassOf": ["#20"] });
		controller.show_initial(&record, 0, 1, 2);
		assert!(controller.data.is_expandable("#1"));

		let expand = ClickOutcome::Expand {
			id: "#1".into(),
			neighbors: EXPAND_NEIGHBORS,
		};
		assert_eq!(controller.click("#1"), expand);
		assert!(controller.is_pending("#1"));
		assert_eq!(controller.click("#1"), ClickOutcome::Acknowledged);

		let response = json!({
			"@rid": "#1",
			"name": "A",
			"in_SubClassOf": [{
				"@rid": "#20",
				"out": { "@rid": "#3", "name": "C" },
				"in": { "@rid": "#1" },
			}],
		});
		assert!(controller.finish_expansion("#1", Ok(response)));
		assert!(!controller.is_pending("#1"));
		assert!(!controller.data.is_expandable("#1"));
		assert!(controller.selection.children.contains("#3"));
		assert_eq!(recorded.borrow().expanded, [("#1".to_string(), 1)]);
	}

	#[test]
	fn expanded_records_refresh_legend_and_collision() {
		let (mut controller, _) = controller();
		controller.set_option(OptionChange::AutoCollisionRadius(true));
		controller.set_option(OptionChange::NodesColor(Some("@class".into())));
		let record = json!({
			"@rid": "#1",
			"@class": "Concept",
			"out_AliasOf": [{
				"@rid": "#10",
				"in": { "@rid": "#1" },
				"out": { "@rid": "#2", "name": "B", "out_SubClassOf": ["#30"] },
			}],
		});
		controller.show_initial(&record, 0, 1, 1);
		assert_eq!(controller.simulation().collide_radius("#2"), Some(4.0));

		assert_eq!(controller.click("#2"), ClickOutcome::Focused);
		assert!(matches!(controller.click("#2"), ClickOutcome::Expand { .. }));
		let response = json!({
			"@rid": "#2",
			"@class": "Feature",
			"name": "Bee feature",
			"out_AliasOf": [{ "@rid": "#10", "in": { "@rid": "#1" }, "out": { "@rid": "#2" } }],
			"out_SubClassOf": [{
				"@rid": "#30",
				"out": { "@rid": "#2" },
				"in": { "@rid": "#4", "@class": "Feature", "name": "D" },
			}],
		});
		assert!(controller.finish_expansion("#2", Ok(response)));

		let b = controller.data.node("#2").unwrap().clone();
		assert!(controller.props.nodes.color_of("@class", &b.data).is_some());
		assert_eq!(controller.simulation().collide_radius("#2"), Some(11.0 * 2.8));
	}

	#[test]
	fn expansion_refocuses_on_expanded_node() {
		let (mut controller, _) = controller();
		controller.show_initial(&json!({ "@rid": "#1", "in_SubClassOf": ["#20"] }), 0, 2, 2);
		controller.show_initial(&json!({ "@rid": "#5" }), 1, 2, 2);
		assert!(matches!(controller.click("#1"), ClickOutcome::Expand { .. }));
		assert_eq!(controller.click("#5"), ClickOutcome::Focused);

		let response = json!({
			"@rid": "#1",
			"in_SubClassOf": [{ "@rid": "#20", "out": { "@rid": "#3" }, "in": { "@rid": "#1" } }],
		});
		assert!(controller.finish_expansion("#1", Ok(response)));
		assert!(controller.selection.is_focused("#1"));
		assert!(controller.selection.children.contains("#3"));
	}

	#[test]
	fn failed_expansion_leaves_graph_untouched() {
		let (mut controller, _) = controller();
		controller.show_initial(&json!({ "@rid": "#1", "in_SubClassOf": ["#20"] }), 0, 1, 2);
		controller.click("#1");

		let failure = ApiError::Status {
			url: "u".into(),
			status: 500,
		};
		assert!(!controller.finish_expansion("#1", Err(failure)));
		assert_eq!(controller.data.nodes.len(), 1);
		assert!(controller.data.is_expandable("#1"));
		assert!(matches!(controller.click("#1"), ClickOutcome::Expand { .. }));
	}

	#[test]
	fn late_responses_after_teardown_are_dropped() {
		let (mut controller, _) = controller();
		controller.show_initial(&json!({ "@rid": "#1", "in_SubClassOf": ["#20"] }), 0, 1, 2);
		controller.click("#1");
		controller.teardown();

		let response = json!({
			"@rid": "#1",
			"in_SubClassOf": [{ "@rid": "#20", "out": { "@rid": "#3" }, "in": { "@rid": "#1" } }],
		});
		assert!(!controller.finish_expansion("#1", Ok(response)));
		assert_eq!(controller.data.nodes.len(), 1);
	}

	#[test]
	fn initial_records_fan_out_from_center() {
		let (mut controller, _) = controller();
		controller.show_initial(&json!({ "@rid": "#1" }), 0, 2, 1);
		controller.show_initial(&json!({ "@rid": "#2" }), 1, 2, 1);

		let a = controller.data.node("#1").unwrap().position();
		let b = controller.data.node("#2").unwrap().position();
		assert_ne!(a, b);
		assert!(controller.selection.is_focused("#1"));
	}

	#[test]
	fn legend_color_replaces_default() {
		let (mut controller, _) = controller();
		controller.set_option(OptionChange::NodesColor(Some("name".into())));
		controller.show_initial(&alias_record(), 0, 2, 1);
		controller.show_initial(&json!({ "@rid": "#5", "name": "E" }), 1, 2, 1);

		let e = controller.data.node("#5").unwrap().clone();
		let legend = controller.props.nodes.color_of("name", &e.data).unwrap();
		assert_eq!(controller.node_color(&e), legend);
		assert_ne!(legend, controller.options.default_color);

		let b = controller.data.node("#2").unwrap().clone();
		assert_eq!(controller.node_color(&b), controller.options.aliases_color);

		controller.click("#5");
		assert_eq!(controller.node_color(&e), controller.options.selected_color);
	}

	#[test]
	fn color_picker_writes_selected_slot() {
		let (mut controller, _) = controller();
		controller.set_color_key(ColorKey::Aliases);
		controller.pick_color("#010203");
		assert_eq!(controller.options.aliases_color, "#010203");
		assert_eq!(controller.options.selected_color, "#D33115");
	}

	#[test]
	fn dragging_pins_until_released() {
		let (mut controller, _) = controller();
		controller.show_initial(&alias_record(), 0, 1, 1);
		controller.drag_node("#2", Position::new(10.0, 20.0));
		for _ in 0..5 {
			controller.tick(1.0);
		}
		let node = controller.data.node("#2").unwrap();
		assert_eq!(node.fixed, Some(Position::new(10.0, 20.0)));
		assert_eq!(node.position(), Position::new(10.0, 20.0));

		controller.release_node("#2");
		assert_eq!(controller.data.node("#2").unwrap().fixed, None);
	}

	#[test]
	fn force_options_restart_the_layout() {
		let (mut controller, _) = controller();
		controller.show_initial(&alias_record(), 0, 1, 1);
		while controller.tick(1.0) {}
		assert!(!controller.simulation().is_running());

		controller.set_option(OptionChange::ChargeStrength(30.0));
		assert!(controller.simulation().is_running());
		controller.set_option(OptionChange::NodeLabel("@class".into()));
		assert_eq!(controller.options.node_label, "@class");
	}
}
