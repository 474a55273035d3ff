//! Incremental graph expansion.
//!
//! API records embed their relationships as `in_<Edge>`/`out_<Edge>` lists.
//! Within the requested neighbor depth each edge entry is a full edge record
//! whose `in`/`out` endpoints are full records themselves; past that depth the
//! server only returns ids. [`GraphData::merge_record`] walks these embedded
//! edges breadth-first, adding every node and link it has not seen before,
//! and afterwards flags the nodes whose neighborhoods are still incomplete.

use std::collections::{HashMap, VecDeque};
use std::f64::consts::PI;

use log::{debug, warn};
use serde_json::{Map, Value};

use super::types::{
	EdgeType, GraphLink, GraphNode, GraphObject, Position, STATEMENT_CLASS, edge_type_label,
	entry_id, record_class, record_id,
};

/// Distance from the parent at which newly discovered nodes are placed.
pub const NODE_INIT_RADIUS: f64 = 55.0;

/// Initial position of the `i`-th of `n` siblings fanned out around `parent`.
pub fn position_init(parent: Position, i: usize, n: usize) -> Position {
	let angle = (2.0 * PI * i as f64 - PI / 6.0) / n.max(1) as f64;
	Position::new(
		parent.x + NODE_INIT_RADIUS * angle.cos(),
		parent.y + NODE_INIT_RADIUS * angle.sin(),
	)
}

/// Merge depth for a response fetched with `neighbors` hops.
///
/// Every hop in the API's neighbor radius counts both the edge and the vertex
/// records, so a fetch with `neighbors = 4` holds three full vertex hops.
pub fn depth_budget(neighbors: u32) -> u32 {
	neighbors / 2 + 1
}

/// What a single merge changed in the graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
	/// Id of the merged root record, `None` if it could not be merged.
	pub root: Option<String>,
	pub new_nodes: Vec<String>,
	pub new_links: Vec<String>,
	/// Nodes already displayed whose data was replaced.
	pub updated: Vec<String>,
}

impl MergeReport {
	pub fn is_empty(&self) -> bool {
		self.new_nodes.is_empty() && self.new_links.is_empty() && self.updated.is_empty()
	}
}

/// Node and link collections of one graph view.
#[derive(Clone, Debug, Default)]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
	/// Every rendered id, node or link.
	pub graph_objects: HashMap<String, GraphObject>,
	/// Nodes whose neighbors are not all loaded.
	pub expandable: HashMap<String, bool>,
}

impl GraphData {
	pub fn contains(&self, id: &str) -> bool {
		self.graph_objects.contains_key(id)
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		match self.graph_objects.get(id)? {
			GraphObject::Node(idx) => self.nodes.get(*idx),
			GraphObject::Link(_) => None,
		}
	}

	pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
		match self.graph_objects.get(id)? {
			GraphObject::Node(idx) => self.nodes.get_mut(*idx),
			GraphObject::Link(_) => None,
		}
	}

	pub fn link(&self, id: &str) -> Option<&GraphLink> {
		match self.graph_objects.get(id)? {
			GraphObject::Link(idx) => self.links.get(*idx),
			GraphObject::Node(_) => None,
		}
	}

	pub fn is_expandable(&self, id: &str) -> bool {
		self.expandable.get(id).copied().unwrap_or(false)
	}

	/// Drops every node and link.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.links.clear();
		self.graph_objects.clear();
		self.expandable.clear();
	}

	/// Merges `record` and the neighbors embedded in it, at most `depth` hops
	/// out from the record itself.
	///
	/// A record that is already displayed has its data replaced, since a
	/// neighbor fetch returns a fuller copy than the one it was discovered
	/// through. Merging the same response twice is a no-op.
	pub fn merge_record(
		&mut self,
		record: &Value,
		origin: Position,
		depth: u32,
		edge_types: &[EdgeType],
	) -> MergeReport {
		let mut report = MergeReport::default();
		let Some(root_id) = record_id(record) else {
			warn!("kb-graph: skipping record without {}", super::types::RID);
			return report;
		};

		match self.graph_objects.get(root_id).copied() {
			Some(GraphObject::Node(idx)) => {
				if self.nodes[idx].data != *record {
					self.nodes[idx].data = record.clone();
					report.updated.push(root_id.to_string());
				}
			}
			Some(GraphObject::Link(_)) => {
				warn!("kb-graph: record {root_id} is already displayed as a link");
				return report;
			}
			None => {
				if let Some(node) = GraphNode::new(record.clone(), origin) {
					report.new_nodes.push(node.id.clone());
					self.insert_node(node);
				}
			}
		}
		report.root = Some(root_id.to_string());

		let mut queue = VecDeque::from([(record.clone(), origin, depth)]);
		while let Some((current, position, depth)) = queue.pop_front() {
			for edge_type in edge_types {
				let entries: Vec<&Value> = edge_type
					.fields()
					.iter()
					.filter_map(|field| current.get(field).and_then(Value::as_array))
					.flatten()
					.collect();
				// One fan per edge class, shared by its in_ and out_ fields.
				let n = entries.len();
				let mut j = 0;

				for entry in entries {
					let Some(edge_id) = entry_id(entry) else {
						continue;
					};
					if self.contains(edge_id) || depth == 0 {
						continue;
					}
					let (Some(out), Some(inn)) = (full_endpoint(entry, "out"), full_endpoint(entry, "in"))
					else {
						continue;
					};

					for endpoint in [out, inn] {
						let Some(endpoint_id) = record_id(endpoint) else {
							continue;
						};
						if self.contains(endpoint_id) {
							continue;
						}
						j += 1;
						let init = position_init(position, j, n);
						if let Some(node) = GraphNode::new(endpoint.clone(), init) {
							report.new_nodes.push(node.id.clone());
							self.insert_node(node);
							queue.push_back((endpoint.clone(), init, depth - 1));
						}
					}

					let (Some(source), Some(target)) = (record_id(out), record_id(inn)) else {
						continue;
					};
					let link = GraphLink {
						id: edge_id.to_string(),
						source: source.to_string(),
						target: target.to_string(),
						kind: edge_type_label(&edge_type.name),
						data: shallow_edge(entry),
					};
					report.new_links.push(link.id.clone());
					self.insert_link(link);
				}
			}
		}

		self.refresh_expandable(edge_types);
		debug!(
			"kb-graph: merged {root_id}: +{} nodes, +{} links",
			report.new_nodes.len(),
			report.new_links.len()
		);
		report
	}

	/// Recomputes the expandable flag of every node from its current data.
	pub fn refresh_expandable(&mut self, edge_types: &[EdgeType]) {
		let flags: Vec<(String, bool)> = self
			.nodes
			.iter()
			.map(|node| (node.id.clone(), self.has_unloaded_edges(&node.data, edge_types)))
			.collect();
		self.expandable.extend(flags);
	}

	/// Whether `record` references an edge not yet displayed. Edges into or
	/// out of statements do not count.
	fn has_unloaded_edges(&self, record: &Value, edge_types: &[EdgeType]) -> bool {
		edge_types
			.iter()
			.flat_map(EdgeType::fields)
			.filter_map(|field| record.get(&field).and_then(Value::as_array))
			.any(|entries| entries.iter().any(|entry| self.is_unloaded(entry)))
	}

	fn is_unloaded(&self, entry: &Value) -> bool {
		let Some(edge_id) = entry_id(entry) else {
			return false;
		};
		let statement = ["in", "out"].iter().any(|side| {
			entry
				.get(side)
				.and_then(record_class)
				.is_some_and(|class| class == STATEMENT_CLASS)
		});
		!self.contains(edge_id) && !statement
	}

	fn insert_node(&mut self, node: GraphNode) {
		self.graph_objects
			.insert(node.id.clone(), GraphObject::Node(self.nodes.len()));
		self.nodes.push(node);
	}

	fn insert_link(&mut self, link: GraphLink) {
		self.graph_objects
			.insert(link.id.clone(), GraphObject::Link(self.links.len()));
		self.links.push(link);
	}
}

/// Endpoint record on `side` of an edge entry, if the server expanded it.
fn full_endpoint<'a>(entry: &'a Value, side: &str) -> Option<&'a Value> {
	entry.get(side).filter(|endpoint| record_id(endpoint).is_some())
}

/// Copy of an edge record with its endpoints collapsed to their ids.
fn shallow_edge(entry: &Value) -> Value {
	let Some(fields) = entry.as_object() else {
		return entry.clone();
	};
	let collapsed: Map<String, Value> = fields
		.iter()
		.map(|(key, value)| {
			let value = match key.as_str() {
				"in" | "out" => record_id(value).map_or(Value::Null, Value::from),
				_ => value.clone(),
			};
			(key.clone(), value)
		})
		.collect();
	Value::Object(collapsed)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn edge_types() -> Vec<EdgeType> {
		vec![EdgeType::new("AliasOf"), EdgeType::new("SubClassOf")]
	}

	fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
		items.iter().map(|item| id(item).to_string()).collect()
	}

	/// `#0 -> #1 -> ... -> #len` linked by `SubClassOf`, fully embedded.
	fn chain(k: usize, len: usize) -> Value {
		let mut record = json!({ "@rid": format!("#{k}"), "name": format!("node {k}") });
		if k < len {
			record["out_SubClassOf"] = json!([{
				"@rid": format!("#e{k}"),
				"out": { "@rid": format!("#{k}") },
				"in": chain(k + 1, len),
			}]);
		}
		record
	}

	#[test]
	fn merges_alias_example() {
		let record = json!({
			"@rid": "#1",
			"name": "A",
			"out_AliasOf": [{ "@rid": "#10", "in": { "@rid": "#1" }, "out": { "@rid": "#2", "name": "B" } }],
		});
		let mut data = GraphData::default();
		let report = data.merge_record(&record, Position::default(), 1, &edge_types());

		assert_eq!(ids(&data.nodes, |n| &n.id), ["#1", "#2"]);
		assert_eq!(ids(&data.links, |l| &l.id), ["#10"]);
		assert_eq!(data.links[0].kind, "alias");
		assert_eq!(data.links[0].source, "#2");
		assert_eq!(data.links[0].target, "#1");
		assert_eq!(report.new_nodes, ["#1", "#2"]);
		assert_eq!(data.expandable.get("#1"), Some(&false));
		assert_eq!(data.expandable.get("#2"), Some(&false));
	}

	#[test]
	fn merge_is_idempotent() {
		let record = chain(0, 3);
		let mut data = GraphData::default();
		data.merge_record(&record, Position::default(), 5, &edge_types());
		let (nodes, links) = (ids(&data.nodes, |n| &n.id), ids(&data.links, |l| &l.id));
		let objects = data.graph_objects.clone();

		let again = data.merge_record(&record, Position::default(), 5, &edge_types());
		assert!(again.is_empty());
		assert_eq!(ids(&data.nodes, |n| &n.id), nodes);
		assert_eq!(ids(&data.links, |l| &l.id), links);
		assert_eq!(data.graph_objects, objects);
	}

	#[test]
	fn links_are_deduplicated_across_paths() {
		let shared = json!({ "@rid": "#e5", "out": { "@rid": "#1" }, "in": { "@rid": "#2", "name": "B" } });
		let record = json!({
			"@rid": "#1",
			"out_SubClassOf": [shared.clone()],
			"out_AliasOf": [{
				"@rid": "#e6",
				"out": { "@rid": "#1" },
				"in": { "@rid": "#3", "out_SubClassOf": [shared.clone()], "in_SubClassOf": [shared] },
			}],
		});
		let mut data = GraphData::default();
		data.merge_record(&record, Position::default(), 3, &edge_types());

		assert_eq!(data.links.iter().filter(|l| l.id == "#e5").count(), 1);
		assert_eq!(data.nodes.len(), 3);
	}

	#[test]
	fn depth_budget_bounds_recursion() {
		assert_eq!(depth_budget(4), 3);
		assert_eq!(depth_budget(3), 2);
		assert_eq!(depth_budget(0), 1);

		let mut data = GraphData::default();
		data.merge_record(&chain(0, 6), Position::default(), depth_budget(4), &edge_types());

		assert_eq!(ids(&data.nodes, |n| &n.id), ["#0", "#1", "#2", "#3"]);
		assert_eq!(ids(&data.links, |l| &l.id), ["#e0", "#e1", "#e2"]);
		assert!(data.is_expandable("#3"));
		assert!(!data.is_expandable("#2"));
	}

	#[test]
	fn expandable_clears_once_neighbors_load() {
		let mut data = GraphData::default();
		data.merge_record(&chain(0, 3), Position::default(), 1, &edge_types());
		assert!(data.is_expandable("#1"));

		let neighborhood = chain(1, 3);
		data.merge_record(&neighborhood, Position::new(10.0, 0.0), depth_budget(3), &edge_types());
		assert!(!data.is_expandable("#1"));
		assert!(!data.is_expandable("#3"));

		data.merge_record(&neighborhood, Position::new(10.0, 0.0), depth_budget(3), &edge_types());
		assert!(!data.is_expandable("#1"));
	}

	#[test]
	fn replaced_roots_are_reported() {
		let mut data = GraphData::default();
		data.merge_record(&chain(0, 1), Position::default(), 1, &edge_types());

		let fuller = json!({ "@rid": "#1", "@class": "Feature", "name": "node 1" });
		let report = data.merge_record(&fuller, Position::default(), 1, &edge_types());
		assert_eq!(report.updated, ["#1"]);
		assert!(report.new_nodes.is_empty());
		assert_eq!(data.node("#1").unwrap().data["@class"], "Feature");

		let again = data.merge_record(&fuller, Position::default(), 1, &edge_types());
		assert!(again.is_empty());
	}

	#[test]
	fn bare_ids_and_statements() {
		let record = json!({
			"@rid": "#1",
			"out_SubClassOf": ["#e1"],
			"in_AliasOf": [{ "@rid": "#e2", "out": { "@rid": "#9", "@class": "Statement" }, "in": "#1" }],
		});
		let mut data = GraphData::default();
		data.merge_record(&record, Position::default(), 2, &edge_types());
		assert_eq!(data.nodes.len(), 1);
		assert!(data.links.is_empty());
		assert!(data.is_expandable("#1"));

		let statements_only = json!({
			"@rid": "#4",
			"in_AliasOf": [{ "@rid": "#e3", "out": { "@rid": "#9", "@class": "Statement" }, "in": "#4" }],
		});
		data.merge_record(&statements_only, Position::default(), 2, &edge_types());
		assert!(!data.is_expandable("#4"));
	}

	#[test]
	fn malformed_records_are_skipped() {
		let mut data = GraphData::default();
		let report = data.merge_record(&json!({ "name": "no id" }), Position::default(), 2, &edge_types());
		assert_eq!(report.root, None);
		assert!(data.nodes.is_empty());

		let record = json!({
			"@rid": "#1",
			"out_SubClassOf": [{ "out": { "@rid": "#1" }, "in": { "@rid": "#2" } }],
		});
		data.merge_record(&record, Position::default(), 2, &edge_types());
		assert_eq!(data.nodes.len(), 1);
		assert!(!data.is_expandable("#1"));
	}

	#[test]
	fn refetched_root_replaces_data() {
		let mut data = GraphData::default();
		data.merge_record(&json!({ "@rid": "#1", "name": "old" }), Position::default(), 1, &[]);
		data.merge_record(&json!({ "@rid": "#1", "name": "new" }), Position::default(), 1, &[]);
		assert_eq!(data.nodes.len(), 1);
		assert_eq!(data.node("#1").and_then(|n| n.label("name")).as_deref(), Some("new"));
	}

	#[test]
	fn siblings_fan_out_deterministically() {
		let parent = Position::new(100.0, 50.0);
		let a = position_init(parent, 1, 4);
		assert_eq!(a, position_init(parent, 1, 4));
		assert_ne!(a, position_init(parent, 2, 4));
		let dist = ((a.x - parent.x).powi(2) + (a.y - parent.y).powi(2)).sqrt();
		assert!((dist - NODE_INIT_RADIUS).abs() < 1e-9);
	}
}
