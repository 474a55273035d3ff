//! Graph record model: nodes and links built from raw API records.
//!
//! Records arrive as loosely-typed JSON (`serde_json::Value`) since their
//! schema varies by class. The helpers here pull out the few fields the graph
//! cares about: the `@rid` identifier, the `@class` name, and dot-path
//! property lookups used for labels and legends.

use serde::Deserialize;
use serde_json::Value;

/// Field carrying a record's unique identifier.
pub const RID: &str = "@rid";
/// Field carrying a record's class name.
pub const CLASS: &str = "@class";
/// Endpoint class that is never treated as a navigable neighbor.
pub const STATEMENT_CLASS: &str = "Statement";

/// Identifier of a full record object (`{"@rid": "#1", ...}`).
pub fn record_id(record: &Value) -> Option<&str> {
	record
		.get(RID)
		.and_then(Value::as_str)
		.filter(|rid| !rid.is_empty())
}

/// Identifier of an edge list entry, which is either a full edge record or a
/// bare id string when the server did not expand it.
pub fn entry_id(entry: &Value) -> Option<&str> {
	match entry {
		Value::String(rid) if !rid.is_empty() => Some(rid),
		Value::Object(_) => record_id(entry),
		_ => None,
	}
}

pub fn record_class(record: &Value) -> Option<&str> {
	record.get(CLASS).and_then(Value::as_str)
}

/// Looks up a dot-separated property path, e.g. `source.name`.
pub fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
	path.split('.')
		.try_fold(record, |value, key| value.get(key))
		.filter(|value| !value.is_null())
}

/// Display text of a scalar value. Objects, arrays and null have none.
pub fn value_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

/// Short link type label derived from an edge class name.
///
/// `AliasOf` becomes `alias`, `SubClassOf` becomes `subclass`, classes
/// without an `Of` suffix are simply lower-cased.
pub fn edge_type_label(class_name: &str) -> String {
	class_name
		.split("Of")
		.next()
		.unwrap_or(class_name)
		.to_lowercase()
}

/// An edge class from the schema catalog.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct EdgeType {
	pub name: String,
}

impl EdgeType {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}

	/// Record fields holding edges of this class, incoming first.
	pub fn fields(&self) -> [String; 2] {
		[format!("in_{}", self.name), format!("out_{}", self.name)]
	}
}

/// Layout coordinates in simulation space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

impl Position {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// A rendered record.
#[derive(Clone, Debug)]
pub struct GraphNode {
	pub id: String,
	/// Raw record as returned by the API, edge collections included.
	pub data: Value,
	pub x: f64,
	pub y: f64,
	/// Pinned position set by dragging. Pinned nodes ignore forces.
	pub fixed: Option<Position>,
}

impl GraphNode {
	/// Wraps a record, or `None` when it has no usable id.
	pub fn new(data: Value, position: Position) -> Option<Self> {
		let id = record_id(&data)?.to_string();
		Some(Self {
			id,
			data,
			x: position.x,
			y: position.y,
			fixed: None,
		})
	}

	pub fn position(&self) -> Position {
		Position::new(self.x, self.y)
	}

	/// Label text for the given property path.
	pub fn label(&self, key: &str) -> Option<String> {
		lookup_path(&self.data, key).and_then(value_text)
	}

	/// Character count of the record's `name`, zero when absent.
	pub fn name_len(&self) -> usize {
		self.data
			.get("name")
			.and_then(Value::as_str)
			.map_or(0, |name| name.chars().count())
	}
}

/// A rendered edge. `source` is the edge's `out` vertex, `target` its `in`.
#[derive(Clone, Debug)]
pub struct GraphLink {
	pub id: String,
	pub source: String,
	pub target: String,
	/// Display type, e.g. `alias` or `subclass`.
	pub kind: String,
	/// Raw edge record.
	pub data: Value,
}

impl GraphLink {
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}

	pub fn is_alias(&self) -> bool {
		self.kind == "alias"
	}
}

/// Entry of the id registry: index into the node or link collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphObject {
	Node(usize),
	Link(usize),
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn entry_id_accepts_bare_ids_and_records() {
		assert_eq!(entry_id(&json!("#12:3")), Some("#12:3"));
		assert_eq!(entry_id(&json!({ "@rid": "#5:0" })), Some("#5:0"));
		assert_eq!(entry_id(&json!({ "name": "orphan" })), None);
		assert_eq!(entry_id(&json!("")), None);
		assert_eq!(entry_id(&json!(42)), None);
	}

	#[test]
	fn lookup_path_follows_nested_objects() {
		let record = json!({ "name": "kras", "source": { "name": "hgnc" }, "deprecated": null });
		assert_eq!(lookup_path(&record, "source.name"), Some(&json!("hgnc")));
		assert_eq!(lookup_path(&record, "source.url"), None);
		assert_eq!(lookup_path(&record, "deprecated"), None);
	}

	#[test]
	fn edge_type_labels() {
		assert_eq!(edge_type_label("AliasOf"), "alias");
		assert_eq!(edge_type_label("SubClassOf"), "subclass");
		assert_eq!(edge_type_label("Infers"), "infers");
	}

	#[test]
	fn node_requires_an_id() {
		assert!(GraphNode::new(json!({ "name": "no id" }), Position::default()).is_none());
		let node = GraphNode::new(json!({ "@rid": "#1", "name": "BRCA1" }), Position::new(3.0, 4.0))
			.unwrap();
		assert_eq!(node.id, "#1");
		assert_eq!(node.position(), Position::new(3.0, 4.0));
		assert_eq!(node.name_len(), 5);
		assert_eq!(node.label("name").as_deref(), Some("BRCA1"));
	}
}
