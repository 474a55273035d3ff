//! Legend tracking for property-based coloring.
//!
//! For every displayable property of the rendered records, the [`PropsMap`]
//! remembers the distinct values seen so far in first-seen order. Colors are
//! assigned by position in that list, so a value keeps its color as the graph
//! grows. Free-text properties would flood the legend, so a property is
//! dropped for good once any of its values reaches the length threshold.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::theme::{MISSING_VALUE_COLOR, Palette};
use super::types::{RID, lookup_path, value_text};

/// Values at or above this many characters exclude their property.
pub const DEFAULT_MAX_VALUE_LEN: usize = 50;

/// Property exempt from the length threshold.
const LABEL_PROPERTY: &str = "name";

/// Fields never offered as legend properties.
const SKIPPED_FIELDS: &[&str] = &[RID, "@version", "in", "out"];

/// One legend entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropValue {
	Value(String),
	/// The record lacks the property.
	Missing,
}

impl PropValue {
	/// Reads the value at `path` from a record.
	pub fn of(record: &Value, path: &str) -> Self {
		lookup_path(record, path)
			.and_then(value_text)
			.filter(|text| !text.is_empty())
			.map_or(PropValue::Missing, PropValue::Value)
	}

	pub fn label(&self) -> &str {
		match self {
			PropValue::Value(text) => text,
			PropValue::Missing => "null",
		}
	}
}

/// Distinct values of one property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropValues {
	/// Permanently removed from the legend.
	Excluded,
	Values(Vec<PropValue>),
}

/// Legend row: a value and its assigned color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendEntry {
	pub value: PropValue,
	pub color: String,
}

/// Distinct property values for one kind of graph object.
#[derive(Clone, Debug)]
pub struct PropTable {
	props: BTreeMap<String, PropValues>,
	max_value_len: usize,
	loaded: usize,
	palette: Palette,
}

impl Default for PropTable {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_VALUE_LEN)
	}
}

impl PropTable {
	pub fn new(max_value_len: usize) -> Self {
		Self {
			props: BTreeMap::new(),
			max_value_len,
			loaded: 0,
			palette: Palette::legend(),
		}
	}

	pub fn get(&self, path: &str) -> Option<&PropValues> {
		self.props.get(path)
	}

	/// Properties that can still be used for coloring.
	pub fn colorable(&self) -> impl Iterator<Item = &str> {
		self.props
			.iter()
			.filter(|(_, values)| matches!(values, PropValues::Values(_)))
			.map(|(path, _)| path.as_str())
	}

	/// Records the property values of one record.
	pub fn load(&mut self, record: &Value) {
		let mut paths: BTreeSet<String> = self.props.keys().cloned().collect();
		paths.extend(property_paths(record));

		for path in paths {
			let leaf = path.rsplit('.').next().unwrap_or(&path);
			let value = PropValue::of(record, &path);
			let too_long = matches!(&value, PropValue::Value(text)
				if text.chars().count() >= self.max_value_len && leaf != LABEL_PROPERTY);

			if too_long {
				self.props.insert(path, PropValues::Excluded);
				continue;
			}
			match self.props.get_mut(&path) {
				Some(PropValues::Excluded) => {}
				Some(PropValues::Values(values)) => {
					if !values.contains(&value) {
						values.push(value);
					}
				}
				None => {
					if let PropValue::Value(_) = value {
						// Records loaded before this one lacked the property.
						let values = if self.loaded > 0 {
							vec![PropValue::Missing, value]
						} else {
							vec![value]
						};
						self.props.insert(path, PropValues::Values(values));
					}
				}
			}
		}
		self.loaded += 1;
	}

	/// Legend rows for `path`, empty if the property is unknown or excluded.
	pub fn legend(&self, path: &str) -> Vec<LegendEntry> {
		let Some(PropValues::Values(values)) = self.props.get(path) else {
			return Vec::new();
		};
		values
			.iter()
			.enumerate()
			.map(|(i, value)| LegendEntry {
				value: value.clone(),
				color: self.color_at(i, value),
			})
			.collect()
	}

	/// Legend color of a record's value for `path`.
	pub fn color_of(&self, path: &str, record: &Value) -> Option<String> {
		let Some(PropValues::Values(values)) = self.props.get(path) else {
			return None;
		};
		let value = PropValue::of(record, path);
		values
			.iter()
			.position(|known| *known == value)
			.map(|i| self.color_at(i, &value))
	}

	fn color_at(&self, index: usize, value: &PropValue) -> String {
		match value {
			PropValue::Missing => MISSING_VALUE_COLOR.to_string(),
			PropValue::Value(_) => self.palette.get(index).to_css_rgb(),
		}
	}
}

/// Legend state for rendered nodes and links.
#[derive(Clone, Debug, Default)]
pub struct PropsMap {
	pub nodes: PropTable,
	pub links: PropTable,
}

impl PropsMap {
	pub fn new(max_value_len: usize) -> Self {
		Self {
			nodes: PropTable::new(max_value_len),
			links: PropTable::new(max_value_len),
		}
	}

	pub fn load_node(&mut self, record: &Value) {
		self.nodes.load(record);
	}

	pub fn load_link(&mut self, record: &Value) {
		self.links.load(record);
	}
}

/// Scalar property paths of a record: top-level fields and one level of
/// nesting (`source.name`). Edge collections and arrays are skipped.
fn property_paths(record: &Value) -> Vec<String> {
	let Some(fields) = record.as_object() else {
		return Vec::new();
	};
	let mut paths = Vec::new();
	for (key, value) in fields {
		if SKIPPED_FIELDS.contains(&key.as_str()) || key.starts_with("in_") || key.starts_with("out_")
		{
			continue;
		}
		match value {
			Value::Object(nested) => paths.extend(
				nested
					.iter()
					.filter(|(sub, sub_value)| {
						!SKIPPED_FIELDS.contains(&sub.as_str()) && value_text(sub_value).is_some()
					})
					.map(|(sub, _)| format!("{key}.{sub}")),
			),
			Value::Array(_) | Value::Null => {}
			_ => paths.push(key.clone()),
		}
	}
	paths
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn values(table: &PropTable, path: &str) -> Vec<String> {
		match table.get(path) {
			Some(PropValues::Values(values)) => values.iter().map(|v| v.label().to_string()).collect(),
			other => panic!("expected values for {path}, got {other:?}"),
		}
	}

	#[test]
	fn tracks_distinct_values_in_order() {
		let mut map = PropsMap::default();
		map.load_node(&json!({ "@rid": "#1", "name": "hello", "source": { "name": "test source" } }));
		map.load_node(&json!({ "@rid": "#2", "name": "goodbye", "sourceId": "test source ID" }));
		map.load_node(&json!({ "@rid": "#3", "name": "hello" }));

		assert_eq!(values(&map.nodes, "name"), ["hello", "goodbye"]);
		assert_eq!(values(&map.nodes, "source.name"), ["test source", "null"]);
		assert_eq!(values(&map.nodes, "sourceId"), ["null", "test source ID"]);
		assert!(map.nodes.get("@rid").is_none());
	}

	#[test]
	fn long_values_exclude_property() {
		let long = "x".repeat(DEFAULT_MAX_VALUE_LEN);
		let mut map = PropsMap::default();
		map.load_node(&json!({ "@rid": "#1", "description": "short", "name": "a" }));
		map.load_node(&json!({ "@rid": "#2", "description": long, "name": long }));
		map.load_node(&json!({ "@rid": "#3", "description": "tiny", "name": "b" }));

		assert_eq!(map.nodes.get("description"), Some(&PropValues::Excluded));
		assert_eq!(values(&map.nodes, "name").len(), 3);
		assert!(map.nodes.legend("description").is_empty());
		assert_eq!(map.nodes.colorable().collect::<Vec<_>>(), ["name"]);
	}

	#[test]
	fn colors_are_stable_as_values_arrive() {
		let mut map = PropsMap::default();
		let a = json!({ "@rid": "#1", "@class": "Disease" });
		let b = json!({ "@rid": "#2", "@class": "Feature" });
		map.load_node(&a);
		let before = map.nodes.color_of("@class", &a);
		map.load_node(&b);
		map.load_node(&json!({ "@rid": "#3" }));

		assert_eq!(map.nodes.color_of("@class", &a), before);
		assert_ne!(map.nodes.color_of("@class", &b), before);
		assert_eq!(
			map.nodes.color_of("@class", &json!({ "@rid": "#3" })).as_deref(),
			Some(MISSING_VALUE_COLOR)
		);
		let legend = map.nodes.legend("@class");
		assert_eq!(legend.len(), 3);
		assert_eq!(legend[2].value, PropValue::Missing);
	}

	#[test]
	fn links_are_tracked_separately() {
		let mut map = PropsMap::default();
		map.load_link(&json!({ "@rid": "#10", "@class": "AliasOf", "in": "#1", "out": "#2" }));
		assert_eq!(values(&map.links, "@class"), ["AliasOf"]);
		assert!(map.links.get("in").is_none());
		assert!(map.nodes.get("@class").is_none());
	}
}
