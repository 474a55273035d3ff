//! Page-supplied configuration.
//!
//! The host page embeds a JSON object in
//! `<script type="application/json" id="graph-config">`. Every key is
//! optional.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

use crate::components::kb_graph::expand::depth_budget;
use crate::components::kb_graph::options::GraphOptions;
use crate::components::kb_graph::types::EdgeType;

/// Id of the script element holding the configuration.
pub const CONFIG_ELEMENT_ID: &str = "graph-config";

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
	/// API root, e.g. `http://localhost:8080/api`.
	pub api_base: String,
	pub record_route: String,
	/// Record focused on load.
	pub selected_id: Option<String>,
	/// Records shown on load besides the selected one.
	pub displayed: Vec<String>,
	/// Neighbor hops fetched for the records shown on load.
	pub neighbors: u32,
	/// Records already in hand, keyed by id. These are shown without a fetch.
	pub records: BTreeMap<String, Value>,
	/// Edge classes. When absent they are read from the schema endpoint.
	pub edge_types: Option<Vec<EdgeType>>,
	pub graph_options: GraphOptions,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			api_base: String::new(),
			record_route: "/records".into(),
			selected_id: None,
			displayed: Vec::new(),
			neighbors: 3,
			records: BTreeMap::new(),
			edge_types: None,
			graph_options: GraphOptions::default(),
		}
	}
}

impl GraphConfig {
	pub fn from_json(text: &str) -> serde_json::Result<Self> {
		serde_json::from_str(text)
	}

	/// Reads the configuration element, falling back to defaults when it is
	/// missing or invalid.
	pub fn load() -> Self {
		let Some(text) = config_text() else {
			info!("kb-graph: no #{CONFIG_ELEMENT_ID} element, using defaults");
			return Self::default();
		};
		match Self::from_json(&text) {
			Ok(config) => {
				info!(
					"kb-graph: configured {} initial records, {} inline",
					config.initial_ids().len(),
					config.records.len()
				);
				config
			}
			Err(e) => {
				warn!("kb-graph: failed to parse graph config: {}", e);
				Self::default()
			}
		}
	}

	/// Records to show on load: the selected one first, then the rest of
	/// `displayed`, without duplicates.
	pub fn initial_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = Vec::with_capacity(self.displayed.len() + 1);
		for id in self.selected_id.iter().chain(&self.displayed) {
			if !ids.contains(id) {
				ids.push(id.clone());
			}
		}
		ids
	}

	/// Merge depth for the records shown on load.
	pub fn initial_depth(&self) -> u32 {
		depth_budget(self.neighbors)
	}
}

fn config_text() -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(CONFIG_ELEMENT_ID)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_object_is_default() {
		let config = GraphConfig::from_json("{}").unwrap();
		assert_eq!(config.record_route, "/records");
		assert_eq!(config.neighbors, 3);
		assert_eq!(config.initial_depth(), 2);
		assert!(config.edge_types.is_none());
		assert_eq!(config.graph_options, GraphOptions::default());
	}

	#[test]
	fn full_config() {
		let config = GraphConfig::from_json(
			r##"{
				"apiBase": "http://localhost:8080/api",
				"selectedId": "#2",
				"displayed": ["#1", "#2", "#3"],
				"neighbors": 4,
				"records": { "#1": { "@rid": "#1", "name": "A" } },
				"edgeTypes": [{ "name": "AliasOf" }],
				"graphOptions": { "nodesColor": "@class", "chargeStrength": 60 }
			}"##,
		)
		.unwrap();
		assert_eq!(config.initial_ids(), ["#2", "#1", "#3"]);
		assert_eq!(config.initial_depth(), 3);
		assert_eq!(config.records["#1"]["name"], "A");
		assert_eq!(config.edge_types, Some(vec![EdgeType::new("AliasOf")]));
		assert_eq!(config.graph_options.nodes_color.as_deref(), Some("@class"));
		assert_eq!(config.graph_options.charge_strength, 60.0);
	}

	#[test]
	fn malformed_config_is_an_error() {
		assert!(GraphConfig::from_json(r#"{ "neighbors": "many" }"#).is_err());
	}
}
