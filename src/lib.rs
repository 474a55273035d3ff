//! kb-graph: Interactive force-directed graph explorer for knowledge-base
//! records.
//!
//! This crate provides a WASM-based graph component that fetches records with
//! their neighborhoods from a record API and renders them with physics-based
//! layout, incremental expansion, property legends, and pan/zoom.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info};

pub mod api;
pub mod codec;
pub mod components;
pub mod config;

pub use api::{ApiError, RecordApi};
pub use components::kb_graph::{GraphController, GraphEvents, KbGraphCanvas};
pub use config::GraphConfig;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("kb-graph: logging initialized");
}

/// Main application component.
/// Loads the graph configuration from the DOM and renders the record graph.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = GraphConfig::load();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />
		<Title text="Knowledge Base Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<KbGraphCanvas config=config fullscreen=true />
			<div class="graph-overlay">
				<h1>"Knowledge Base Graph"</h1>
				<p class="subtitle">
					"Click a record to focus it, click again to load its neighbors. Drag nodes to pin them, double-click to release."
				</p>
			</div>
		</div>
	}
}
