//! Record graph visualization component.
//!
//! Renders knowledge-base records as an interactive force-directed graph on
//! an HTML canvas:
//! - Incremental neighbor expansion merged into owned node/link collections
//! - Parent, child and alias highlighting around the focused record
//! - Property legends with stable per-value colors
//! - Pan, zoom, and node dragging interactions
//!
//! # Example
//!
//! ```ignore
//! use kb_graph::{GraphConfig, KbGraphCanvas};
//!
//! let config = GraphConfig {
//!     api_base: "http://localhost:8080/api".into(),
//!     selected_id: Some("#12:3".into()),
//!     ..Default::default()
//! };
//!
//! view! { <KbGraphCanvas config=config fullscreen=true /> }
//! ```

mod component;
pub mod controller;
pub mod expand;
pub mod interaction;
pub mod options;
pub mod props_map;
mod render;
pub mod scale;
pub mod simulation;
pub mod theme;
pub mod types;

pub use component::KbGraphCanvas;
pub use controller::{ClickOutcome, GraphController, GraphEvents};
pub use expand::GraphData;
pub use options::GraphOptions;
pub use theme::Theme;
pub use types::{EdgeType, GraphLink, GraphNode};
