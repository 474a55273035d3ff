//! Selection highlighting and pointer interaction state.
//!
//! The focused node (`expand_id`) splits its neighbors into parents, children
//! and aliases by scanning the links that touch it. Pan and zoom are a view
//! transform over simulation space; dragging pins a node where it is dropped.

use std::collections::HashSet;

use super::options::GraphOptions;
use super::types::{GraphLink, Position};

/// Zoom bounds of the view transform.
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 10.0;

/// Pointer travel (screen pixels) below which a press counts as a click.
pub const CLICK_SLOP: f64 = 3.0;

/// How a node relates to the focused node, in color precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Highlight {
	Selected,
	Child,
	Parent,
	Alias,
	None,
}

/// The focused node and its classified neighbors.
#[derive(Clone, Debug, Default)]
pub struct Selection {
	pub expand_id: Option<String>,
	pub parents: HashSet<String>,
	pub children: HashSet<String>,
	pub aliases: HashSet<String>,
}

impl Selection {
	pub fn is_focused(&self, id: &str) -> bool {
		self.expand_id.as_deref() == Some(id)
	}

	/// Moves focus to `id` and reclassifies its neighbors.
	///
	/// Alias links make the other end an alias in either direction. Otherwise
	/// the focused node's targets are its parents and its sources its
	/// children.
	pub fn focus(&mut self, id: &str, links: &[GraphLink]) {
		self.expand_id = Some(id.to_string());
		self.parents.clear();
		self.children.clear();
		self.aliases.clear();

		for link in links.iter().filter(|link| link.touches(id)) {
			if link.target == id {
				let set = if link.is_alias() { &mut self.aliases } else { &mut self.children };
				set.insert(link.source.clone());
			}
			if link.source == id {
				let set = if link.is_alias() { &mut self.aliases } else { &mut self.parents };
				set.insert(link.target.clone());
			}
		}
	}

	pub fn highlight(&self, id: &str) -> Highlight {
		if self.is_focused(id) {
			Highlight::Selected
		} else if self.children.contains(id) {
			Highlight::Child
		} else if self.parents.contains(id) {
			Highlight::Parent
		} else if self.aliases.contains(id) {
			Highlight::Alias
		} else {
			Highlight::None
		}
	}

	/// Fill color of a node. `fallback` stands in for the default color,
	/// e.g. a legend color when coloring by property.
	pub fn color<'a>(&self, id: &str, options: &'a GraphOptions, fallback: Option<&'a str>) -> &'a str {
		match self.highlight(id) {
			Highlight::Selected => &options.selected_color,
			Highlight::Child => &options.children_color,
			Highlight::Parent => &options.parents_color,
			Highlight::Alias => &options.aliases_color,
			Highlight::None => fallback.unwrap_or(&options.default_color),
		}
	}
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor, clamped to [`MIN_ZOOM`, `MAX_ZOOM`].
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Position {
		Position::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Zooms by `factor` keeping the screen point under the cursor fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = k;
	}
}

/// Tracks a press on a node, which becomes a drag once the pointer moves.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node_id: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Position,
	pub moved: bool,
}

impl DragState {
	pub fn begin(&mut self, id: String, sx: f64, sy: f64, node_start: Position) {
		*self = Self {
			node_id: Some(id),
			start_x: sx,
			start_y: sy,
			node_start,
			moved: false,
		};
	}

	/// New node position for the pointer at (`sx`, `sy`), or `None` while
	/// the pointer is still within click distance.
	pub fn drag_to(&mut self, sx: f64, sy: f64, k: f64) -> Option<Position> {
		self.node_id.as_ref()?;
		let (dx, dy) = (sx - self.start_x, sy - self.start_y);
		if !self.moved && (dx * dx + dy * dy).sqrt() < CLICK_SLOP {
			return None;
		}
		self.moved = true;
		Some(Position::new(self.node_start.x + dx / k, self.node_start.y + dy / k))
	}

	/// Ends the press. Returns the node id if it was a click, not a drag.
	pub fn end(&mut self) -> Option<String> {
		let moved = self.moved;
		let id = std::mem::take(self).node_id;
		if moved { None } else { id }
	}
}

/// Tracks an in-progress canvas pan operation.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn link(id: &str, source: &str, target: &str, kind: &str) -> GraphLink {
		GraphLink {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			kind: kind.into(),
			data: json!({}),
		}
	}

	#[test]
	fn focus_classifies_neighbors() {
		let links = [
			link("#10", "#1", "#2", "subclass"),
			link("#11", "#3", "#1", "subclass"),
			link("#12", "#4", "#1", "alias"),
			link("#13", "#5", "#6", "subclass"),
		];
		let mut selection = Selection::default();
		selection.focus("#1", &links);

		assert_eq!(selection.highlight("#1"), Highlight::Selected);
		assert_eq!(selection.highlight("#2"), Highlight::Parent);
		assert_eq!(selection.highlight("#3"), Highlight::Child);
		assert_eq!(selection.highlight("#4"), Highlight::Alias);
		assert_eq!(selection.highlight("#5"), Highlight::None);

		selection.focus("#5", &links);
		assert_eq!(selection.highlight("#1"), Highlight::None);
		assert_eq!(selection.highlight("#6"), Highlight::Parent);
	}

	#[test]
	fn parent_color_beats_alias() {
		let links = [link("#10", "#1", "#2", "subclass"), link("#11", "#1", "#2", "alias")];
		let options = GraphOptions::default();
		let mut selection = Selection::default();
		selection.focus("#1", &links);

		assert_eq!(selection.color("#2", &options, None), options.parents_color);
		assert_eq!(selection.color("#1", &options, Some("#000000")), options.selected_color);
	}

	#[test]
	fn focused_node_is_always_selected_color() {
		let links = [link("#10", "#1", "#1", "subclass")];
		let options = GraphOptions::default();
		let mut selection = Selection::default();
		selection.focus("#1", &links);
		assert_eq!(selection.color("#1", &options, None), options.selected_color);
	}

	#[test]
	fn fallback_replaces_default_only() {
		let options = GraphOptions::default();
		let selection = Selection::default();
		assert_eq!(selection.color("#9", &options, Some("#abcdef")), "#abcdef");
		assert_eq!(selection.color("#9", &options, None), options.default_color);
	}

	#[test]
	fn zoom_is_clamped_and_anchored() {
		let mut transform = ViewTransform::default();
		let before = transform.screen_to_graph(100.0, 50.0);
		transform.zoom_at(100.0, 50.0, 2.0);
		let after = transform.screen_to_graph(100.0, 50.0);
		assert!((before.x - after.x).abs() < 1e-9 && (before.y - after.y).abs() < 1e-9);

		for _ in 0..50 {
			transform.zoom_at(0.0, 0.0, 0.5);
		}
		assert_eq!(transform.k, MIN_ZOOM);
		for _ in 0..50 {
			transform.zoom_at(0.0, 0.0, 2.0);
		}
		assert_eq!(transform.k, MAX_ZOOM);
	}

	#[test]
	fn short_press_is_a_click() {
		let mut drag = DragState::default();
		drag.begin("#1".into(), 10.0, 10.0, Position::new(0.0, 0.0));
		assert_eq!(drag.drag_to(11.0, 10.0, 1.0), None);
		assert_eq!(drag.end().as_deref(), Some("#1"));

		drag.begin("#1".into(), 10.0, 10.0, Position::new(0.0, 0.0));
		assert_eq!(drag.drag_to(30.0, 10.0, 2.0), Some(Position::new(10.0, 0.0)));
		assert_eq!(drag.end(), None);
		assert!(drag.node_id.is_none());
	}
}
