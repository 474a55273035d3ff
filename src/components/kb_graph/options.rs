//! User-tunable simulation and display options.

use serde::Deserialize;

/// Simulation forces, semantic highlight colors and legend settings.
///
/// Numeric fields are not range-checked: a negative radius simply yields a
/// degenerate layout.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphOptions {
	pub link_strength: f64,
	pub charge_strength: f64,
	pub collision_radius: f64,
	/// Size each node's collision radius from its name length.
	pub auto_collision_radius: bool,
	#[serde(skip)]
	pub width: f64,
	#[serde(skip)]
	pub height: f64,
	pub selected_color: String,
	pub parents_color: String,
	pub children_color: String,
	pub aliases_color: String,
	pub default_color: String,
	/// Node property to color by. Replaces the default color when set.
	pub nodes_color: Option<String>,
	/// Link property to color by.
	pub links_color: Option<String>,
	pub nodes_legend: bool,
	pub links_legend: bool,
	/// Node property shown as the label.
	pub node_label: String,
	/// Link property shown as the label. Defaults to the link type.
	pub link_label: Option<String>,
}

impl Default for GraphOptions {
	fn default() -> Self {
		Self {
			link_strength: 1.0 / 30.0,
			charge_strength: 100.0,
			collision_radius: 4.0,
			auto_collision_radius: false,
			width: 0.0,
			height: 0.0,
			selected_color: "#D33115".into(),
			parents_color: "#AEA1FF".into(),
			children_color: "#73D8FF".into(),
			aliases_color: "#FB9E00".into(),
			default_color: "#1F265B".into(),
			nodes_color: None,
			links_color: None,
			nodes_legend: true,
			links_legend: false,
			node_label: "name".into(),
			link_label: None,
		}
	}
}

impl GraphOptions {
	pub fn color(&self, key: ColorKey) -> &str {
		match key {
			ColorKey::Selected => &self.selected_color,
			ColorKey::Parents => &self.parents_color,
			ColorKey::Children => &self.children_color,
			ColorKey::Aliases => &self.aliases_color,
			ColorKey::Default => &self.default_color,
		}
	}

	pub fn set_color(&mut self, key: ColorKey, color: impl Into<String>) {
		let slot = match key {
			ColorKey::Selected => &mut self.selected_color,
			ColorKey::Parents => &mut self.parents_color,
			ColorKey::Children => &mut self.children_color,
			ColorKey::Aliases => &mut self.aliases_color,
			ColorKey::Default => &mut self.default_color,
		};
		*slot = color.into();
	}

	/// Applies a change and reports whether the simulation must be rebuilt.
	pub fn apply(&mut self, change: OptionChange) -> bool {
		match change {
			OptionChange::LinkStrength(v) => self.link_strength = v,
			OptionChange::ChargeStrength(v) => self.charge_strength = v,
			OptionChange::CollisionRadius(v) => self.collision_radius = v,
			OptionChange::AutoCollisionRadius(v) => self.auto_collision_radius = v,
			OptionChange::NodesColor(v) => {
				self.nodes_color = v;
				return false;
			}
			OptionChange::LinksColor(v) => {
				self.links_color = v;
				return false;
			}
			OptionChange::NodesLegend(v) => {
				self.nodes_legend = v;
				return false;
			}
			OptionChange::LinksLegend(v) => {
				self.links_legend = v;
				return false;
			}
			OptionChange::NodeLabel(v) => {
				self.node_label = v;
				return false;
			}
		}
		true
	}
}

/// The semantic color slots the color picker can write to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorKey {
	#[default]
	Selected,
	Parents,
	Children,
	Aliases,
	Default,
}

impl ColorKey {
	pub const ALL: [ColorKey; 5] = [
		ColorKey::Selected,
		ColorKey::Parents,
		ColorKey::Children,
		ColorKey::Aliases,
		ColorKey::Default,
	];

	pub fn label(self) -> &'static str {
		match self {
			ColorKey::Selected => "Selected",
			ColorKey::Parents => "SubClass Of",
			ColorKey::Children => "has SubClass",
			ColorKey::Aliases => "Aliases",
			ColorKey::Default => "Default",
		}
	}
}

/// A single edit from the options toolbar.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionChange {
	LinkStrength(f64),
	ChargeStrength(f64),
	CollisionRadius(f64),
	AutoCollisionRadius(bool),
	NodesColor(Option<String>),
	LinksColor(Option<String>),
	NodesLegend(bool),
	LinksLegend(bool),
	NodeLabel(String),
}

impl OptionChange {
	/// Parses a numeric toolbar field. Unknown names and unparseable input
	/// yield `None`.
	pub fn numeric(name: &str, input: &str) -> Option<Self> {
		let value: f64 = input.trim().parse().ok()?;
		match name {
			"linkStrength" => Some(Self::LinkStrength(value)),
			"chargeStrength" => Some(Self::ChargeStrength(value)),
			"collisionRadius" => Some(Self::CollisionRadius(value)),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let options = GraphOptions::default();
		assert!((options.link_strength - 1.0 / 30.0).abs() < 1e-12);
		assert_eq!(options.charge_strength, 100.0);
		assert_eq!(options.color(ColorKey::Selected), "#D33115");
		assert_eq!(options.color(ColorKey::Default), "#1F265B");
	}

	#[test]
	fn partial_json_keeps_defaults() {
		let options: GraphOptions =
			serde_json::from_str(r##"{ "chargeStrength": 250, "aliasesColor": "#000000" }"##).unwrap();
		assert_eq!(options.charge_strength, 250.0);
		assert_eq!(options.aliases_color, "#000000");
		assert_eq!(options.collision_radius, 4.0);
	}

	#[test]
	fn only_force_changes_rebuild_simulation() {
		let mut options = GraphOptions::default();
		assert!(options.apply(OptionChange::CollisionRadius(-3.0)));
		assert_eq!(options.collision_radius, -3.0);
		assert!(!options.apply(OptionChange::NodesColor(Some("@class".into()))));
		assert_eq!(options.nodes_color.as_deref(), Some("@class"));
	}

	#[test]
	fn numeric_fields() {
		assert_eq!(
			OptionChange::numeric("chargeStrength", " 42 "),
			Some(OptionChange::ChargeStrength(42.0))
		);
		assert_eq!(OptionChange::numeric("chargeStrength", "lots"), None);
		assert_eq!(OptionChange::numeric("width", "3"), None);
	}

	#[test]
	fn color_slots() {
		let mut options = GraphOptions::default();
		options.set_color(ColorKey::Parents, "#123456");
		assert_eq!(options.color(ColorKey::Parents), "#123456");
	}
}
