//! Zoom-dependent sizes of drawn graph elements.
//!
//! Drawing happens in simulation (world) space after the view transform is
//! applied, so a size that should stay fixed on screen must be divided by the
//! zoom factor `k`. [`ScaleBehavior`] captures the three ways an element can
//! react to zoom.

/// How a size reacts to zoom level.
#[derive(Clone, Debug)]
pub enum ScaleBehavior {
	/// Constant world-space size. Appears larger when zoomed in.
	World,
	/// Constant screen-space size (pixels).
	Screen,
	/// World-space size, clamped to a screen-space range.
	Clamped { min_screen: f64, max_screen: f64 },
}

impl ScaleBehavior {
	/// World-space size for `base` at zoom `k`.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// How opacity reacts to zoom level.
#[derive(Clone, Debug)]
pub enum AlphaBehavior {
	Constant,
	/// Fully visible at `full_alpha_k`, invisible at `zero_alpha_k`.
	Fade { zero_alpha_k: f64, full_alpha_k: f64 },
}

impl AlphaBehavior {
	pub fn apply(&self, k: f64) -> f64 {
		match self {
			AlphaBehavior::Constant => 1.0,
			AlphaBehavior::Fade {
				zero_alpha_k,
				full_alpha_k,
			} => {
				if zero_alpha_k == full_alpha_k {
					return 1.0;
				}
				((k - zero_alpha_k) / (full_alpha_k - zero_alpha_k)).clamp(0.0, 1.0)
			}
		}
	}
}

#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	/// Base node radius in world units.
	pub radius: f64,
	pub radius_behavior: ScaleBehavior,
	/// Hit detection radius in world units.
	pub hit_radius: f64,
	pub hit_behavior: ScaleBehavior,
	/// Label font size in screen pixels.
	pub label_size: f64,
	/// Zoom below which labels stop shrinking.
	pub label_min_k: f64,
	/// Width of the expandable ring in screen pixels.
	pub ring_width: f64,
}

#[derive(Clone, Debug)]
pub struct EdgeScaleConfig {
	/// Line width in screen pixels.
	pub line_width: f64,
	/// Arrow head length in world units.
	pub arrow_size: f64,
	pub arrow_behavior: ScaleBehavior,
	/// Link label font size in screen pixels.
	pub label_size: f64,
	/// Link labels fade out when zooming out.
	pub label_alpha: AlphaBehavior,
}

/// Legend panel layout in screen pixels.
#[derive(Clone, Debug)]
pub struct LegendScaleConfig {
	pub margin: f64,
	pub row_height: f64,
	pub swatch: f64,
	pub font_size: f64,
}

#[derive(Clone, Debug)]
pub struct ScaleConfig {
	pub node: NodeScaleConfig,
	pub edge: EdgeScaleConfig,
	pub legend: LegendScaleConfig,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				radius: 5.0,
				radius_behavior: ScaleBehavior::Clamped {
					min_screen: 4.0,
					max_screen: f64::INFINITY,
				},
				hit_radius: 8.0,
				hit_behavior: ScaleBehavior::Clamped {
					min_screen: 6.0,
					max_screen: f64::INFINITY,
				},
				label_size: 10.0,
				label_min_k: 0.5,
				ring_width: 1.5,
			},
			edge: EdgeScaleConfig {
				line_width: 1.0,
				arrow_size: 5.0,
				arrow_behavior: ScaleBehavior::Clamped {
					min_screen: 3.0,
					max_screen: 18.0,
				},
				label_size: 8.0,
				label_alpha: AlphaBehavior::Fade {
					zero_alpha_k: 0.7,
					full_alpha_k: 1.2,
				},
			},
			legend: LegendScaleConfig {
				margin: 12.0,
				row_height: 18.0,
				swatch: 10.0,
				font_size: 12.0,
			},
		}
	}
}

/// Sizes for one frame, in world space.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	pub k: f64,
	pub node_radius: f64,
	pub hit_radius: f64,
	pub ring_width: f64,
	/// CSS font for node labels, e.g. `10px sans-serif`.
	pub label_font: String,
	pub edge_line_width: f64,
	pub arrow_size: f64,
	pub link_label_font: String,
	pub link_label_alpha: f64,
}

impl ScaledValues {
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let label_size = config.node.label_size / k.max(config.node.label_min_k);
		let link_label_size = config.edge.label_size / k.max(config.node.label_min_k);

		Self {
			k,
			node_radius: config.node.radius_behavior.apply(config.node.radius, k),
			hit_radius: config.node.hit_behavior.apply(config.node.hit_radius, k),
			ring_width: config.node.ring_width / k,
			label_font: format!("{label_size}px sans-serif"),
			edge_line_width: config.edge.line_width / k,
			arrow_size: config.edge.arrow_behavior.apply(config.edge.arrow_size, k),
			link_label_font: format!("{link_label_size}px sans-serif"),
			link_label_alpha: config.edge.label_alpha.apply(k),
		}
	}
}
