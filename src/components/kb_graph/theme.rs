//! Visual theming for the record graph.
//!
//! Provides colors, the legend palette, and canvas style configuration.

/// Legend color for records lacking the legend property.
pub const MISSING_VALUE_COLOR: &str = "#9e9e9e";

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	/// Parses `#RRGGBB`, `#RGB` or `rgb()`/`rgba()` notation.
	pub fn parse(css: &str) -> Option<Self> {
		let css = css.trim();
		if let Some(hex) = css.strip_prefix('#').filter(|hex| hex.is_ascii()) {
			let channel = |s: &str| u8::from_str_radix(s, 16).ok();
			return match hex.len() {
				6 => Some(Self::rgb(
					channel(&hex[0..2])?,
					channel(&hex[2..4])?,
					channel(&hex[4..6])?,
				)),
				3 => {
					let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
					Some(Self::rgb(short(0)?, short(1)?, short(2)?))
				}
				_ => None,
			};
		}
		let inner = css
			.strip_prefix("rgba(")
			.or_else(|| css.strip_prefix("rgb("))?
			.strip_suffix(')')?;
		let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
		let r = parts.first()?.parse().ok()?;
		let g = parts.get(1)?.parse().ok()?;
		let b = parts.get(2)?.parse().ok()?;
		let a = parts.get(3).and_then(|a| a.parse().ok()).unwrap_or(1.0);
		Some(Self::rgba(r, g, b, a))
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			self.to_css_rgb()
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	pub fn to_css_rgb(self) -> String {
		format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

/// Colors assigned to legend values, in order of first appearance.
#[derive(Clone, Debug)]
pub struct Palette {
	pub colors: Vec<Color>,
}

impl Palette {
	/// Twenty well-separated hues for property legends.
	pub fn legend() -> Self {
		Self {
			colors: vec![
				Color::rgb(31, 119, 180),
				Color::rgb(255, 127, 14),
				Color::rgb(44, 160, 44),
				Color::rgb(214, 39, 40),
				Color::rgb(148, 103, 189),
				Color::rgb(140, 86, 75),
				Color::rgb(227, 119, 194),
				Color::rgb(188, 189, 34),
				Color::rgb(23, 190, 207),
				Color::rgb(57, 59, 121),
				Color::rgb(174, 199, 232),
				Color::rgb(255, 187, 120),
				Color::rgb(152, 223, 138),
				Color::rgb(255, 152, 150),
				Color::rgb(197, 176, 213),
				Color::rgb(196, 156, 148),
				Color::rgb(247, 182, 210),
				Color::rgb(219, 219, 141),
				Color::rgb(158, 218, 229),
				Color::rgb(99, 121, 57),
			],
		}
	}

	pub fn get(&self, index: usize) -> Color {
		self.colors[index % self.colors.len()]
	}
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	pub color: Color,
}

/// Edge visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	pub color: Color,
	/// Color of link labels.
	pub label_color: Color,
}

/// Node visual style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Whether nodes have inner gradients
	pub use_gradient: bool,
	pub label_color: Color,
	/// Ring drawn around nodes with unloaded neighbors.
	pub expandable_ring: Color,
	/// Opacity of nodes outside the focused neighborhood.
	pub muted_alpha: f64,
}

/// Legend panel style.
#[derive(Clone, Debug)]
pub struct LegendStyle {
	pub background: Color,
	pub text: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub background: BackgroundStyle,
	pub edge: EdgeStyle,
	pub node: NodeStyle,
	pub legend: LegendStyle,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: BackgroundStyle {
				color: Color::rgb(250, 250, 250),
			},
			edge: EdgeStyle {
				color: Color::rgba(85, 85, 85, 0.6),
				label_color: Color::rgb(85, 85, 85),
			},
			node: NodeStyle {
				use_gradient: true,
				label_color: Color::rgb(33, 33, 33),
				expandable_ring: Color::rgba(85, 85, 85, 0.8),
				muted_alpha: 0.6,
			},
			legend: LegendStyle {
				background: Color::rgba(255, 255, 255, 0.9),
				text: Color::rgb(33, 33, 33),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_css_colors() {
		assert_eq!(Color::parse("#D33115"), Some(Color::rgb(0xd3, 0x31, 0x15)));
		assert_eq!(Color::parse("#fff"), Some(Color::rgb(255, 255, 255)));
		assert_eq!(
			Color::parse("rgba(1, 2, 3, 0.5)"),
			Some(Color::rgba(1, 2, 3, 0.5))
		);
		assert_eq!(Color::parse("teal"), None);
		assert_eq!(Color::parse("#12345"), None);
	}

	#[test]
	fn css_round_trip_for_opaque_colors() {
		let c = Color::rgb(31, 38, 91);
		assert_eq!(c.to_css(), "#1f265b");
		assert_eq!(c.with_alpha(0.5).to_css(), "rgba(31, 38, 91, 0.5)");
	}

	#[test]
	fn palette_wraps() {
		let palette = Palette::legend();
		assert_eq!(palette.get(0), palette.get(palette.colors.len()));
	}
}
