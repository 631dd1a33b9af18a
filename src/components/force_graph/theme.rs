//! Visual theming for the force graph.
//!
//! Provides colors, the categorical node palette, and per-element styles.

use std::collections::HashMap;

/// Straight (non-premultiplied) sRGB color with alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	/// Opacity in `0.0..=1.0`.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self::rgba(r, g, b, 1.0)
	}

	/// Color with explicit opacity.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Mix toward white; `amount` 0 keeps the color, 1 gives white.
	pub fn lighten(self, amount: f64) -> Self {
		let t = amount.clamp(0.0, 1.0);
		let mix = |channel: u8| (f64::from(channel) * (1.0 - t) + 255.0 * t).round() as u8;
		Self::rgba(mix(self.r), mix(self.g), mix(self.b), self.a)
	}

	/// CSS color string, hex when opaque.
	pub fn to_css(self) -> String {
		let Self { r, g, b, a } = self;
		if a >= 0.999 {
			format!("#{r:02x}{g:02x}{b:02x}")
		} else {
			format!("rgba({r}, {g}, {b}, {a})")
		}
	}
}

/// The ten-color categorical scheme (`schemeCategory10`).
pub const CATEGORY10: [Color; 10] = [
	Color::rgb(0x1f, 0x77, 0xb4),
	Color::rgb(0xff, 0x7f, 0x0e),
	Color::rgb(0x2c, 0xa0, 0x2c),
	Color::rgb(0xd6, 0x27, 0x28),
	Color::rgb(0x94, 0x67, 0xbd),
	Color::rgb(0x8c, 0x56, 0x4b),
	Color::rgb(0xe3, 0x77, 0xc2),
	Color::rgb(0x7f, 0x7f, 0x7f),
	Color::rgb(0xbc, 0xbd, 0x22),
	Color::rgb(0x17, 0xbe, 0xcf),
];

/// Ordinal color scale keyed by node identifier.
///
/// Identifiers get the next palette slot the first time they are seen and
/// keep it for as long as the palette lives. Nothing is hashed, so colors
/// depend on the order identifiers were first requested.
#[derive(Clone, Debug)]
pub struct OrdinalPalette {
	colors: Vec<Color>,
	assigned: HashMap<String, usize>,
}

impl OrdinalPalette {
	pub fn new(colors: Vec<Color>) -> Self {
		Self {
			colors,
			assigned: HashMap::new(),
		}
	}

	/// Color for `id`, assigning one if this is the first request.
	pub fn color_for(&mut self, id: &str) -> Color {
		if self.colors.is_empty() {
			return Color::rgb(128, 128, 128);
		}
		let next = self.assigned.len();
		let slot = *self.assigned.entry(id.to_string()).or_insert(next);
		self.colors[slot % self.colors.len()]
	}
}

impl Default for OrdinalPalette {
	fn default() -> Self {
		Self::new(CATEGORY10.to_vec())
	}
}

/// Canvas fill behind the graph.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Edge color of the fill, or the whole fill without a gradient.
	pub color: Color,
	/// Center color of the radial gradient.
	pub color_secondary: Color,
	pub use_gradient: bool,
}

/// Relationship lines and their type labels.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	pub color: Color,
	pub width: f64,
	/// Color of the relationship type label.
	pub label_color: Color,
	pub label_font: String,
}

/// Node circles and identifier labels.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Shade circles from a lighter highlight to their palette color.
	pub use_gradient: bool,
	/// Outline width; zero draws none.
	pub border_width: f64,
	pub border_color: Color,
	/// Outline color of placeholder nodes.
	pub placeholder_color: Color,
	pub label_color: Color,
	pub label_font: String,
}

/// Named set of styles for one look.
#[derive(Clone, Debug)]
pub struct Theme {
	pub name: &'static str,
	pub background: BackgroundStyle,
	pub edge: EdgeStyle,
	pub node: NodeStyle,
}

impl Theme {
	/// Plain light theme: grey edges, black labels (default)
	pub fn light() -> Self {
		Self {
			name: "light",
			background: BackgroundStyle {
				color: Color::rgb(255, 255, 255),
				color_secondary: Color::rgb(255, 255, 255),
				use_gradient: false,
			},
			edge: EdgeStyle {
				color: Color::rgba(153, 153, 153, 0.6),
				width: 2.0,
				label_color: Color::rgb(0, 0, 0),
				label_font: "12px sans-serif".to_string(),
			},
			node: NodeStyle {
				use_gradient: false,
				border_width: 0.0,
				border_color: Color::rgba(255, 255, 255, 0.0),
				placeholder_color: Color::rgb(120, 120, 120),
				label_color: Color::rgb(0, 0, 0),
				label_font: "12px sans-serif".to_string(),
			},
		}
	}

	/// Elegant dark theme with subtle effects
	pub fn midnight() -> Self {
		Self {
			name: "midnight",
			background: BackgroundStyle {
				color: Color::rgb(18, 20, 28),
				color_secondary: Color::rgb(25, 28, 38),
				use_gradient: true,
			},
			edge: EdgeStyle {
				color: Color::rgba(100, 120, 150, 0.45),
				width: 1.5,
				label_color: Color::rgba(200, 210, 225, 0.8),
				label_font: "11px sans-serif".to_string(),
			},
			node: NodeStyle {
				use_gradient: true,
				border_width: 1.0,
				border_color: Color::rgba(255, 255, 255, 0.3),
				placeholder_color: Color::rgba(200, 200, 200, 0.6),
				label_color: Color::rgba(255, 255, 255, 0.85),
				label_font: "12px sans-serif".to_string(),
			},
		}
	}

	/// Look a theme up by name, falling back to the default.
	pub fn by_name(name: &str) -> Self {
		match name {
			"midnight" => Self::midnight(),
			_ => Self::light(),
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::light()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_identifier_keeps_its_color() {
		let mut palette = OrdinalPalette::default();
		let a = palette.color_for("A");
		let b = palette.color_for("B");
		assert_ne!(a, b);
		assert_eq!(palette.color_for("A"), a);
		assert_eq!(palette.color_for("B"), b);
	}

	#[test]
	fn palette_wraps_after_ten_identifiers() {
		let mut palette = OrdinalPalette::default();
		let colors: Vec<Color> = (0..11).map(|i| palette.color_for(&format!("n{i}"))).collect();
		assert_eq!(colors[10], colors[0]);
		assert_eq!(colors[0], CATEGORY10[0]);
	}

	#[test]
	fn css_output() {
		assert_eq!(Color::rgb(0x1f, 0x77, 0xb4).to_css(), "#1f77b4");
		assert_eq!(Color::rgba(1, 2, 3, 0.5).to_css(), "rgba(1, 2, 3, 0.5)");
	}

	#[test]
	fn unknown_theme_name_is_light() {
		assert_eq!(Theme::by_name("nope").name, "light");
		assert_eq!(Theme::by_name("midnight").name, "midnight");
	}
}
