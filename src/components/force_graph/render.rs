//! Canvas rendering for the force graph.
//!
//! Paints a [`Scene`] in four passes so labels stay readable:
//! 1. Background
//! 2. Edge lines, then relationship labels at their midpoints
//! 3. Node circles
//! 4. Node labels
//!
//! All coordinates in the scene are already clamped to the viewport.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::scene::{EdgeGlyph, NodeGlyph, Scene};
use super::theme::Theme;

/// Renders the complete graph to the canvas. Without a scene only the
/// background is drawn.
pub fn render(scene: Option<&Scene>, ctx: &CanvasRenderingContext2d, theme: &Theme, width: f64, height: f64) {
	draw_background(ctx, theme, width, height);

	let Some(scene) = scene else {
		return;
	};

	draw_edges(ctx, theme, &scene.edges);
	draw_nodes(ctx, theme, &scene.nodes);
	draw_node_labels(ctx, theme, &scene.nodes);
}

fn draw_background(ctx: &CanvasRenderingContext2d, theme: &Theme, width: f64, height: f64) {
	let gradient = theme
		.background
		.use_gradient
		.then(|| {
			ctx.create_radial_gradient(
				width / 2.0,
				height / 2.0,
				0.0,
				width / 2.0,
				height / 2.0,
				width.max(height) * 0.8,
			)
			.ok()
		})
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &theme.background.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &theme.background.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&theme.background.color.to_css()),
	}

	ctx.fill_rect(0.0, 0.0, width, height);
}

fn draw_edges(ctx: &CanvasRenderingContext2d, theme: &Theme, edges: &[EdgeGlyph]) {
	ctx.set_stroke_style_str(&theme.edge.color.to_css());
	ctx.set_line_width(theme.edge.width);
	for edge in edges {
		ctx.begin_path();
		ctx.move_to(edge.from.0, edge.from.1);
		ctx.line_to(edge.to.0, edge.to.1);
		ctx.stroke();
	}

	ctx.set_fill_style_str(&theme.edge.label_color.to_css());
	ctx.set_font(&theme.edge.label_font);
	ctx.set_text_align("center");
	for edge in edges.iter().filter(|e| !e.label.is_empty()) {
		let _ = ctx.fill_text(&edge.label, edge.label_at.0, edge.label_at.1);
	}
	ctx.set_text_align("start");
}

fn draw_nodes(ctx: &CanvasRenderingContext2d, theme: &Theme, nodes: &[NodeGlyph]) {
	for node in nodes {
		let (x, y) = node.center;
		let radius = node.radius;

		let gradient = theme
			.node
			.use_gradient
			.then(|| {
				ctx.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius)
					.ok()
			})
			.flatten();

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		match gradient {
			Some(gradient) => {
				let _ = gradient.add_color_stop(0.0, &node.fill.lighten(0.4).to_css());
				let _ = gradient.add_color_stop(1.0, &node.fill.to_css());
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
			}
			None => ctx.set_fill_style_str(&node.fill.to_css()),
		}
		ctx.fill();

		if node.placeholder {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(3.0),
				&JsValue::from_f64(2.0),
			));
			ctx.set_stroke_style_str(&theme.node.placeholder_color.to_css());
			ctx.set_line_width(1.5);
			ctx.stroke();
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		} else if theme.node.border_width > 0.0 {
			ctx.set_stroke_style_str(&theme.node.border_color.to_css());
			ctx.set_line_width(theme.node.border_width);
			ctx.stroke();
		}
	}
}

fn draw_node_labels(ctx: &CanvasRenderingContext2d, theme: &Theme, nodes: &[NodeGlyph]) {
	ctx.set_fill_style_str(&theme.node.label_color.to_css());
	ctx.set_font(&theme.node.label_font);
	for node in nodes {
		let _ = ctx.fill_text(&node.id, node.label_at.0, node.label_at.1);
	}
}
