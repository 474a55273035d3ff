//! Canvas rendering for the record graph.
//!
//! Rendering is a projection of the controller state and runs in passes:
//! 1. Background (screen space)
//! 2. Links with arrow heads and labels (world space)
//! 3. Nodes, dashed rings on expandable nodes, and labels (world space)
//! 4. Property legends (screen space)

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::controller::GraphController;
use super::interaction::{Highlight, ViewTransform};
use super::props_map::LegendEntry;
use super::scale::{ScaleConfig, ScaledValues};
use super::theme::{Color, Theme};
use super::types::{GraphLink, GraphNode, lookup_path, value_text};

/// Renders the complete graph to the canvas.
pub fn render(
	controller: &GraphController,
	view: &ViewTransform,
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	theme: &Theme,
) {
	let scale = ScaledValues::new(config, view.k);
	let (width, height) = (controller.options.width, controller.options.height);

	ctx.set_fill_style_str(&theme.background.color.to_css());
	ctx.fill_rect(0.0, 0.0, width, height);

	ctx.save();
	let _ = ctx.translate(view.x, view.y);
	let _ = ctx.scale(view.k, view.k);

	for link in &controller.data.links {
		draw_link(controller, ctx, &scale, theme, link);
	}
	for node in &controller.data.nodes {
		draw_node(controller, ctx, &scale, theme, node);
	}

	ctx.restore();

	draw_legends(controller, ctx, config, theme);
}

fn draw_link(
	controller: &GraphController,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
	link: &GraphLink,
) {
	let (Some(source), Some(target)) = (
		controller.data.node(&link.source),
		controller.data.node(&link.target),
	) else {
		return;
	};
	let (x1, y1, x2, y2) = (source.x, source.y, target.x, target.y);
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}
	let (ux, uy) = (dx / dist, dy / dist);

	let color = controller
		.link_color(link)
		.and_then(|css| Color::parse(&css))
		.unwrap_or(theme.edge.color);
	ctx.set_stroke_style_str(&color.to_css());
	ctx.set_line_width(scale.edge_line_width);

	let tip = scale.node_radius;
	ctx.begin_path();
	ctx.move_to(x1 + ux * scale.node_radius, y1 + uy * scale.node_radius);
	ctx.line_to(
		x2 - ux * (tip + scale.arrow_size),
		y2 - uy * (tip + scale.arrow_size),
	);
	ctx.stroke();

	// Arrow head at the target end.
	ctx.set_fill_style_str(&color.to_css());
	let (tip_x, tip_y) = (x2 - ux * tip, y2 - uy * tip);
	let (back_x, back_y) = (tip_x - ux * scale.arrow_size, tip_y - uy * scale.arrow_size);
	let (px, py) = (-uy * scale.arrow_size * 0.5, ux * scale.arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();

	if scale.link_label_alpha > 0.01 {
		let label = match controller.options.link_label.as_deref() {
			Some(path) => lookup_path(&link.data, path).and_then(value_text),
			None => Some(link.kind.clone()),
		};
		if let Some(label) = label {
			let label_color = theme.edge.label_color;
			ctx.set_fill_style_str(
				&label_color
					.with_alpha(label_color.a * scale.link_label_alpha)
					.to_css(),
			);
			ctx.set_font(&scale.link_label_font);
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&label, (x1 + x2) / 2.0, (y1 + y2) / 2.0 - 2.0);
			ctx.set_text_align("start");
		}
	}
}

fn draw_node(
	controller: &GraphController,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
	node: &GraphNode,
) {
	let (x, y) = (node.x, node.y);
	let radius = scale.node_radius;
	let color = Color::parse(&controller.node_color(node)).unwrap_or(theme.node.label_color);

	// Nodes outside the focused neighborhood recede.
	let focused = controller.selection.expand_id.is_some();
	let alpha = if focused && controller.selection.highlight(&node.id) == Highlight::None {
		theme.node.muted_alpha
	} else {
		1.0
	};
	ctx.set_global_alpha(alpha);

	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	let gradient = theme
		.node
		.use_gradient
		.then(|| ctx.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius))
		.and_then(Result::ok);
	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &color.lighten(0.4).to_css());
			let _ = gradient.add_color_stop(0.7, &color.to_css());
			let _ = gradient.add_color_stop(1.0, &color.darken(0.2).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&color.to_css()),
	}
	ctx.fill();

	if controller.data.is_expandable(&node.id) {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + scale.ring_width * 1.5, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(&theme.node.expandable_ring.to_css());
		ctx.set_line_width(scale.ring_width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(scale.ring_width * 2.0),
			&JsValue::from_f64(scale.ring_width * 1.5),
		));
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	if let Some(label) = node.label(&controller.options.node_label) {
		ctx.set_fill_style_str(&theme.node.label_color.to_css());
		ctx.set_font(&scale.label_font);
		let _ = ctx.fill_text(&label, x + radius + 4.0, y + 3.0);
	}
	ctx.set_global_alpha(1.0);
}

/// Draws the node legend in the top-right corner and the link legend below
/// it.
fn draw_legends(
	controller: &GraphController,
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	theme: &Theme,
) {
	let options = &controller.options;
	let mut top = config.legend.margin;

	if let Some(path) = options.nodes_color.as_deref().filter(|_| options.nodes_legend) {
		let entries = controller.props.nodes.legend(path);
		top = draw_legend(ctx, config, theme, path, &entries, top, options.width);
	}
	if let Some(path) = options.links_color.as_deref().filter(|_| options.links_legend) {
		let entries = controller.props.links.legend(path);
		draw_legend(ctx, config, theme, path, &entries, top, options.width);
	}
}

/// Draws one legend panel and returns the y coordinate below it.
#[allow(clippy::too_many_arguments)]
fn draw_legend(
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	theme: &Theme,
	title: &str,
	entries: &[LegendEntry],
	top: f64,
	width: f64,
) -> f64 {
	if entries.is_empty() {
		return top;
	}
	let legend = &config.legend;
	let panel_width = 180.0;
	let panel_height = legend.row_height * (entries.len() + 1) as f64 + legend.margin;
	let left = width - panel_width - legend.margin;

	ctx.set_fill_style_str(&theme.legend.background.to_css());
	ctx.fill_rect(left, top, panel_width, panel_height);

	ctx.set_font(&format!("bold {}px sans-serif", legend.font_size));
	ctx.set_fill_style_str(&theme.legend.text.to_css());
	let _ = ctx.fill_text(title, left + legend.margin / 2.0, top + legend.row_height);

	ctx.set_font(&format!("{}px sans-serif", legend.font_size));
	for (i, entry) in entries.iter().enumerate() {
		let row_y = top + legend.row_height * (i + 2) as f64;
		ctx.set_fill_style_str(&entry.color);
		ctx.fill_rect(
			left + legend.margin / 2.0,
			row_y - legend.swatch,
			legend.swatch,
			legend.swatch,
		);
		ctx.set_fill_style_str(&theme.legend.text.to_css());
		let _ = ctx.fill_text(
			entry.value.label(),
			left + legend.margin / 2.0 + legend.swatch + 6.0,
			row_y,
		);
	}
	top + panel_height + legend.margin
}
