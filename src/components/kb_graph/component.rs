//! Leptos component wrapping the record graph canvas.
//!
//! The component creates an HTML canvas element and wires up mouse/wheel event
//! handlers for clicking, node dragging, panning, and zooming. Records are
//! fetched on spawned futures and merged into the shared controller when they
//! arrive. An animation loop runs via `requestAnimationFrame`, stepping the
//! simulation and redrawing whenever something moved.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::controller::{ClickOutcome, GraphController, LogEvents};
use super::interaction::{DragState, PanState, ViewTransform};
use super::options::{ColorKey, GraphOptions, OptionChange};
use super::render;
use super::scale::{ScaleConfig, ScaledValues};
use super::theme::Theme;
use crate::api::RecordApi;
use crate::codec::retrocycle;
use crate::config::GraphConfig;

/// Simulation step per animation frame.
const FRAME_DT: f32 = 0.016;

/// Controller state plus everything needed to draw it.
struct GraphContext {
	controller: GraphController,
	view: ViewTransform,
	drag: DragState,
	pan: PanState,
	scale: ScaleConfig,
	theme: Theme,
}

type AnimationClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Handles shared by the event handlers and spawned fetches.
#[derive(Clone)]
struct Shared {
	context: Rc<RefCell<Option<GraphContext>>>,
	api: RecordApi,
	/// Cleared when the component unmounts. Late responses check it.
	alive: Arc<AtomicBool>,
	dirty: Rc<Cell<bool>>,
	/// Node properties offered for coloring.
	node_props: RwSignal<Vec<String>>,
	link_props: RwSignal<Vec<String>>,
}

impl Shared {
	fn is_alive(&self) -> bool {
		self.alive.load(Ordering::Relaxed)
	}

	fn with<R>(&self, f: impl FnOnce(&mut GraphContext) -> R) -> Option<R> {
		let mut context = self.context.borrow_mut();
		let result = context.as_mut().map(f);
		self.dirty.set(true);
		result
	}

	fn after_merge(&self) {
		let props = self.with(|c| {
			let props = &c.controller.props;
			(
				props.nodes.colorable().map(String::from).collect::<Vec<_>>(),
				props.links.colorable().map(String::from).collect::<Vec<_>>(),
			)
		});
		if let Some((nodes, links)) = props {
			self.node_props.set(nodes);
			self.link_props.set(links);
		}
	}

	/// Loads the edge classes, then the records configured for display.
	fn load_initial(&self, config: GraphConfig) {
		let shared = self.clone();
		spawn_local(async move {
			let edge_types = match config.edge_types.clone() {
				Some(edge_types) => edge_types,
				None => shared.api.edge_types().await.unwrap_or_else(|e| {
					warn!("kb-graph: failed to load edge classes: {}", e);
					Vec::new()
				}),
			};
			if !shared.is_alive() {
				return;
			}
			shared.with(|c| c.controller.set_edge_types(edge_types));

			let ids = config.initial_ids();
			let (count, depth) = (ids.len(), config.initial_depth());
			for (index, id) in ids.iter().enumerate() {
				let record = match config.records.get(id) {
					Some(record) => retrocycle(record.clone()),
					None => match shared.api.get_record(id, config.neighbors).await {
						Ok(record) => record,
						Err(e) => {
							warn!("kb-graph: failed to load {id}: {e}");
							continue;
						}
					},
				};
				if !shared.is_alive() {
					return;
				}
				shared.with(|c| c.controller.show_initial(&record, index, count, depth));
				shared.after_merge();
			}
			info!("kb-graph: displayed {count} initial records");
		});
	}

	/// Fetches the neighbors of `id` and merges them when they arrive.
	fn expand(&self, id: String, neighbors: u32) {
		let shared = self.clone();
		spawn_local(async move {
			let response = shared.api.get_record(&id, neighbors).await;
			if !shared.is_alive() {
				return;
			}
			let changed = shared.with(|c| c.controller.finish_expansion(&id, response));
			if changed == Some(true) {
				shared.after_merge();
			}
		});
	}

	fn click(&self, id: &str) {
		if let Some(ClickOutcome::Expand { id, neighbors }) = self.with(|c| c.controller.click(id)) {
			self.expand(id, neighbors);
		}
	}

	fn set_option(&self, change: OptionChange) {
		self.with(|c| c.controller.set_option(change));
	}
}

/// Releases the animation frame and window listeners when dropped.
struct ListenerGuard {
	frame: Rc<Cell<Option<i32>>>,
	animate: AnimationClosure,
	resize: Option<Closure<dyn FnMut()>>,
	context: Rc<RefCell<Option<GraphContext>>>,
}

impl Drop for ListenerGuard {
	fn drop(&mut self) {
		if let Some(window) = web_sys::window() {
			if let Some(handle) = self.frame.take() {
				let _ = window.cancel_animation_frame(handle);
			}
			if let Some(cb) = &self.resize {
				let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		// Breaks the closure's reference to itself.
		self.animate.borrow_mut().take();
		if let Some(c) = self.context.borrow_mut().as_mut() {
			c.controller.teardown();
		}
	}
}

fn window_size(window: &Window) -> (f64, f64) {
	let dimension = |value: Result<JsValue, JsValue>, fallback| {
		value.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	(
		dimension(window.inner_width(), 800.0),
		dimension(window.inner_height(), 600.0),
	)
}

/// Pointer position relative to the canvas.
fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Renders an interactive record graph on a canvas element.
///
/// Records listed in `config` are shown on mount. Clicking a node focuses it
/// and colors its parents, children and aliases; clicking the focused node
/// again loads its neighbors. The component sizes itself to its parent
/// container by default; set `fullscreen = true` to fill the viewport and
/// resize automatically with the window.
#[component]
pub fn KbGraphCanvas(
	config: GraphConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let shared = Shared {
		context: Rc::new(RefCell::new(None)),
		api: RecordApi::from_config(&config),
		alive: Arc::new(AtomicBool::new(true)),
		dirty: Rc::new(Cell::new(true)),
		node_props: RwSignal::new(Vec::new()),
		link_props: RwSignal::new(Vec::new()),
	};
	let guard = StoredValue::new_local(None::<ListenerGuard>);

	let alive = shared.alive.clone();
	on_cleanup(move || alive.store(false, Ordering::Relaxed));

	let shared_init = shared.clone();
	let config_init = config.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		// Release the listeners of a previous mount before replacing the context.
		guard.set_value(None);

		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			let parent = canvas.parent_element();
			(
				width.unwrap_or_else(|| parent.as_ref().map_or(800.0, |p| p.client_width() as f64)),
				height.unwrap_or_else(|| parent.as_ref().map_or(600.0, |p| p.client_height() as f64)),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("kb-graph: canvas has no 2d context");
			return;
		};

		let mut options = config_init.graph_options.clone();
		options.width = w;
		options.height = h;
		let mut controller = GraphController::new(options, Box::new(LogEvents));
		let dirty = shared_init.dirty.clone();
		controller.on_tick(move |_| dirty.set(true));

		*shared_init.context.borrow_mut() = Some(GraphContext {
			controller,
			view: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			scale: ScaleConfig::default(),
			theme: Theme::default(),
		});

		let resize = fullscreen.then(|| {
			let (shared_resize, canvas_resize) = (shared_init.clone(), canvas.clone());
			let cb: Closure<dyn FnMut()> = Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				shared_resize.with(|c| c.controller.resize(nw, nh));
			});
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			cb
		});

		let frame: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
		let animate: AnimationClosure = Rc::new(RefCell::new(None));
		let (shared_anim, animate_inner, frame_anim) =
			(shared_init.clone(), animate.clone(), frame.clone());
		*animate.borrow_mut() = Some(Closure::new(move || {
			if !shared_anim.is_alive() {
				return;
			}
			if let Some(c) = shared_anim.context.borrow_mut().as_mut() {
				c.controller.tick(FRAME_DT);
				if shared_anim.dirty.replace(false) {
					render::render(&c.controller, &c.view, &ctx, &c.scale, &c.theme);
				}
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				frame_anim.set(win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
			}
		}));
		if let Some(cb) = animate.borrow().as_ref() {
			frame.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}

		guard.set_value(Some(ListenerGuard {
			frame,
			animate,
			resize,
			context: shared_init.context.clone(),
		}));
		shared_init.load_initial(config_init.clone());
	});

	let shared_md = shared.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		shared_md.with(|c| {
			let scale = ScaledValues::new(&c.scale, c.view.k);
			let point = c.view.screen_to_graph(x, y);
			let hit = c
				.controller
				.node_at(point, scale.hit_radius)
				.and_then(|id| c.controller.data.node(&id).map(|node| (id, node.position())));
			if let Some((id, start)) = hit {
				c.drag.begin(id, x, y, start);
			} else {
				c.pan = PanState {
					active: true,
					start_x: x,
					start_y: y,
					transform_start_x: c.view.x,
					transform_start_y: c.view.y,
				};
			}
		});
	};

	let shared_mm = shared.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let hovering = shared_mm.with(|c| {
			if let Some(id) = c.drag.node_id.clone() {
				if let Some(position) = c.drag.drag_to(x, y, c.view.k) {
					c.controller.drag_node(&id, position);
				}
				return true;
			}
			if c.pan.active {
				c.view.x = c.pan.transform_start_x + (x - c.pan.start_x);
				c.view.y = c.pan.transform_start_y + (y - c.pan.start_y);
				return false;
			}
			let scale = ScaledValues::new(&c.scale, c.view.k);
			c.controller
				.node_at(c.view.screen_to_graph(x, y), scale.hit_radius)
				.is_some()
		});
		if let Some(canvas) = canvas_ref.get() {
			let cursor = if hovering == Some(true) { "pointer" } else { "grab" };
			let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
		}
	};

	let shared_mu = shared.clone();
	let on_mouseup = move |_: MouseEvent| {
		let clicked = shared_mu.with(|c| {
			c.pan.active = false;
			c.drag.end()
		});
		if let Some(id) = clicked.flatten() {
			shared_mu.click(&id);
		}
	};

	let shared_ml = shared.clone();
	let on_mouseleave = move |_: MouseEvent| {
		shared_ml.with(|c| {
			c.drag = DragState::default();
			c.pan.active = false;
		});
	};

	let shared_dc = shared.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		shared_dc.with(|c| {
			let scale = ScaledValues::new(&c.scale, c.view.k);
			if let Some(id) = c.controller.node_at(c.view.screen_to_graph(x, y), scale.hit_radius) {
				c.controller.release_node(&id);
			}
		});
	};

	let shared_wh = shared.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
		shared_wh.with(|c| c.view.zoom_at(x, y, factor));
	};

	view! {
		<div class="kb-graph">
			<canvas
				node_ref=canvas_ref
				class="kb-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:dblclick=on_dblclick
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			{options_panel(shared, config.graph_options)}
		</div>
	}
}

/// Toolbar editing the simulation forces, highlight colors and legends.
fn options_panel(shared: Shared, options: GraphOptions) -> impl IntoView {
	let active_key = RwSignal::new(ColorKey::default());

	let key_buttons = ColorKey::ALL
		.into_iter()
		.map(|key| {
			let shared = shared.clone();
			view! {
				<button
					class="color-key"
					class:active=move || active_key.get() == key
					on:click=move |_| {
						active_key.set(key);
						shared.with(|c| c.controller.set_color_key(key));
					}
				>
					{key.label()}
				</button>
			}
		})
		.collect_view();

	let numeric_field = |name: &'static str, label: &'static str, value: f64| {
		let shared = shared.clone();
		view! {
			<label>
				{label}
				<input
					type="number"
					step="any"
					prop:value=value.to_string()
					on:change=move |ev| {
						match OptionChange::numeric(name, &event_target_value(&ev)) {
							Some(change) => shared.set_option(change),
							None => warn!("kb-graph: ignoring invalid {name}"),
						}
					}
				/>
			</label>
		}
	};

	let color_by = |label: &'static str,
					props: RwSignal<Vec<String>>,
					change: fn(Option<String>) -> OptionChange| {
		let shared = shared.clone();
		view! {
			<label>
				{label}
				<select on:change=move |ev| {
					let path = event_target_value(&ev);
					shared.set_option(change((!path.is_empty()).then_some(path)));
				}>
					<option value="">"(none)"</option>
					{move || {
						props
							.get()
							.into_iter()
							.map(|path| { let value = path.clone(); view! { <option value=value>{path}</option> } })
							.collect_view()
					}}
				</select>
			</label>
		}
	};

	let legend_toggle = |label: &'static str, checked: bool, change: fn(bool) -> OptionChange| {
		let shared = shared.clone();
		view! {
			<label>
				{label}
				<input
					type="checkbox"
					prop:checked=checked
					on:change=move |ev| shared.set_option(change(event_target_checked(&ev)))
				/>
			</label>
		}
	};

	let (shared_color, shared_collide, shared_label) = (shared.clone(), shared.clone(), shared.clone());

	view! {
		<div class="graph-options">
			<div class="color-keys">{key_buttons}</div>
			<input
				type="color"
				on:input=move |ev| {
					let color = event_target_value(&ev);
					shared_color.with(|c| c.controller.pick_color(color));
				}
			/>
			{numeric_field("linkStrength", "Link strength", options.link_strength)}
			{numeric_field("chargeStrength", "Charge strength", options.charge_strength)}
			{numeric_field("collisionRadius", "Collision radius", options.collision_radius)}
			<label>
				"Auto collision radius"
				<input
					type="checkbox"
					prop:checked=options.auto_collision_radius
					on:change=move |ev| {
						shared_collide.set_option(OptionChange::AutoCollisionRadius(event_target_checked(&ev)));
					}
				/>
			</label>
			{color_by("Color nodes by", shared.node_props, OptionChange::NodesColor)}
			{legend_toggle("Node legend", options.nodes_legend, OptionChange::NodesLegend)}
			{color_by("Color links by", shared.link_props, OptionChange::LinksColor)}
			{legend_toggle("Link legend", options.links_legend, OptionChange::LinksLegend)}
			<label>
				"Label"
				<input
					type="text"
					prop:value=options.node_label.clone()
					on:change=move |ev| {
						shared_label.set_option(OptionChange::NodeLabel(event_target_value(&ev)));
					}
				/>
			</label>
		</div>
	}
}
