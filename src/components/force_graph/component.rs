//! Leptos component hosting the live graph canvas.
//!
//! The component measures its container once, creates the [`Orchestrator`],
//! issues the first fetch and opens the notification socket. A single
//! `requestAnimationFrame` loop then ticks whatever session is current and
//! repaints it. Mouse handlers drag nodes (pinning them) and double-click
//! releases a pinned node.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent};

use super::orchestrator::{LoadState, Orchestrator};
use super::render;
use super::theme::Theme;
use super::viewport::Viewport;
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::services::{GraphSource, NotificationChannel, XhrGraphSource};

/// Everything the animation loop and event handlers share once mounted.
struct GraphContext {
	orchestrator: Rc<RefCell<Orchestrator>>,
	ctx: CanvasRenderingContext2d,
	theme: Theme,
	_channel: Option<NotificationChannel>,
}

/// Live force-directed view of the graph behind `config.data_url`.
///
/// Refetches and rebuilds on every `config.update_event` notification.
#[component]
pub fn GraphView(config: GraphConfig) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let status = RwSignal::new(LoadState::Idle);
	let context: Rc<RefCell<Option<GraphContext>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (context_init, animate_init) = (context.clone(), animate.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if context_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			warn!("graph-live: no window, not starting");
			return;
		};

		let parent = canvas.parent_element();
		let viewport = Viewport::from_container(
			parent.as_ref().map(|p| p.client_width() as f64),
			parent.as_ref().map(|p| p.client_height() as f64),
			&config.viewport,
		);
		canvas.set_width(viewport.width as u32);
		canvas.set_height(viewport.height as u32);

		let ctx = match context_2d(&canvas) {
			Ok(ctx) => ctx,
			Err(e) => {
				warn!("graph-live: {e}");
				return;
			}
		};

		let seed = config
			.seed
			.unwrap_or_else(|| (js_sys::Math::random() * u64::MAX as f64) as u64);
		let orchestrator = Rc::new(RefCell::new(Orchestrator::new(config.clone(), viewport, seed)));
		let source: Rc<dyn GraphSource> = Rc::new(XhrGraphSource::new(config.data_url.clone()));
		Orchestrator::refresh(&orchestrator, source.as_ref());

		let (weak, source_update) = (Rc::downgrade(&orchestrator), source.clone());
		let channel = match NotificationChannel::connect(&config.socket_url, &config.update_event, move || {
			if let Some(orchestrator) = weak.upgrade() {
				Orchestrator::refresh(&orchestrator, source_update.as_ref());
			}
		}) {
			Ok(channel) => Some(channel),
			Err(e) => {
				warn!("graph-live: {e}; live updates disabled");
				None
			}
		};

		info!(
			"graph-live: mounted {}x{} canvas",
			viewport.width, viewport.height
		);
		*context_init.borrow_mut() = Some(GraphContext {
			orchestrator,
			ctx,
			theme: Theme::by_name(&config.theme),
			_channel: channel,
		});

		let (context_anim, animate_inner) = (context_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref c) = *context_anim.borrow() {
				let mut orchestrator = c.orchestrator.borrow_mut();
				orchestrator.tick();
				if status.get_untracked() != orchestrator.state() {
					status.set(orchestrator.state());
				}
				let viewport = *orchestrator.viewport();
				render::render(orchestrator.scene(), &c.ctx, &c.theme, viewport.width, viewport.height);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let (Some(c), Some((x, y))) = (context_md.borrow().as_ref(), canvas_point(canvas_ref, &ev)) {
			c.orchestrator.borrow_mut().begin_drag(x, y);
		}
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		if let (Some(c), Some((x, y))) = (context_mm.borrow().as_ref(), canvas_point(canvas_ref, &ev)) {
			let mut orchestrator = c.orchestrator.borrow_mut();
			if orchestrator.is_dragging() {
				orchestrator.drag_to(x, y);
			}
		}
	};

	let context_mu = context.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(c) = context_mu.borrow().as_ref() {
			c.orchestrator.borrow_mut().end_drag();
		}
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(c) = context_ml.borrow().as_ref() {
			c.orchestrator.borrow_mut().end_drag();
		}
	};

	let context_dc = context.clone();
	let on_dblclick = move |ev: MouseEvent| {
		if let (Some(c), Some((x, y))) = (context_dc.borrow().as_ref(), canvas_point(canvas_ref, &ev)) {
			c.orchestrator.borrow_mut().release_at(x, y);
		}
	};

	view! {
		<div class="graph-view" style="position: relative; width: 100%; height: 100%;">
			<canvas
				node_ref=canvas_ref
				class="graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:dblclick=on_dblclick
				style="display: block; cursor: grab;"
			/>
			<div
				class="graph-status"
				class:graph-status-error=move || status.get() == LoadState::Error
				style:display=move || if status.get().message().is_some() { "block" } else { "none" }
			>
				{move || status.get().message().unwrap_or_default()}
			</div>
		</div>
	}
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, GraphError> {
	canvas
		.get_context("2d")
		.ok()
		.flatten()
		.and_then(|ctx| ctx.dyn_into().ok())
		.ok_or(GraphError::RenderTargetUnavailable)
}

/// Mouse position relative to the canvas' top-left corner.
fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}
