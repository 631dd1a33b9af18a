//! Change notifications pushed by the server.
//!
//! The server speaks socket.io over a plain WebSocket (engine.io protocol v4).
//! Only the handful of packets needed to stay connected and receive events are
//! understood; everything else is ignored.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info, warn};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, MessageEvent, WebSocket};

use crate::error::GraphError;

/// Meaning of one text frame received on the socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
	/// engine.io handshake; answer with a namespace connect.
	Open,
	/// engine.io heartbeat; answer with a pong.
	Ping,
	/// A named event. Payloads are ignored.
	Event(String),
	Other,
}

/// Classify a text frame.
///
/// Besides socket.io packets (`0{..}`, `2`, `42["name", ..]`), bare JSON
/// (`{"event": "name"}` or `["name", ..]`) and bare event names are accepted
/// so simpler servers can push to the same endpoint.
pub fn parse_frame(text: &str) -> Frame {
	let text = text.trim();
	let Some(first) = text.chars().next() else {
		return Frame::Other;
	};
	match first {
		'{' | '[' => json_event(text).map_or(Frame::Other, Frame::Event),
		'0' => Frame::Open,
		'2' if text.len() == 1 => Frame::Ping,
		'4' => match text[1..].strip_prefix('2') {
			Some(packet) => socket_io_event(packet).map_or(Frame::Other, Frame::Event),
			None => Frame::Other,
		},
		c if c.is_ascii_digit() => Frame::Other,
		_ => Frame::Event(text.to_string()),
	}
}

/// Strip the optional namespace and ack id from a socket.io EVENT packet.
fn socket_io_event(packet: &str) -> Option<String> {
	let packet = match packet.strip_prefix('/') {
		Some(rest) => &rest[rest.find(',')? + 1..],
		None => packet,
	};
	let body = packet.trim_start_matches(|c: char| c.is_ascii_digit());
	json_event(body)
}

fn json_event(text: &str) -> Option<String> {
	let value: Value = serde_json::from_str(text).ok()?;
	let name = match &value {
		Value::Array(items) => items.first()?,
		Value::Object(map) => map.get("event")?,
		_ => return None,
	};
	name.as_str().map(str::to_string)
}

/// First reconnect delay after the socket closes.
const RETRY_BASE_MS: u32 = 1_000;
/// Longest wait between reconnect attempts.
const RETRY_MAX_MS: u32 = 5_000;

/// Wait before reconnect attempt `attempt` (counting from zero): doubling
/// from [`RETRY_BASE_MS`] up to [`RETRY_MAX_MS`].
pub fn retry_delay_ms(attempt: u32) -> u32 {
	RETRY_BASE_MS
		.saturating_mul(1 << attempt.min(16))
		.min(RETRY_MAX_MS)
}

/// A live notification subscription.
///
/// The socket is reopened with [`retry_delay_ms`] backoff whenever it closes.
/// Dropping the channel stops retrying and closes the socket.
pub struct NotificationChannel {
	shared: Rc<Shared>,
}

/// State the socket callbacks reach through weak references.
struct Shared {
	url: String,
	event: String,
	on_update: RefCell<Box<dyn FnMut()>>,
	socket: RefCell<Option<Attached>>,
	retry: RefCell<Option<(i32, Closure<dyn FnMut()>)>>,
	attempts: Cell<u32>,
	closed: Cell<bool>,
}

/// One socket together with the handlers registered on it.
struct Attached {
	socket: WebSocket,
	_onmessage: Closure<dyn FnMut(MessageEvent)>,
	_onclose: Closure<dyn FnMut(Event)>,
	_onerror: Closure<dyn FnMut(Event)>,
}

impl Attached {
	fn detach(self) {
		self.socket.set_onmessage(None);
		self.socket.set_onclose(None);
		self.socket.set_onerror(None);
		let _ = self.socket.close();
	}
}

impl NotificationChannel {
	/// Connect to `url` and call `on_update` for every event named `event`.
	pub fn connect(url: &str, event: &str, on_update: impl FnMut() + 'static) -> Result<Self, GraphError> {
		let shared = Rc::new(Shared {
			url: url.to_string(),
			event: event.to_string(),
			on_update: RefCell::new(Box::new(on_update)),
			socket: RefCell::new(None),
			retry: RefCell::new(None),
			attempts: Cell::new(0),
			closed: Cell::new(false),
		});
		Shared::attach(&shared)?;
		info!("graph-live: listening for updates on {url}");
		Ok(Self { shared })
	}
}

impl Shared {
	/// Open a fresh socket, replacing the previous one.
	fn attach(this: &Rc<Self>) -> Result<(), GraphError> {
		let socket = WebSocket::new(&this.url).map_err(|e| GraphError::Socket(format!("{e:?}")))?;

		let (weak, reply) = (Rc::downgrade(this), socket.clone());
		let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |msg: MessageEvent| {
			if let (Some(shared), Some(text)) = (weak.upgrade(), msg.data().as_string()) {
				shared.handle(&reply, &text);
			}
		});
		let weak = Rc::downgrade(this);
		let onclose = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
			if let Some(shared) = weak.upgrade() {
				Shared::schedule_retry(&shared);
			}
		});
		let onerror = Closure::<dyn FnMut(Event)>::new(|_: Event| {
			warn!("graph-live: notification channel error");
		});
		socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
		socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
		socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));

		let previous = this.socket.borrow_mut().replace(Attached {
			socket,
			_onmessage: onmessage,
			_onclose: onclose,
			_onerror: onerror,
		});
		if let Some(previous) = previous {
			previous.detach();
		}
		Ok(())
	}

	fn handle(&self, reply: &WebSocket, text: &str) {
		match parse_frame(text) {
			Frame::Open => {
				self.attempts.set(0);
				let _ = reply.send_with_str("40");
			}
			Frame::Ping => {
				let _ = reply.send_with_str("3");
			}
			Frame::Event(name) if name == self.event => {
				info!("graph-live: received {name}");
				let mut on_update = self.on_update.borrow_mut();
				(*on_update)();
			}
			Frame::Event(name) => debug!("graph-live: ignoring event {name}"),
			Frame::Other => {}
		}
	}

	/// Arrange for [`attach`](Self::attach) to run after the next backoff delay.
	///
	/// Runs from the closed socket's own `onclose`, so that socket's handlers
	/// are only released once the timer fires.
	fn schedule_retry(this: &Rc<Self>) {
		if this.closed.get() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let attempt = this.attempts.get();
		this.attempts.set(attempt.saturating_add(1));
		let delay = retry_delay_ms(attempt);
		warn!("graph-live: notification channel closed, reconnecting in {delay} ms");

		let weak = Rc::downgrade(this);
		let retry = Closure::<dyn FnMut()>::new(move || {
			let Some(shared) = weak.upgrade() else {
				return;
			};
			if shared.closed.get() {
				return;
			}
			if let Err(e) = Shared::attach(&shared) {
				warn!("graph-live: {e}; live updates disabled");
			}
		});
		match window.set_timeout_with_callback_and_timeout_and_arguments_0(
			retry.as_ref().unchecked_ref(),
			delay as i32,
		) {
			Ok(handle) => *this.retry.borrow_mut() = Some((handle, retry)),
			Err(e) => warn!("graph-live: could not schedule reconnect: {e:?}"),
		}
	}
}

impl Drop for NotificationChannel {
	fn drop(&mut self) {
		self.shared.closed.set(true);
		if let Some((handle, _)) = self.shared.retry.borrow_mut().take() {
			if let Some(window) = web_sys::window() {
				window.clear_timeout_with_handle(handle);
			}
		}
		if let Some(attached) = self.shared.socket.borrow_mut().take() {
			attached.detach();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn engine_io_control_frames() {
		assert_eq!(parse_frame(r#"0{"sid":"abc","pingInterval":25000}"#), Frame::Open);
		assert_eq!(parse_frame("2"), Frame::Ping);
		assert_eq!(parse_frame("3"), Frame::Other);
		assert_eq!(parse_frame("40"), Frame::Other);
		assert_eq!(parse_frame(""), Frame::Other);
	}

	#[test]
	fn socket_io_events() {
		assert_eq!(
			parse_frame(r#"42["graph-update",{"changed":"A"}]"#),
			Frame::Event("graph-update".into())
		);
		assert_eq!(parse_frame(r#"42/admin,["graph-update"]"#), Frame::Event("graph-update".into()));
		assert_eq!(parse_frame(r#"4217["graph-update",null]"#), Frame::Event("graph-update".into()));
		assert_eq!(parse_frame("42not json"), Frame::Other);
	}

	#[test]
	fn reconnect_delay_doubles_up_to_the_cap() {
		let delays: Vec<u32> = (0..5).map(retry_delay_ms).collect();
		assert_eq!(delays, [1_000, 2_000, 4_000, 5_000, 5_000]);
		assert_eq!(retry_delay_ms(u32::MAX), 5_000);
	}

	#[test]
	fn plain_events() {
		assert_eq!(parse_frame(r#"{"event":"graph-update","data":1}"#), Frame::Event("graph-update".into()));
		assert_eq!(parse_frame(r#"["graph-update"]"#), Frame::Event("graph-update".into()));
		assert_eq!(parse_frame(" graph-update \n"), Frame::Event("graph-update".into()));
		assert_eq!(parse_frame(r#"{"data":1}"#), Frame::Other);
	}
}
