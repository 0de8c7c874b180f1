mod outbox;
mod utils;

use drawsync_system::serde::Serialize;
use drawsync_system::{serde_json, Clock, EngineConfig, Frame, GameSession, StrokeMode};
use outbox::Outbox;
use serde_json::json;
use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// Browser handle for one participant. The page owns the socket: it feeds
/// received frames in, pumps `consume_pending_frame` out, and repaints the
/// views reported by `consume_invalidated`.
#[wasm_bindgen]
pub struct DrawClient {
    session: GameSession<Outbox>,
}

#[wasm_bindgen]
impl DrawClient {
    #[wasm_bindgen(constructor)]
    pub fn new(me: String, config_json: String) -> Result<DrawClient, JsValue> {
        utils::set_panic_hook();
        utils::init_logger();

        let config = EngineConfig::from_json(&config_json)
            .map_err(|e| JsValue::from_str(&format!("invalid config: {}", e)))?;
        Ok(DrawClient {
            session: GameSession::new(&me, config, Outbox::default(), Box::new(JsClock)),
        })
    }

    pub fn connect(&mut self) {
        self.session.connect();
    }

    pub fn on_open(&mut self) {
        self.session.on_open();
    }

    pub fn on_close(&mut self) {
        self.session.on_close();
    }

    /// A binary websocket message from the server.
    pub fn handle_frame(&mut self, bytes: &[u8]) {
        match Frame::decode(bytes) {
            Ok(Frame::Message { destination, body }) => {
                self.session.handle_message(&destination, &body)
            }
            Ok(other) => log::warn!("unexpected frame from server: {:?}", other),
            Err(e) => log::warn!("undecodable frame: {}", e),
        }
    }

    /// For text transports that already split destination and body.
    pub fn handle_message(&mut self, destination: &str, body: &str) {
        self.session.handle_message(destination, body);
    }

    pub fn consume_pending_frame(&mut self) -> Option<Box<[u8]>> {
        let frame = self.session.gateway_mut().transport_mut().pop()?;
        log::trace!("consumed: {:?}", frame);
        match frame.encode() {
            Ok(bytes) => Some(bytes.into_boxed_slice()),
            Err(e) => {
                log::error!("could not encode frame: {}", e);
                None
            }
        }
    }

    /// Same queue as `consume_pending_frame`, as JSON.
    pub fn consume_pending_frame_json(&mut self) -> Option<String> {
        let frame = self.session.gateway_mut().transport_mut().pop()?;
        serde_json::to_string(&frame).ok()
    }

    /// True once after the session decided the socket must go.
    pub fn consume_close_request(&mut self) -> bool {
        self.session.gateway_mut().transport_mut().take_close_request()
    }

    pub fn consume_invalidated(&mut self) -> String {
        to_json(&self.session.consume_invalidated())
    }

    // pointer + tool

    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        self.session.pointer_down(x, y)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.session.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self) {
        self.session.pointer_up();
    }

    pub fn set_color(&mut self, color: &str) {
        self.session.set_color(color);
    }

    pub fn set_width(&mut self, width: f32) {
        self.session.set_width(width);
    }

    pub fn toggle_eraser(&mut self) -> bool {
        self.session.toggle_eraser() == StrokeMode::Eraser
    }

    // requests; false means the message was dropped

    pub fn send_chat(&mut self, text: &str) -> bool {
        self.session.send_chat(text).is_ok()
    }

    pub fn request_undo(&mut self) -> bool {
        self.session.request_undo().is_ok()
    }

    pub fn request_clear(&mut self) -> bool {
        self.session.request_clear().is_ok()
    }

    pub fn set_drawer(&mut self, name: &str) -> bool {
        self.session.set_drawer(name).is_ok()
    }

    pub fn reroll_word(&mut self) -> bool {
        self.session.reroll_word().is_ok()
    }

    pub fn request_draw(&mut self) -> bool {
        self.session.request_draw().is_ok()
    }

    // views

    pub fn canvas_width(&self) -> u32 {
        self.session.surface().width()
    }

    pub fn canvas_height(&self) -> u32 {
        self.session.surface().height()
    }

    /// RGBA bytes for `new ImageData(...)`.
    pub fn pixels(&self) -> Vec<u8> {
        self.session.surface().as_rgba().to_vec()
    }

    pub fn roster(&self) -> String {
        to_json(&self.session.display_roster())
    }

    pub fn scoreboard(&self) -> String {
        to_json(self.session.scoreboard())
    }

    pub fn chat(&self) -> String {
        to_json(&self.session.chat().collect::<Vec<_>>())
    }

    pub fn role(&self) -> String {
        to_json(&self.session.role())
    }

    pub fn status(&self) -> String {
        let status = self.session.status_line();
        to_json(&json!({ "text": status.to_string(), "detail": status }))
    }

    pub fn tool(&self) -> String {
        let tool = self.session.tool();
        to_json(&json!({
            "color": tool.color,
            "width": tool.width,
            "mode": tool.mode,
        }))
    }

    pub fn draw_request(&self) -> String {
        to_json(&self.session.draw_request_availability())
    }

    pub fn connection_state(&self) -> String {
        format!("{:?}", self.session.connection_state())
    }

    pub fn can_draw(&self) -> bool {
        self.session.can_draw()
    }

    pub fn is_terminated(&self) -> bool {
        self.session.is_terminated()
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("could not serialize view: {}", e);
        "null".to_owned()
    })
}
