use crate::error::{ProtocolError, SendError};
use crate::message::destination::*;
use crate::message::*;
use crate::types::ActionId;
use serde::Serialize;

/// The socket underneath the gateway. Implementations deliver frames in call
/// order; they never see a call while the gateway is not connected.
pub trait Transport {
    fn subscribe(&mut self, destination: &str);
    fn publish(&mut self, destination: &str, body: String);
    fn close(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct Gateway<T: Transport> {
    transport: T,
    state: ConnectionState,
}

impl<T: Transport> Gateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn begin_connect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            log::info!("connecting");
            self.state = ConnectionState::Connecting;
        }
    }

    /// Socket is open: subscribe everything, then ask for the full state.
    pub fn on_open(&mut self) {
        if self.state == ConnectionState::Connected {
            return;
        }
        self.state = ConnectionState::Connected;
        log::info!("connected");
        for destination in SHARED_SUBSCRIPTIONS.iter().chain(PRIVATE_SUBSCRIPTIONS.iter()) {
            log::trace!("subscribe {}", destination);
            self.transport.subscribe(destination);
        }
        self.transport.publish(APP_STATE_SYNC, "{}".into());
    }

    pub fn on_close(&mut self) {
        if self.state != ConnectionState::Disconnected {
            log::info!("disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Deliberate teardown, e.g. after a forced logout.
    pub fn shutdown(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.transport.close();
        }
        self.on_close();
    }

    pub fn decode(&self, destination: &str, body: &str) -> Result<Inbound, ProtocolError> {
        Inbound::decode(destination, body)
    }

    fn publish<P: Serialize>(&mut self, destination: &str, payload: &P) -> Result<(), SendError> {
        if !self.is_connected() {
            log::debug!("dropping {} while {:?}", destination, self.state);
            return Err(SendError::NotConnected);
        }
        match serde_json::to_string(payload) {
            Ok(body) => {
                self.transport.publish(destination, body);
                Ok(())
            }
            Err(e) => {
                // plain records only; serialization can't fail in practice
                log::warn!("could not encode {}: {}", destination, e);
                Ok(())
            }
        }
    }

    pub fn send_chat(&mut self, from: &str, text: &str) -> Result<(), SendError> {
        self.publish(
            APP_CHAT_SEND,
            &ChatSend {
                from: from.to_owned(),
                text: text.to_owned(),
            },
        )
    }

    pub fn send_segment(&mut self, segment: &Segment) -> Result<(), SendError> {
        self.publish(APP_DRAW_STROKE, segment)
    }

    pub fn send_undo(&mut self, action_id: Option<&ActionId>) -> Result<(), SendError> {
        self.publish(
            APP_DRAW_UNDO,
            &UndoCommand {
                action_id: action_id.cloned(),
            },
        )
    }

    pub fn send_clear(&mut self) -> Result<(), SendError> {
        self.publish(APP_CANVAS_CLEAR, &serde_json::json!({}))
    }

    pub fn send_set_drawer(&mut self, name: &str) -> Result<(), SendError> {
        self.publish(
            APP_SET_DRAWER,
            &SetDrawerRequest {
                name: name.to_owned(),
            },
        )
    }

    pub fn send_reroll_word(&mut self) -> Result<(), SendError> {
        self.publish(APP_WORD_REROLL, &serde_json::json!({}))
    }

    pub fn send_draw_request(&mut self) -> Result<(), SendError> {
        self.publish(APP_DRAWER_ME, &serde_json::json!({}))
    }
}
