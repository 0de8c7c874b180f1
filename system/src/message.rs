use crate::error::ProtocolError;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub mod destination {
    // shared broadcast
    pub const TOPIC_CHAT: &str = "/topic/chat";
    pub const TOPIC_USERS: &str = "/topic/users";
    pub const TOPIC_SCOREBOARD: &str = "/topic/scoreboard";
    pub const TOPIC_DRAW: &str = "/topic/draw";
    pub const TOPIC_WORD_LEN: &str = "/topic/wordlen";
    pub const TOPIC_CANVAS_CLEAR: &str = "/topic/canvas/clear";
    pub const TOPIC_UNDO: &str = "/topic/undo";

    // per identity
    pub const QUEUE_USERS: &str = "/user/queue/users";
    pub const QUEUE_SCOREBOARD: &str = "/user/queue/scoreboard";
    pub const QUEUE_WORD: &str = "/user/queue/word";
    pub const QUEUE_WORD_LEN: &str = "/user/queue/wordlen";
    pub const QUEUE_DRAW: &str = "/user/queue/draw";
    pub const QUEUE_CANVAS_CLEAR: &str = "/user/queue/canvas/clear";
    pub const QUEUE_ERRORS: &str = "/user/queue/errors";
    pub const QUEUE_FORCE_LOGOUT: &str = "/user/queue/force-logout";

    // publish
    pub const APP_STATE_SYNC: &str = "/app/state.sync";
    pub const APP_CHAT_SEND: &str = "/app/chat.send";
    pub const APP_DRAW_STROKE: &str = "/app/draw.stroke";
    pub const APP_DRAW_UNDO: &str = "/app/draw.undo";
    pub const APP_CANVAS_CLEAR: &str = "/app/canvas.clear";
    pub const APP_SET_DRAWER: &str = "/app/admin.setDrawer";
    pub const APP_WORD_REROLL: &str = "/app/word.reroll";
    pub const APP_DRAWER_ME: &str = "/app/drawer.me";

    pub const SHARED_SUBSCRIPTIONS: [&str; 7] = [
        TOPIC_CHAT,
        TOPIC_USERS,
        TOPIC_SCOREBOARD,
        TOPIC_DRAW,
        TOPIC_WORD_LEN,
        TOPIC_CANVAS_CLEAR,
        TOPIC_UNDO,
    ];

    pub const PRIVATE_SUBSCRIPTIONS: [&str; 8] = [
        QUEUE_USERS,
        QUEUE_SCOREBOARD,
        QUEUE_WORD,
        QUEUE_WORD_LEN,
        QUEUE_DRAW,
        QUEUE_CANVAS_CLEAR,
        QUEUE_ERRORS,
        QUEUE_FORCE_LOGOUT,
    ];

    pub const PRIVATE_PREFIX: &str = "/user";
}

/// One atomic line draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(default)]
    pub color: String,
    pub width: f32,
    #[serde(default)]
    pub mode: StrokeMode,
    pub action_id: ActionId,
    #[serde(default)]
    pub new_stroke: bool,
}

impl Segment {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if ![self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ProtocolError::InvalidSegment("non-finite coordinate"));
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(ProtocolError::InvalidSegment("width must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub text: String,
    #[serde(default)]
    pub system: bool,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            from: "SYSTEM".into(),
            text: text.into(),
            system: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSend {
    pub from: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoardEntry {
    pub name: String,
    pub team: i32,
    pub score: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<ActionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDrawerRequest {
    pub name: String,
}

/// STOMP-like envelope carried in binary websocket messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Subscribe { destination: String },
    Send { destination: String, body: String },
    Message { destination: String, body: String },
}

impl Frame {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Frame, ProtocolError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A decoded message from one of the subscribed channels.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Chat(ChatMessage),
    Roster(Vec<String>),
    Scoreboard(Vec<ScoreBoardEntry>),
    Segment { segment: Segment, snapshot: bool },
    WordLength(u32),
    Clear { snapshot: bool },
    Undo(Option<ActionId>),
    SecretWord(Option<String>),
    Error(String),
    ForceLogout,
}

impl Inbound {
    pub fn decode(destination: &str, body: &str) -> Result<Inbound, ProtocolError> {
        use self::destination::*;

        let json = |destination: &str| {
            let d = destination.to_owned();
            move |source| ProtocolError::MalformedBody {
                destination: d,
                source,
            }
        };

        match destination {
            TOPIC_CHAT => serde_json::from_str(body)
                .map(Inbound::Chat)
                .map_err(json(destination)),
            TOPIC_USERS | QUEUE_USERS => serde_json::from_str(body)
                .map(Inbound::Roster)
                .map_err(json(destination)),
            TOPIC_SCOREBOARD | QUEUE_SCOREBOARD => serde_json::from_str(body)
                .map(Inbound::Scoreboard)
                .map_err(json(destination)),
            TOPIC_DRAW | QUEUE_DRAW => {
                let segment: Segment = serde_json::from_str(body).map_err(json(destination))?;
                segment.validate()?;
                Ok(Inbound::Segment {
                    segment,
                    snapshot: destination == QUEUE_DRAW,
                })
            }
            TOPIC_WORD_LEN | QUEUE_WORD_LEN => serde_json::from_str(body.trim())
                .map(Inbound::WordLength)
                .map_err(json(destination)),
            TOPIC_CANVAS_CLEAR => Ok(Inbound::Clear { snapshot: false }),
            QUEUE_CANVAS_CLEAR => Ok(Inbound::Clear { snapshot: true }),
            TOPIC_UNDO => {
                if body.trim().is_empty() {
                    return Ok(Inbound::Undo(None));
                }
                serde_json::from_str::<UndoCommand>(body)
                    .map(|command| Inbound::Undo(command.action_id))
                    .map_err(json(destination))
            }
            QUEUE_WORD => {
                let word = text_body(body);
                Ok(Inbound::SecretWord(if word.is_empty() {
                    None
                } else {
                    Some(word)
                }))
            }
            QUEUE_ERRORS => Ok(Inbound::Error(text_body(body))),
            QUEUE_FORCE_LOGOUT => Ok(Inbound::ForceLogout),
            _ => Err(ProtocolError::UnknownDestination(destination.to_owned())),
        }
    }
}

/// Plain-text bodies may arrive raw or as a JSON string.
fn text_body(body: &str) -> String {
    serde_json::from_str::<String>(body).unwrap_or_else(|_| body.to_owned())
}
