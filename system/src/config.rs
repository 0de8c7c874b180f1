use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
pub const DEFAULT_CANVAS_WIDTH: u32 = 770;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Undoable actions kept before the oldest is baked. At least 1.
    pub history_capacity: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub chat_log_limit: usize,
    /// How long after a live stroke "request to draw" stays unavailable.
    pub draw_request_cooldown_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            chat_log_limit: 200,
            draw_request_cooldown_ms: 30_000,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON object; missing keys keep their defaults, blank input means all defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}
