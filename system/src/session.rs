use crate::config::EngineConfig;
use crate::emitter::{StrokeEmitter, Tool};
use crate::error::SendError;
use crate::gateway::{ConnectionState, Gateway, Transport};
use crate::history::ActionHistory;
use crate::message::{ChatMessage, Inbound, ScoreBoardEntry, Segment};
use crate::roster::{self, RoleInfo, RosterEntry, StatusLine};
use crate::surface::Surface;
use crate::types::{ParticipantName, StrokeMode};
use crate::undo::{undo, UndoTarget};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

// Locally painted segments still waiting for their copy on the shared channel.
const UNECHOED_LIMIT: usize = 256;

pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Parts of the UI a handler changed since the last `consume_invalidated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Canvas,
    Roster,
    Scoreboard,
    Chat,
    Status,
    Tool,
    Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequestAvailability {
    /// Only plain participants get the control at all.
    pub offered: bool,
    pub ready: bool,
    pub remaining_secs: u64,
}

/// One participant's view of the game: wires gateway traffic into the
/// history, roster and chat state, and pointer input back out.
pub struct GameSession<T: Transport> {
    me: ParticipantName,
    config: EngineConfig,
    gateway: Gateway<T>,
    clock: Box<dyn Clock>,
    history: ActionHistory,
    emitter: StrokeEmitter,
    roster: Vec<RosterEntry>,
    role: RoleInfo,
    scoreboard: Vec<ScoreBoardEntry>,
    chat: VecDeque<ChatMessage>,
    secret_word: Option<String>,
    word_len: Option<u32>,
    unechoed: VecDeque<Segment>,
    last_live_draw_ms: Option<u64>,
    terminated: bool,
    invalidated: BTreeSet<View>,
}

impl<T: Transport> GameSession<T> {
    pub fn new(me: &str, config: EngineConfig, transport: T, clock: Box<dyn Clock>) -> Self {
        let history = ActionHistory::new(
            config.history_capacity,
            config.canvas_width,
            config.canvas_height,
        );
        log::debug!("GameSession created for {}: {:?}", me, config);
        Self {
            me: me.to_owned(),
            config,
            gateway: Gateway::new(transport),
            clock,
            history,
            emitter: StrokeEmitter::new(),
            roster: Vec::new(),
            role: RoleInfo::default(),
            scoreboard: Vec::new(),
            chat: VecDeque::new(),
            secret_word: None,
            word_len: None,
            unechoed: VecDeque::new(),
            last_live_draw_ms: None,
            terminated: false,
            invalidated: BTreeSet::new(),
        }
    }

    pub fn connect(&mut self) {
        if self.terminated {
            return;
        }
        self.gateway.begin_connect();
        self.invalidate(View::Connection);
    }

    pub fn on_open(&mut self) {
        if self.terminated {
            return;
        }
        self.gateway.on_open();
        self.push_chat(ChatMessage::system("Connected to the game."));
        self.invalidate(View::Connection);
    }

    pub fn on_close(&mut self) {
        self.gateway.on_close();
        self.emitter.pointer_up();
        self.invalidate(View::Connection);
    }

    /// Entry point for every inbound message. Bad payloads are logged and dropped.
    pub fn handle_message(&mut self, destination: &str, body: &str) {
        if self.terminated {
            return;
        }
        match self.gateway.decode(destination, body) {
            Ok(inbound) => self.dispatch(inbound),
            Err(e) => log::warn!("ignoring message: {}", e),
        }
    }

    fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Chat(message) => self.push_chat(message),
            Inbound::Roster(list) => self.apply_roster(&list),
            Inbound::Scoreboard(entries) => {
                self.scoreboard = entries;
                self.invalidate(View::Scoreboard);
            }
            Inbound::Segment { segment, snapshot } => {
                if !snapshot {
                    self.last_live_draw_ms = Some(self.clock.now_ms());
                    self.invalidate(View::Status);
                    if let Some(pos) = self.unechoed.iter().position(|s| *s == segment) {
                        // already painted by local echo
                        self.unechoed.remove(pos);
                        return;
                    }
                }
                self.history.append(segment);
                self.invalidate(View::Canvas);
            }
            Inbound::WordLength(len) => {
                self.word_len = Some(len);
                self.invalidate(View::Status);
            }
            Inbound::Clear { snapshot } => {
                // echoes still in flight belong to the board the server kept
                self.unechoed.clear();
                self.history.clear();
                self.invalidate(View::Canvas);
                if !snapshot {
                    self.emitter.set_mode(StrokeMode::Pen);
                    if !self.role.is_privileged() {
                        self.secret_word = None;
                    }
                    self.invalidate(View::Tool);
                    self.invalidate(View::Status);
                }
            }
            Inbound::Undo(action_id) => {
                if undo(&mut self.history, &UndoTarget::from(action_id)).is_some() {
                    self.invalidate(View::Canvas);
                }
            }
            Inbound::SecretWord(word) => {
                self.secret_word = word;
                self.invalidate(View::Status);
            }
            Inbound::Error(text) => {
                let text = if text.trim().is_empty() {
                    "The request was rejected.".to_owned()
                } else {
                    text
                };
                self.push_chat(ChatMessage::system(text));
            }
            Inbound::ForceLogout => self.terminate(),
        }
    }

    fn apply_roster(&mut self, list: &[String]) {
        self.roster = roster::parse_roster(list);
        let role = RoleInfo::derive(&self.roster, &self.me);
        if role != self.role {
            log::info!("role changed: {:?} -> {:?}", self.role, role);
        }
        self.role = role;
        if !role.is_drawer {
            self.emitter.pointer_up();
        }
        self.invalidate(View::Roster);
        self.invalidate(View::Status);
    }

    fn push_chat(&mut self, message: ChatMessage) {
        self.chat.push_back(message);
        while self.chat.len() > self.config.chat_log_limit {
            self.chat.pop_front();
        }
        self.invalidate(View::Chat);
    }

    /// Forced logout: fatal for this session.
    fn terminate(&mut self) {
        log::warn!("forced logout for {}", self.me);
        self.terminated = true;
        self.gateway.shutdown();
        self.emitter.pointer_up();
        self.history.clear();
        self.roster.clear();
        self.role = RoleInfo::default();
        self.secret_word = None;
        self.unechoed.clear();
        for view in &[
            View::Canvas,
            View::Roster,
            View::Status,
            View::Tool,
            View::Connection,
        ] {
            self.invalidate(*view);
        }
    }

    pub fn can_draw(&self) -> bool {
        !self.terminated && self.role.is_drawer && self.gateway.is_connected()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        if !self.can_draw() {
            return false;
        }
        self.emitter.pointer_down(x, y);
        true
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.can_draw() {
            self.emitter.pointer_up();
            return;
        }
        if let Some(segment) = self.emitter.pointer_move(x, y) {
            if self.gateway.send_segment(&segment).is_ok() {
                if self.unechoed.len() >= UNECHOED_LIMIT {
                    self.unechoed.pop_front();
                }
                self.unechoed.push_back(segment.clone());
                self.history.append(segment);
                self.invalidate(View::Canvas);
            }
        }
    }

    pub fn pointer_up(&mut self) {
        self.emitter.pointer_up();
    }

    pub fn tool(&self) -> &Tool {
        self.emitter.tool()
    }

    pub fn set_color(&mut self, color: &str) {
        self.emitter.set_color(color);
        self.invalidate(View::Tool);
    }

    pub fn set_width(&mut self, width: f32) {
        self.emitter.set_width(width);
        self.invalidate(View::Tool);
    }

    pub fn toggle_eraser(&mut self) -> StrokeMode {
        self.invalidate(View::Tool);
        self.emitter.toggle_eraser()
    }

    pub fn send_chat(&mut self, text: &str) -> Result<(), SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.gateway.send_chat(&self.me, text)
    }

    /// Asks the server to undo the newest action we know of.
    pub fn request_undo(&mut self) -> Result<(), SendError> {
        let latest = self.history.current().map(|a| a.id.clone());
        self.gateway.send_undo(latest.as_ref())
    }

    pub fn request_clear(&mut self) -> Result<(), SendError> {
        self.gateway.send_clear()
    }

    pub fn set_drawer(&mut self, name: &str) -> Result<(), SendError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        self.gateway.send_set_drawer(name)
    }

    pub fn reroll_word(&mut self) -> Result<(), SendError> {
        self.gateway.send_reroll_word()
    }

    pub fn request_draw(&mut self) -> Result<(), SendError> {
        self.gateway.send_draw_request()
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.gateway.state()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut Gateway<T> {
        &mut self.gateway
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn surface(&self) -> &Surface {
        self.history.live()
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn display_roster(&self) -> Vec<RosterEntry> {
        roster::sorted_for_display(&self.roster)
    }

    pub fn role(&self) -> RoleInfo {
        self.role
    }

    pub fn scoreboard(&self) -> &[ScoreBoardEntry] {
        &self.scoreboard
    }

    pub fn chat(&self) -> impl Iterator<Item = &ChatMessage> + '_ {
        self.chat.iter()
    }

    pub fn secret_word(&self) -> Option<&str> {
        self.secret_word.as_deref()
    }

    pub fn word_len(&self) -> Option<u32> {
        self.word_len
    }

    pub fn status_line(&self) -> StatusLine {
        StatusLine::derive(
            self.role,
            roster::drawer_name(&self.roster),
            self.secret_word.as_deref(),
            self.word_len,
        )
    }

    /// Advisory only; the server decides who may take over.
    pub fn draw_request_availability(&self) -> DrawRequestAvailability {
        let offered = !self.role.is_drawer && !self.role.is_admin;
        let remaining_ms = self
            .last_live_draw_ms
            .map(|last| {
                let elapsed = self.clock.now_ms().saturating_sub(last);
                self.config.draw_request_cooldown_ms.saturating_sub(elapsed)
            })
            .unwrap_or(0);
        DrawRequestAvailability {
            offered,
            ready: remaining_ms == 0,
            remaining_secs: remaining_ms.saturating_add(999) / 1000,
        }
    }

    fn invalidate(&mut self, view: View) {
        self.invalidated.insert(view);
    }

    pub fn consume_invalidated(&mut self) -> Vec<View> {
        let views = self.invalidated.iter().copied().collect();
        self.invalidated.clear();
        views
    }
}
