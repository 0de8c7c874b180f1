use crate::config::RoomConfig;
use crate::stroke_log::StrokeLog;
use crate::words::{self, WordBook};
use drawsync_system::destination::*;
use drawsync_system::{
    serde_json, ActionId, ChatMessage, ChatSend, Role, ScoreBoardEntry, Segment, SetDrawerRequest,
    StrokeMode, UndoCommand,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;

/// Something the room wants on the wire. The server maps names to
/// connections and destinations to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Broadcast {
        destination: &'static str,
        body: String,
    },
    ToUser {
        name: String,
        destination: &'static str,
        body: String,
    },
    /// Close whichever connection currently holds this name.
    Kick { name: String },
}

/// Rejections reported back to the requester on the error queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("The room is full ({0} online).")]
    Full(usize),
    #[error("Only the admin can choose the drawer.")]
    AdminOnly,
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),
    #[error("The drawer is still drawing. Try again in {0} s.")]
    Cooldown(u64),
}

#[derive(Debug, Clone)]
struct Participant {
    role: Role,
    score: i32,
    team: i32,
}

impl Default for Participant {
    fn default() -> Self {
        Self {
            role: Role::Participant,
            score: 0,
            team: 0,
        }
    }
}

/// A stroke as drawers send it; mode and id may be missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrokeRequest {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    #[serde(default)]
    color: String,
    width: f32,
    #[serde(default)]
    mode: Option<StrokeMode>,
    #[serde(default)]
    action_id: Option<String>,
    #[serde(default)]
    new_stroke: bool,
}

impl StrokeRequest {
    fn into_segment(self) -> Segment {
        let (action_id, new_stroke) = match self.action_id {
            Some(id) if !id.trim().is_empty() => (ActionId::from(id), self.new_stroke),
            _ => (ActionId::generate(), true),
        };
        Segment {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y2,
            color: self.color,
            width: self.width,
            mode: self.mode.unwrap_or_default(),
            action_id,
            new_stroke,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UndoBroadcast<'a> {
    action_id: &'a ActionId,
}

/// The whole game: who is online with which role, the word, the scores and
/// the stroke log. Every entry point runs to completion and returns what has
/// to be sent.
pub struct Room {
    config: RoomConfig,
    words: WordBook,
    rng: StdRng,
    // roles and scores outlive connections
    participants: HashMap<String, Participant>,
    online: Vec<String>,
    current_word: Option<String>,
    strokes: StrokeLog,
    last_draw_at: Option<Instant>,
}

impl Room {
    pub fn new(config: RoomConfig, words: WordBook) -> Self {
        Self::with_rng(config, words, StdRng::from_entropy())
    }

    pub fn with_rng(config: RoomConfig, words: WordBook, rng: StdRng) -> Self {
        let strokes = StrokeLog::new(config.limits);
        Self {
            config,
            words,
            rng,
            participants: HashMap::new(),
            online: Vec::new(),
            current_word: None,
            strokes,
            last_draw_at: None,
        }
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.online.iter().any(|n| n == name)
    }

    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    pub fn role_of(&self, name: &str) -> Option<Role> {
        self.participants.get(name).map(|p| p.role)
    }

    pub fn current_word(&self) -> Option<&str> {
        self.current_word.as_deref()
    }

    pub fn strokes(&self) -> &StrokeLog {
        &self.strokes
    }

    pub fn join(&mut self, name: &str) -> Result<Vec<Delivery>, RoomError> {
        let mut out = Vec::new();
        if self.is_online(name) {
            log::info!("{} connected again, closing the older connection", name);
            out.push(to_user(name, QUEUE_FORCE_LOGOUT, String::new()));
            out.push(Delivery::Kick {
                name: name.to_owned(),
            });
        } else if self.online.len() >= self.config.max_online {
            return Err(RoomError::Full(self.online.len()));
        } else {
            self.online.push(name.to_owned());
        }

        let participant = self.participants.entry(name.to_owned()).or_default();
        if name == self.config.admin_name {
            participant.role = Role::Admin;
        }
        log::info!("{} joined ({} online)", name, self.online.len());

        self.publish_roster_and_scoreboard(&mut out);
        Ok(out)
    }

    pub fn leave(&mut self, name: &str) -> Vec<Delivery> {
        let mut out = Vec::new();
        if let Some(pos) = self.online.iter().position(|n| n == name) {
            self.online.remove(pos);
            log::info!("{} left ({} online)", name, self.online.len());
            self.publish_roster_and_scoreboard(&mut out);
        }
        out
    }

    /// One client publish. Rejections come back as a private error line;
    /// requests from the wrong role that the client never offers are dropped.
    pub fn handle(
        &mut self,
        from: &str,
        destination: &str,
        body: &str,
        now: Instant,
    ) -> Vec<Delivery> {
        if !self.participants.contains_key(from) {
            log::warn!("{} is not in the room, ignoring {}", from, destination);
            return Vec::new();
        }
        let result = match destination {
            APP_STATE_SYNC => Ok(self.state_sync(from)),
            APP_CHAT_SEND => Ok(parse::<ChatSend>(destination, body)
                .map(|chat| self.chat(from, &chat.text))
                .unwrap_or_default()),
            APP_DRAW_STROKE => Ok(parse::<StrokeRequest>(destination, body)
                .map(|stroke| self.stroke(from, stroke, now))
                .unwrap_or_default()),
            APP_DRAW_UNDO => {
                let command = if body.trim().is_empty() {
                    Some(UndoCommand::default())
                } else {
                    parse(destination, body)
                };
                Ok(command
                    .map(|command| self.undo(from, command))
                    .unwrap_or_default())
            }
            APP_CANVAS_CLEAR => Ok(self.clear(from)),
            APP_SET_DRAWER => match parse::<SetDrawerRequest>(destination, body) {
                Some(request) => self.set_drawer(from, request.name.trim()),
                None => Ok(Vec::new()),
            },
            APP_WORD_REROLL => Ok(self.reroll(from)),
            APP_DRAWER_ME => self.draw_request(from, now),
            _ => {
                log::warn!("{} published to unknown destination {}", from, destination);
                Ok(Vec::new())
            }
        };
        match result {
            Ok(out) => out,
            Err(e) => {
                log::info!("rejected {} from {}: {}", destination, from, e);
                vec![to_user(from, QUEUE_ERRORS, json(&e.to_string()))]
            }
        }
    }

    fn state_sync(&self, name: &str) -> Vec<Delivery> {
        let mut out = vec![
            to_user(name, QUEUE_USERS, json(&self.roster())),
            to_user(name, QUEUE_SCOREBOARD, json(&self.scoreboard())),
            to_user(
                name,
                QUEUE_WORD_LEN,
                json(&words::word_len(self.current_word.as_deref())),
            ),
        ];
        if let Some(word) = &self.current_word {
            if matches!(self.role_of(name), Some(Role::Drawer) | Some(Role::Admin)) {
                out.push(to_user(name, QUEUE_WORD, json(word)));
            }
        }
        out.push(to_user(name, QUEUE_CANVAS_CLEAR, String::new()));
        out.extend(
            self.strokes
                .segments()
                .map(|segment| to_user(name, QUEUE_DRAW, json(segment))),
        );
        log::debug!(
            "state sync for {}: {} segments",
            name,
            self.strokes.total_segments()
        );
        out
    }

    fn is_drawer(&self, name: &str) -> bool {
        self.role_of(name) == Some(Role::Drawer)
    }

    fn stroke(&mut self, from: &str, request: StrokeRequest, now: Instant) -> Vec<Delivery> {
        if !self.is_drawer(from) {
            log::debug!("ignoring stroke from non-drawer {}", from);
            return Vec::new();
        }
        let segment = request.into_segment();
        if let Err(e) = segment.validate() {
            log::warn!("ignoring stroke from {}: {}", from, e);
            return Vec::new();
        }
        let body = json(&segment);
        self.strokes.append(segment, now);
        self.last_draw_at = Some(now);
        vec![broadcast(TOPIC_DRAW, body)]
    }

    fn undo(&mut self, from: &str, command: UndoCommand) -> Vec<Delivery> {
        if !self.is_drawer(from) {
            log::debug!("ignoring undo from non-drawer {}", from);
            return Vec::new();
        }
        match self.strokes.remove(command.action_id.as_ref()) {
            Some(action_id) => vec![broadcast(
                TOPIC_UNDO,
                json(&UndoBroadcast {
                    action_id: &action_id,
                }),
            )],
            None => Vec::new(),
        }
    }

    fn clear(&mut self, from: &str) -> Vec<Delivery> {
        if !self.is_drawer(from) {
            log::debug!("ignoring clear from non-drawer {}", from);
            return Vec::new();
        }
        self.strokes.clear();
        vec![broadcast(TOPIC_CANVAS_CLEAR, String::new())]
    }

    fn set_drawer(&mut self, from: &str, target: &str) -> Result<Vec<Delivery>, RoomError> {
        if self.role_of(from) != Some(Role::Admin) {
            return Err(RoomError::AdminOnly);
        }
        if !self.participants.contains_key(target) {
            return Err(RoomError::UnknownParticipant(target.to_owned()));
        }
        let word = self.words.pick(&mut self.rng);
        log::info!("{} made {} the drawer", from, target);
        Ok(self.start_round(target, word, None))
    }

    fn reroll(&mut self, from: &str) -> Vec<Delivery> {
        if !self.is_drawer(from) {
            log::debug!("ignoring reroll from non-drawer {}", from);
            return Vec::new();
        }
        let word = self
            .words
            .pick_other(&mut self.rng, self.current_word.as_deref());
        let message = format!("{} asked for a new word.", from);
        self.start_round(from, word, Some(message))
    }

    fn draw_request(&mut self, from: &str, now: Instant) -> Result<Vec<Delivery>, RoomError> {
        if let Some(last) = self.last_draw_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.config.draw_cooldown {
                let remaining = self.config.draw_cooldown - elapsed;
                return Err(RoomError::Cooldown(remaining.as_secs() + 1));
            }
        }
        if self.is_drawer(from) {
            return Ok(Vec::new());
        }
        let word = self.words.pick(&mut self.rng);
        let message = format!("{} is now the drawer.", from);
        Ok(self.start_round(from, word, Some(message)))
    }

    fn chat(&mut self, from: &str, raw: &str) -> Vec<Delivery> {
        let text = raw.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let role = self.role_of(from).unwrap_or(Role::Participant);
        let is_answer = self.current_word.as_deref() == Some(text);

        if is_answer && role != Role::Participant {
            // the drawer and admin can't leak the word
            let masked = words::mask(text);
            return vec![broadcast(TOPIC_CHAT, json(&chat_line(from, &masked)))];
        }

        let mut out = vec![broadcast(TOPIC_CHAT, json(&chat_line(from, raw)))];
        if is_answer {
            if let Some(winner) = self.participants.get_mut(from) {
                winner.score += 1;
            }
            log::info!("{} guessed {:?}", from, text);
            let word = self
                .words
                .pick_other(&mut self.rng, self.current_word.as_deref());
            let message = format!("{} got it! [{}]", from, text);
            out.extend(self.start_round(from, word, Some(message)));
        }
        out
    }

    /// Hands the pen to `drawer` with a fresh word and tells everyone.
    fn start_round(
        &mut self,
        drawer: &str,
        word: String,
        message: Option<String>,
    ) -> Vec<Delivery> {
        for participant in self.participants.values_mut() {
            if participant.role == Role::Drawer {
                participant.role = Role::Participant;
            }
        }
        if let Some(participant) = self.participants.get_mut(drawer) {
            participant.role = Role::Drawer;
        }
        log::info!("new round: {} draws {:?}", drawer, word);
        self.current_word = Some(word);
        self.strokes.clear();

        let word_body = json(&self.current_word);
        let mut out = vec![
            broadcast(TOPIC_CANVAS_CLEAR, String::new()),
            to_user(drawer, QUEUE_WORD, word_body.clone()),
        ];
        let admin = &self.config.admin_name;
        if admin != drawer && self.is_online(admin) {
            out.push(to_user(admin, QUEUE_WORD, word_body));
        }
        if let Some(message) = message {
            out.push(broadcast(TOPIC_CHAT, json(&ChatMessage::system(message))));
        }
        self.publish_roster_and_scoreboard(&mut out);
        out.push(broadcast(
            TOPIC_WORD_LEN,
            json(&words::word_len(self.current_word.as_deref())),
        ));
        out
    }

    /// `"name (ROLE)"` for everyone online, in join order.
    fn roster(&self) -> Vec<String> {
        self.online
            .iter()
            .map(|name| {
                let role = self.role_of(name).unwrap_or(Role::Participant);
                format!("{} ({})", name, role)
            })
            .collect()
    }

    fn scoreboard(&self) -> Vec<ScoreBoardEntry> {
        let mut entries: Vec<ScoreBoardEntry> = self
            .participants
            .iter()
            .filter(|(_, p)| p.score > 0)
            .map(|(name, p)| ScoreBoardEntry {
                name: name.clone(),
                team: p.team,
                score: p.score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        entries
    }

    fn publish_roster_and_scoreboard(&self, out: &mut Vec<Delivery>) {
        out.push(broadcast(TOPIC_USERS, json(&self.roster())));
        out.push(broadcast(TOPIC_SCOREBOARD, json(&self.scoreboard())));
    }
}

fn chat_line(from: &str, text: &str) -> ChatMessage {
    ChatMessage {
        from: from.to_owned(),
        text: text.to_owned(),
        system: false,
    }
}

fn broadcast(destination: &'static str, body: String) -> Delivery {
    Delivery::Broadcast { destination, body }
}

fn to_user(name: &str, destination: &'static str, body: String) -> Delivery {
    Delivery::ToUser {
        name: name.to_owned(),
        destination,
        body,
    }
}

fn json<P: Serialize + ?Sized>(payload: &P) -> String {
    serde_json::to_string(payload).unwrap_or_else(|e| {
        log::error!("could not encode payload: {}", e);
        String::new()
    })
}

fn parse<T: serde::de::DeserializeOwned>(destination: &str, body: &str) -> Option<T> {
    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("malformed body on {}: {}", destination, e);
            None
        }
    }
}
