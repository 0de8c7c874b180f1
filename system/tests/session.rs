use drawsync_system::destination::*;
use drawsync_system::{
    ActionId, Clock, ConnectionState, EngineConfig, GameSession, Segment, StrokeMode, Transport,
    View,
};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Default)]
struct Recorder {
    published: Vec<(String, String)>,
    subscribed: usize,
    closed: bool,
}

impl Transport for Recorder {
    fn subscribe(&mut self, _destination: &str) {
        self.subscribed += 1;
    }

    fn publish(&mut self, destination: &str, body: String) {
        self.published.push((destination.to_owned(), body));
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Clone, Default)]
struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    fn set(&self, ms: u64) {
        self.0.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

const ROSTER: &str = r#"["Kim (DRAWER)","Boss (ADMIN)","Lee (PARTICIPANT)"]"#;

fn connected(me: &str, config: EngineConfig, clock: ManualClock) -> GameSession<Recorder> {
    let mut session = GameSession::new(me, config, Recorder::default(), Box::new(clock));
    session.connect();
    session.on_open();
    session.handle_message(TOPIC_USERS, ROSTER);
    session
}

fn player(me: &str) -> GameSession<Recorder> {
    connected(me, EngineConfig::default(), ManualClock::default())
}

fn strokes(session: &GameSession<Recorder>) -> Vec<Segment> {
    session
        .gateway()
        .transport()
        .published
        .iter()
        .filter(|(destination, _)| destination == APP_DRAW_STROKE)
        .map(|(_, body)| serde_json::from_str(body).unwrap())
        .collect()
}

fn last_published(session: &GameSession<Recorder>) -> (String, String) {
    session
        .gateway()
        .transport()
        .published
        .last()
        .cloned()
        .unwrap()
}

fn remote_segment(id: &str, new_stroke: bool) -> String {
    serde_json::to_string(&Segment {
        x1: 10.0,
        y1: 10.0,
        x2: 40.0,
        y2: 10.0,
        color: "#0000ff".into(),
        width: 3.0,
        mode: StrokeMode::Pen,
        action_id: ActionId::from(id),
        new_stroke,
    })
    .unwrap()
}

#[test]
fn opening_subscribes_and_requests_state() {
    let session = player("Lee");
    let recorder = session.gateway().transport();
    assert_eq!(recorder.subscribed, 15);
    assert_eq!(recorder.published[0].0, APP_STATE_SYNC);
    assert_eq!(session.connection_state(), ConnectionState::Connected);
    assert!(session.chat().any(|m| m.system));
}

#[test]
fn drawer_drag_is_sent_and_echoed_locally() {
    let mut kim = player("Kim");
    assert!(kim.role().is_drawer);

    assert!(kim.pointer_down(10.0, 10.0));
    kim.pointer_move(20.0, 10.0);
    kim.pointer_move(30.0, 10.0);
    kim.pointer_up();

    let sent = strokes(&kim);
    assert_eq!(sent.len(), 2);
    assert!(sent[0].new_stroke);
    assert!(!sent[1].new_stroke);
    assert_eq!(sent[0].action_id, sent[1].action_id);

    assert_eq!(kim.history().len(), 1);
    assert_eq!(kim.history().current().unwrap().segments.len(), 2);
    assert!(!kim.surface().is_blank());
}

#[test]
fn own_broadcast_echo_is_not_painted_twice() {
    let mut kim = player("Kim");
    kim.pointer_down(10.0, 10.0);
    kim.pointer_move(20.0, 10.0);
    kim.pointer_move(30.0, 10.0);

    let echoes: Vec<String> = strokes(&kim)
        .iter()
        .map(|s| serde_json::to_string(s).unwrap())
        .collect();
    for body in &echoes {
        kim.handle_message(TOPIC_DRAW, body);
    }
    assert_eq!(kim.history().len(), 1);
    assert_eq!(kim.history().current().unwrap().segments.len(), 2);
}

#[test]
fn participants_cannot_draw() {
    let mut lee = player("Lee");
    assert!(!lee.pointer_down(10.0, 10.0));
    lee.pointer_move(20.0, 20.0);
    assert!(strokes(&lee).is_empty());
    assert!(lee.history().is_empty());
}

#[test]
fn disconnect_mid_drag_stops_sending() {
    let mut kim = player("Kim");
    kim.pointer_down(10.0, 10.0);
    kim.pointer_move(20.0, 10.0);
    let before = kim.gateway().transport().published.len();

    kim.on_close();
    kim.pointer_move(30.0, 10.0);
    kim.pointer_move(40.0, 10.0);
    assert_eq!(kim.gateway().transport().published.len(), before);

    kim.connect();
    kim.on_open();
    assert_eq!(last_published(&kim).0, APP_STATE_SYNC);

    // the old drag is gone; moving alone sends nothing
    kim.pointer_move(50.0, 10.0);
    assert_eq!(kim.gateway().transport().published.len(), before + 1);
    assert_eq!(strokes(&kim).len(), 1);
}

#[test]
fn remote_segments_and_undo_apply_in_order() {
    let mut lee = player("Lee");
    lee.handle_message(TOPIC_DRAW, &remote_segment("k1", true));
    lee.handle_message(TOPIC_DRAW, &remote_segment("k1", false));
    lee.handle_message(TOPIC_DRAW, &remote_segment("k2", true));
    assert_eq!(lee.history().len(), 2);

    lee.handle_message(TOPIC_UNDO, r#"{"actionId":"k1"}"#);
    let left: Vec<&ActionId> = lee.history().actions().map(|a| &a.id).collect();
    assert_eq!(left, vec![&ActionId::from("k2")]);

    // unknown ids are a no-op
    lee.handle_message(TOPIC_UNDO, r#"{"actionId":"nope"}"#);
    assert_eq!(lee.history().len(), 1);

    lee.handle_message(TOPIC_UNDO, "{}");
    assert!(lee.history().is_empty());
    assert!(lee.surface().is_blank());
}

#[test]
fn snapshot_replays_even_own_actions() {
    let mut kim = player("Kim");
    kim.pointer_down(10.0, 10.0);
    kim.pointer_move(20.0, 10.0);
    let own = strokes(&kim).remove(0);

    kim.on_close();
    kim.connect();
    kim.on_open();
    kim.handle_message(QUEUE_CANVAS_CLEAR, "");
    assert!(kim.history().is_empty());

    kim.handle_message(QUEUE_DRAW, &serde_json::to_string(&own).unwrap());
    kim.handle_message(QUEUE_DRAW, &remote_segment("older", true));
    let ids: Vec<&ActionId> = kim.history().actions().map(|a| &a.id).collect();
    assert_eq!(ids, vec![&own.action_id, &ActionId::from("older")]);
}

#[test]
fn malformed_messages_are_ignored() {
    let mut lee = player("Lee");
    lee.handle_message(TOPIC_DRAW, "{not json");
    lee.handle_message(TOPIC_DRAW, r#"{"x1":1,"y1":1,"x2":2,"y2":2,"width":-1,"actionId":"x"}"#);
    lee.handle_message("/topic/unknown", "{}");
    lee.handle_message(TOPIC_USERS, "42");

    assert!(lee.history().is_empty());
    assert_eq!(lee.roster().len(), 3);
    assert!(!lee.is_terminated());
}

#[test]
fn request_undo_names_the_latest_action() {
    let mut kim = player("Kim");
    kim.request_undo().unwrap();
    assert_eq!(last_published(&kim), (APP_DRAW_UNDO.to_owned(), "{}".to_owned()));

    kim.pointer_down(1.0, 1.0);
    kim.pointer_move(5.0, 5.0);
    let id = strokes(&kim)[0].action_id.clone();
    kim.request_undo().unwrap();
    assert_eq!(
        last_published(&kim).1,
        format!(r#"{{"actionId":"{}"}}"#, id)
    );
}

#[test]
fn broadcast_clear_resets_board_and_tool() {
    let mut kim = player("Kim");
    kim.handle_message(QUEUE_WORD, "apple");
    kim.toggle_eraser();
    kim.pointer_down(1.0, 1.0);
    kim.pointer_move(5.0, 5.0);
    kim.pointer_up();

    kim.handle_message(TOPIC_CANVAS_CLEAR, "");
    assert!(kim.history().is_empty());
    assert!(kim.surface().is_blank());
    assert_eq!(kim.tool().mode, StrokeMode::Pen);
    // the drawer keeps the word
    assert_eq!(kim.secret_word(), Some("apple"));
}

#[test]
fn status_line_follows_role() {
    let mut kim = player("Kim");
    kim.handle_message(QUEUE_WORD, r#""apple""#);
    assert_eq!(
        kim.status_line().to_string(),
        "You are this round's artist. Word: apple"
    );

    let mut boss = player("Boss");
    boss.handle_message(QUEUE_WORD, "apple");
    assert_eq!(boss.status_line().to_string(), "Drawer: Kim, word: apple");

    let mut lee = player("Lee");
    lee.handle_message(TOPIC_WORD_LEN, "5");
    assert_eq!(
        lee.status_line().to_string(),
        "Kim is drawing. The word has 5 letters."
    );
}

#[test]
fn display_roster_puts_drawer_first() {
    let lee = player("Lee");
    let names: Vec<String> = lee.display_roster().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["Kim", "Boss", "Lee"]);
}

#[test]
fn losing_the_drawer_role_ends_the_drag() {
    let mut kim = player("Kim");
    kim.pointer_down(1.0, 1.0);
    kim.handle_message(TOPIC_USERS, r#"["Kim (PARTICIPANT)","Lee (DRAWER)"]"#);
    kim.pointer_move(5.0, 5.0);
    assert!(strokes(&kim).is_empty());
    assert!(!kim.can_draw());
}

#[test]
fn server_errors_become_system_chat_lines() {
    let mut lee = player("Lee");
    lee.handle_message(QUEUE_ERRORS, "Only the drawer can draw.");
    let last = lee.chat().last().unwrap();
    assert!(last.system);
    assert_eq!(last.text, "Only the drawer can draw.");
}

#[test]
fn chat_log_is_bounded() {
    let config = EngineConfig {
        chat_log_limit: 3,
        ..EngineConfig::default()
    };
    let mut lee = connected("Lee", config, ManualClock::default());
    for i in 0..5 {
        lee.handle_message(
            TOPIC_CHAT,
            &format!(r#"{{"from":"Kim","text":"m{}"}}"#, i),
        );
    }
    let texts: Vec<&str> = lee.chat().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["m2", "m3", "m4"]);
}

#[test]
fn blank_chat_is_not_sent() {
    let mut lee = player("Lee");
    let before = lee.gateway().transport().published.len();
    lee.send_chat("   ").unwrap();
    assert_eq!(lee.gateway().transport().published.len(), before);

    lee.send_chat(" apple ").unwrap();
    assert_eq!(
        last_published(&lee),
        (
            APP_CHAT_SEND.to_owned(),
            r#"{"from":"Lee","text":"apple"}"#.to_owned()
        )
    );
}

#[test]
fn draw_request_waits_for_quiet_canvas() {
    let clock = ManualClock::default();
    let mut lee = connected("Lee", EngineConfig::default(), clock.clone());
    assert!(lee.draw_request_availability().ready);

    clock.set(1_000);
    lee.handle_message(TOPIC_DRAW, &remote_segment("k1", true));
    clock.set(11_000);
    let availability = lee.draw_request_availability();
    assert!(availability.offered);
    assert!(!availability.ready);
    assert_eq!(availability.remaining_secs, 20);

    clock.set(31_000);
    assert!(lee.draw_request_availability().ready);

    let kim = player("Kim");
    assert!(!kim.draw_request_availability().offered);
}

#[test]
fn forced_logout_tears_everything_down() {
    let mut kim = player("Kim");
    kim.pointer_down(1.0, 1.0);
    kim.pointer_move(5.0, 5.0);

    kim.handle_message(QUEUE_FORCE_LOGOUT, "");
    assert!(kim.is_terminated());
    assert!(kim.gateway().transport().closed);
    assert_eq!(kim.connection_state(), ConnectionState::Disconnected);
    assert!(kim.history().is_empty());
    assert!(kim.surface().is_blank());

    // nothing comes back to life afterwards
    kim.handle_message(TOPIC_DRAW, &remote_segment("k1", true));
    kim.connect();
    kim.on_open();
    assert!(kim.history().is_empty());
    assert_eq!(kim.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn invalidations_are_consumed_once() {
    let mut lee = player("Lee");
    lee.consume_invalidated();

    lee.handle_message(TOPIC_DRAW, &remote_segment("k1", true));
    lee.handle_message(TOPIC_SCOREBOARD, r#"[{"name":"Kim","team":0,"score":2}]"#);
    let views = lee.consume_invalidated();
    assert!(views.contains(&View::Canvas));
    assert!(views.contains(&View::Scoreboard));
    assert!(lee.consume_invalidated().is_empty());
    assert_eq!(lee.scoreboard()[0].score, 2);
}

fn segment_count(session: &GameSession<Recorder>) -> usize {
    session.history().actions().map(|a| a.segments.len()).sum()
}

#[test]
fn strokes_drawn_before_the_snapshot_survive_it() {
    let mut kim = player("Kim");
    kim.on_close();
    kim.connect();
    kim.on_open();

    // drawn before the state sync reply arrives
    kim.pointer_down(10.0, 10.0);
    kim.pointer_move(20.0, 10.0);
    kim.pointer_move(30.0, 10.0);
    kim.pointer_up();
    kim.handle_message(QUEUE_CANVAS_CLEAR, "");
    assert!(kim.history().is_empty());

    let mut lee = player("Lee");
    for segment in strokes(&kim) {
        let body = serde_json::to_string(&segment).unwrap();
        kim.handle_message(TOPIC_DRAW, &body);
        lee.handle_message(TOPIC_DRAW, &body);
    }

    assert_eq!(segment_count(&kim), 2);
    assert_eq!(segment_count(&lee), 2);
    assert_eq!(kim.surface().as_rgba(), lee.surface().as_rgba());
}

#[test]
fn drag_across_the_snapshot_is_not_doubled() {
    let mut kim = player("Kim");
    kim.pointer_down(10.0, 10.0);
    kim.pointer_move(20.0, 10.0);
    kim.handle_message(QUEUE_CANVAS_CLEAR, "");
    kim.pointer_move(30.0, 10.0);

    for segment in strokes(&kim) {
        kim.handle_message(TOPIC_DRAW, &serde_json::to_string(&segment).unwrap());
    }
    // the first comes back for real, the second was already painted
    assert_eq!(segment_count(&kim), 2);
}

#[test]
fn huge_cooldown_does_not_overflow() {
    let clock = ManualClock::default();
    let config = EngineConfig {
        draw_request_cooldown_ms: u64::MAX,
        ..EngineConfig::default()
    };
    let mut lee = connected("Lee", config, clock.clone());
    clock.set(1_000);
    lee.handle_message(TOPIC_DRAW, &remote_segment("k1", true));

    let availability = lee.draw_request_availability();
    assert!(!availability.ready);
    assert_eq!(availability.remaining_secs, u64::MAX / 1000);
}
