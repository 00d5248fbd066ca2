use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;

use nonogrid::input::{InputModifiers, KeyInput};
use nonogrid::store::WriteKind;
use nonogrid::{
    CompletionStatus, InMemorySessionStore, LocalUser, ManualClock, MemoryLocalStore,
    PersistedStore, SessionConfig, SessionEvent, SessionHooks, SessionReconciler,
    SharedSessionStore, StoreError, SyncError, SyncMode,
};
use nonogrid_core::{
    Cell, Clue, GameSessionState, GameState, Participant, PointerButton, Puzzle, SessionId,
};
use serde_json::json;

const START: u64 = 1_700_000_000_000;
const ME: &str = "me000001";
const OTHER: &str = "other001";

fn plus_puzzle() -> Puzzle {
    let clues = vec![
        Clue::new(vec![1]),
        Clue::new(vec![3]),
        Clue::new(vec![1]),
    ];
    Puzzle::new("plus", "Plus", clues.clone(), clues).unwrap()
}

fn session() -> SessionId {
    SessionId::parse("Sess1234").unwrap()
}

fn local_user() -> LocalUser {
    LocalUser {
        id: ME.to_string(),
        name: "Anonymous Fig".to_string(),
        color: "#3cb44b".to_string(),
    }
}

fn participant(name: &str, last_active_time: u64) -> Participant {
    Participant {
        name: name.to_string(),
        color: if name.is_empty() { String::new() } else { "#4363d8".to_string() },
        last_active_time,
        cursor: None,
    }
}

struct Fixture {
    clock: ManualClock,
    persisted: PersistedStore,
    store: Rc<InMemorySessionStore>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_store(InMemorySessionStore::new())
    }

    fn with_store(store: InMemorySessionStore) -> Self {
        Self {
            clock: ManualClock::new(START),
            persisted: PersistedStore::new(Rc::new(MemoryLocalStore::new())),
            store: Rc::new(store),
        }
    }

    fn offline_with(&self, config: SessionConfig) -> SessionReconciler {
        SessionReconciler::offline(
            "plus",
            GameState::new(plus_puzzle()),
            local_user(),
            self.persisted.clone(),
            Rc::new(self.clock.clone()),
            config,
        )
    }

    fn offline(&self) -> SessionReconciler {
        self.offline_with(SessionConfig::default())
    }

    fn seed(&self, users: &[(&str, Participant)]) {
        let mut state = GameSessionState::new("plus", GameState::new(plus_puzzle()), START);
        for (id, participant) in users {
            state.participants.insert(id.to_string(), participant.clone());
        }
        self.store
            .set(&session(), "", state.to_snapshot().unwrap())
            .unwrap();
        self.store.clear_writes();
    }

    fn joined(&self, config: SessionConfig) -> Rc<RefCell<SessionReconciler>> {
        let reconciler = Rc::new(RefCell::new(self.offline_with(config)));
        SessionReconciler::connect(&reconciler, self.store.clone(), session());
        self.store.deliver_pending();
        reconciler
    }

    fn writes_under(&self, prefix: &str) -> usize {
        self.store
            .writes()
            .iter()
            .filter(|write| write.path.starts_with(prefix))
            .count()
    }
}

#[test]
fn joining_writes_the_local_user_exactly_once() {
    let fixture = Fixture::new();
    fixture.seed(&[(OTHER, participant("Anonymous Kiwi", START))]);

    let reconciler = fixture.joined(SessionConfig::default());

    assert_eq!(fixture.writes_under(&format!("users/{ME}")), 1);
    let stored = fixture
        .store
        .read_path(&session(), &format!("users/{ME}"))
        .unwrap();
    assert_eq!(stored["name"], "Anonymous Fig");
    assert_eq!(stored["color"], "#3cb44b");
    assert_eq!(stored["lastActiveTime"], START);

    let reconciler = reconciler.borrow();
    assert!(reconciler.is_joined());
    assert_eq!(reconciler.state().participants[ME].name, "Anonymous Fig");
    let view = reconciler.view();
    assert_eq!(
        view.local_participant().map(|p| p.display_name.as_str()),
        Some("Anonymous Fig (you)")
    );
    assert_eq!(view.participants.len(), 2);
    assert_eq!(view.mode, SyncMode::Remote);
}

#[test]
fn incomplete_stored_record_is_repaired() {
    let fixture = Fixture::new();
    fixture.seed(&[(ME, participant("", START))]);
    let _reconciler = fixture.joined(SessionConfig::default());
    assert_eq!(fixture.writes_under(&format!("users/{ME}")), 1);

    fixture.store.clear_writes();
    fixture
        .store
        .set(&session(), &format!("users/{ME}/color"), serde_json::Value::Null)
        .unwrap();
    fixture.store.clear_writes();
    fixture.store.deliver_pending();
    assert_eq!(fixture.writes_under(&format!("users/{ME}")), 1);
    let stored = fixture
        .store
        .read_path(&session(), &format!("users/{ME}/color"))
        .unwrap();
    assert_eq!(stored, "#3cb44b");
}

#[test]
fn offline_paint_undo_and_redo() {
    let fixture = Fixture::new();
    let mut reconciler = fixture.offline();

    assert!(reconciler.pointer_down(1, 0, PointerButton::Primary).unwrap());
    assert_eq!(reconciler.pointer_move(1, 2).unwrap(), 2);
    assert!(reconciler.pointer_up().unwrap());
    assert_eq!(reconciler.state().game.grid.row(1), &[Cell::Filled; 3]);
    assert_eq!(
        fixture.persisted.completion("plus"),
        CompletionStatus::InProgress
    );

    assert!(reconciler.undo().unwrap());
    assert_eq!(reconciler.state().game.grid.row(1), &[Cell::Blank; 3]);
    assert!(!reconciler.undo().unwrap());
    assert!(reconciler.redo().unwrap());
    assert_eq!(reconciler.state().game.grid.row(1), &[Cell::Filled; 3]);
    assert!(!reconciler.redo().unwrap());
}

#[test]
fn finishing_the_plus_persists_solved() {
    let fixture = Fixture::new();
    let mut reconciler = fixture.offline();

    reconciler.pointer_down(1, 0, PointerButton::Primary).unwrap();
    reconciler.pointer_move(1, 2).unwrap();
    reconciler.pointer_up().unwrap();
    reconciler.pointer_down(0, 1, PointerButton::Primary).unwrap();
    assert_eq!(reconciler.pointer_move(2, 1).unwrap(), 1);
    reconciler.pointer_up().unwrap();

    assert!(reconciler.solution_status().is_solved);
    assert_eq!(fixture.persisted.completion("plus"), CompletionStatus::Solved);
    assert!(reconciler
        .take_events()
        .contains(&SessionEvent::Completion(CompletionStatus::Solved)));

    // Solved boards take no more paint.
    assert!(!reconciler.pointer_down(0, 0, PointerButton::Secondary).unwrap());
}

#[test]
fn keyboard_shortcuts_drive_history() {
    let fixture = Fixture::new();
    let mut reconciler = fixture.offline();
    reconciler.pointer_down(0, 0, PointerButton::Secondary).unwrap();
    reconciler.pointer_up().unwrap();
    assert_eq!(reconciler.state().game.grid.get(0, 0), Some(Cell::Crossed));

    let ctrl = InputModifiers {
        ctrl: true,
        ..InputModifiers::default()
    };
    let undo = KeyInput {
        code: "KeyZ".to_string(),
        modifiers: ctrl,
        text_input_focused: false,
    };
    assert!(!reconciler.handle_key(&undo).unwrap());
    assert_eq!(reconciler.state().game.grid.get(0, 0), Some(Cell::Blank));

    let redo = KeyInput {
        code: "KeyY".to_string(),
        ..undo
    };
    assert!(reconciler.handle_key(&redo).unwrap());
    assert_eq!(reconciler.state().game.grid.get(0, 0), Some(Cell::Crossed));
}

#[test]
fn reset_clears_cells_and_history() {
    let fixture = Fixture::new();
    let mut reconciler = fixture.offline();
    reconciler.pointer_down(2, 2, PointerButton::Primary).unwrap();
    reconciler.pointer_up().unwrap();
    reconciler.reset_board().unwrap();
    assert_eq!(reconciler.state().game.grid.count(Cell::Blank), 9);
    assert!(reconciler.state().game.log.is_empty());
    assert!(!reconciler.view().can_undo);
}

#[test]
fn remote_log_changes_arrive_through_the_store() {
    let fixture = Fixture::new();
    let reconciler = Rc::new(RefCell::new(fixture.offline()));
    SessionReconciler::share(&reconciler, fixture.store.clone(), session()).unwrap();
    fixture.store.deliver_pending();
    assert_eq!(reconciler.borrow().mode(), SyncMode::Remote);

    {
        let mut reconciler = reconciler.borrow_mut();
        assert!(reconciler.pointer_down(0, 1, PointerButton::Primary).unwrap());
        // Cell writes show up locally at once.
        assert_eq!(reconciler.state().game.grid.get(0, 1), Some(Cell::Filled));
        assert!(reconciler.pointer_up().unwrap());
        // The log waits for the echo.
        assert_eq!(reconciler.state().game.log.len(), 0);
    }
    assert_eq!(
        fixture
            .store
            .read_path(&session(), "gameState/nonogram/cells/0/1")
            .unwrap(),
        "filled"
    );

    fixture.store.deliver_pending();
    assert_eq!(reconciler.borrow().state().game.log.len(), 1);

    assert!(reconciler.borrow_mut().undo().unwrap());
    assert_eq!(
        reconciler.borrow().state().game.grid.get(0, 1),
        Some(Cell::Filled)
    );
    fixture.store.deliver_pending();
    let reconciler = reconciler.borrow();
    assert_eq!(reconciler.state().game.grid.get(0, 1), Some(Cell::Blank));
    assert!(reconciler.view().can_redo);
}

#[test]
fn remote_undo_runs_against_the_store_before_the_echo() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let me = fixture.joined(SessionConfig::default());

    let peer = Rc::new(RefCell::new(SessionReconciler::offline(
        "plus",
        GameState::new(plus_puzzle()),
        LocalUser {
            id: OTHER.to_string(),
            name: "Anonymous Kiwi".to_string(),
            color: "#4363d8".to_string(),
        },
        fixture.persisted.clone(),
        Rc::new(fixture.clock.clone()),
        SessionConfig::default(),
    )));
    SessionReconciler::connect(&peer, fixture.store.clone(), session());
    {
        let mut peer = peer.borrow_mut();
        assert!(peer.pointer_down(1, 1, PointerButton::Primary).unwrap());
        assert!(peer.pointer_up().unwrap());
    }
    // Nothing delivered yet: this client still sees an empty history.
    assert!(!me.borrow().state().game.log.can_undo());

    assert!(me.borrow_mut().undo().unwrap());
    assert_eq!(
        fixture
            .store
            .read_path(&session(), "gameState/numAppliedActionsInLog")
            .unwrap(),
        json!(0)
    );
    assert_ne!(
        fixture
            .store
            .read_path(&session(), "gameState/nonogram/cells/1/1"),
        Some(json!("filled"))
    );

    fixture.store.deliver_pending();
    let me = me.borrow();
    assert_eq!(me.state().game.grid.get(1, 1), Some(Cell::Blank));
    assert!(me.view().can_redo);
}

#[test]
fn remote_undo_with_no_history_leaves_the_store_alone() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let me = fixture.joined(SessionConfig::default());
    fixture.store.deliver_pending();

    assert!(me.borrow_mut().undo().unwrap());
    assert!(me.borrow_mut().redo().unwrap());
    fixture.store.deliver_pending();
    let me = me.borrow();
    assert!(me.state().game.log.is_empty());
    assert_eq!(me.state().game.grid.count(Cell::Blank), 9);
}

#[test]
fn focus_loss_finishes_the_gesture() {
    let fixture = Fixture::new();
    let mut reconciler = fixture.offline();
    reconciler.pointer_down(0, 0, PointerButton::Primary).unwrap();
    reconciler.pointer_move(0, 2).unwrap();
    assert!(reconciler.focus_lost().unwrap());
    assert!(!reconciler.is_painting());
    assert_eq!(reconciler.state().game.log.len(), 1);
    assert!(!reconciler.focus_lost().unwrap());
}

#[test]
fn conflicting_transactions_rerun_the_reducer() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let reconciler = fixture.joined(SessionConfig::default());
    fixture.store.inject_concurrent_write(
        "gameState/nonogram/cells/2/2",
        json!(Cell::Crossed.as_wire_str()),
    );

    let calls = Rc::new(StdCell::new(0));
    let seen = calls.clone();
    reconciler
        .borrow_mut()
        .apply_transaction(Rc::new(move |mut game: GameState| {
            seen.set(seen.get() + 1);
            let _ = game.grid.set(0, 0, Cell::Crossed);
            game
        }))
        .unwrap();
    assert_eq!(calls.get(), 2);

    fixture.store.deliver_pending();
    let reconciler = reconciler.borrow();
    assert_eq!(reconciler.state().game.grid.get(0, 0), Some(Cell::Crossed));
    assert_eq!(reconciler.state().game.grid.get(2, 2), Some(Cell::Crossed));
    let kinds: Vec<WriteKind> = fixture
        .store
        .writes()
        .iter()
        .filter(|write| write.path.starts_with("gameState"))
        .map(|write| write.kind)
        .collect();
    assert_eq!(kinds, vec![WriteKind::Set, WriteKind::Transaction]);
}

#[test]
fn transaction_gives_up_after_repeated_conflicts() {
    let fixture = Fixture::with_store(InMemorySessionStore::new().with_max_attempts(2));
    fixture.seed(&[]);
    let reconciler = fixture.joined(SessionConfig::default());
    for _ in 0..2 {
        fixture
            .store
            .inject_concurrent_write("lastUpdatedTime", json!(START + 1));
    }
    let result = reconciler.borrow_mut().reset_board();
    assert!(matches!(
        result,
        Err(SyncError::Store(StoreError::TooManyRetries { attempts: 2, .. }))
    ));
}

#[test]
fn inactive_participants_are_hidden_but_never_the_local_user() {
    let fixture = Fixture::new();
    fixture.clock.set(START + 31 * 60 * 1000);
    fixture.seed(&[
        (OTHER, participant("Anonymous Kiwi", START)),
        ("recent01", participant("Anonymous Lime", START + 30 * 60 * 1000)),
    ]);
    let reconciler = fixture.joined(SessionConfig::default());

    {
        let reconciler = reconciler.borrow();
        assert!(reconciler.hidden_participants().contains(OTHER));
        let ids: Vec<_> = reconciler.view().participants.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ME.to_string(), "recent01".to_string()]);
    }
    // Hidden only; still stored.
    assert!(fixture
        .store
        .read_path(&session(), &format!("users/{OTHER}"))
        .is_some());

    let far_future = START + 365 * 24 * 60 * 60 * 1000;
    let hidden = reconciler.borrow_mut().evict_inactive_participants(far_future);
    assert_eq!(hidden, vec!["recent01".to_string()]);
    assert!(!reconciler.borrow().hidden_participants().contains(ME));
}

#[test]
fn pruning_removes_inactive_participants_from_the_store() {
    let fixture = Fixture::new();
    fixture.clock.set(START + 31 * 60 * 1000);
    fixture.seed(&[(OTHER, participant("Anonymous Kiwi", START))]);
    let config = SessionConfig {
        prune_inactive_remote: true,
        ..SessionConfig::default()
    };
    let _reconciler = fixture.joined(config);
    assert!(fixture
        .store
        .read_path(&session(), &format!("users/{OTHER}"))
        .is_none());
}

#[test]
fn cursor_and_activity_writes_are_throttled() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let reconciler = fixture.joined(SessionConfig::default());
    fixture.store.clear_writes();
    let cursor_prefix = format!("cursors/{ME}");
    let activity_prefix = format!("users/{ME}/lastActiveTime");

    reconciler.borrow_mut().update_cursor(0.1234, 0.5).unwrap();
    reconciler.borrow_mut().update_cursor(0.2, 0.5).unwrap();
    assert_eq!(fixture.writes_under(&cursor_prefix), 1);
    assert_eq!(fixture.writes_under(&activity_prefix), 1);
    assert_eq!(
        fixture.store.read_path(&session(), &cursor_prefix).unwrap(),
        json!({ "x": 0.123, "y": 0.5 })
    );

    fixture.clock.advance(20);
    reconciler.borrow_mut().update_cursor(1.5, -0.2).unwrap();
    assert_eq!(fixture.writes_under(&cursor_prefix), 2);
    assert_eq!(fixture.writes_under(&activity_prefix), 1);
    assert_eq!(
        fixture.store.read_path(&session(), &cursor_prefix).unwrap(),
        json!({ "x": 1.0, "y": 0.0 })
    );

    fixture.clock.advance(1000);
    reconciler.borrow_mut().update_cursor(0.5, 0.5).unwrap();
    assert_eq!(fixture.writes_under(&cursor_prefix), 3);
    assert_eq!(fixture.writes_under(&activity_prefix), 2);
}

#[test]
fn throttled_cursor_calls_skip_the_activity_touch() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let config = SessionConfig {
        cursor_interval_ms: 500,
        activity_interval_ms: 100,
        ..SessionConfig::default()
    };
    let reconciler = fixture.joined(config);
    fixture.store.clear_writes();
    let activity_prefix = format!("users/{ME}/lastActiveTime");

    reconciler.borrow_mut().update_cursor(0.1, 0.1).unwrap();
    assert_eq!(fixture.writes_under(&activity_prefix), 1);

    fixture.clock.advance(200);
    reconciler.borrow_mut().update_cursor(0.2, 0.2).unwrap();
    assert_eq!(fixture.writes_under(&activity_prefix), 1);

    fixture.clock.advance(300);
    reconciler.borrow_mut().update_cursor(0.3, 0.3).unwrap();
    assert_eq!(fixture.writes_under(&activity_prefix), 2);
}

#[test]
fn offline_cursor_only_touches_activity() {
    let fixture = Fixture::new();
    let mut reconciler = fixture.offline();
    fixture.clock.advance(5_000);
    reconciler.update_cursor(0.5, 0.5).unwrap();
    let me = &reconciler.state().participants[ME];
    assert_eq!(me.last_active_time, START + 5_000);
    assert_eq!(me.cursor, None);
}

#[test]
fn chat_is_pushed_in_order_and_blank_messages_are_dropped() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let reconciler = fixture.joined(SessionConfig::default());

    assert!(!reconciler.borrow_mut().send_chat("   ").unwrap());
    assert!(reconciler.borrow_mut().send_chat("hello").unwrap());
    fixture.clock.advance(1);
    assert!(reconciler.borrow_mut().send_chat("anyone here?").unwrap());
    assert_eq!(fixture.writes_under("chatLog"), 2);

    fixture.store.deliver_pending();
    let view = reconciler.borrow().view();
    let lines: Vec<_> = view
        .chat
        .iter()
        .map(|line| (line.author.as_str(), line.message.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("Anonymous Fig (you)", "hello"),
            ("Anonymous Fig (you)", "anyone here?"),
        ]
    );
}

#[test]
fn malformed_snapshots_are_dropped() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let reconciler = fixture.joined(SessionConfig::default());
    reconciler
        .borrow_mut()
        .update_cell(1, 1, Cell::Filled)
        .unwrap();
    fixture.store.deliver_pending();

    fixture
        .store
        .set(&session(), "gameState/nonogram", json!("junk"))
        .unwrap();
    fixture.store.deliver_pending();
    let reconciler = reconciler.borrow();
    assert_eq!(reconciler.state().game.grid.get(1, 1), Some(Cell::Filled));
    assert_eq!(reconciler.state().game.puzzle.title(), "Plus");
}

#[test]
fn out_of_bounds_cells_are_ignored() {
    let fixture = Fixture::new();
    let mut reconciler = fixture.offline();
    assert!(!reconciler.update_cell(3, 0, Cell::Filled).unwrap());
    assert_eq!(reconciler.state().game.grid.count(Cell::Blank), 9);
}

#[test]
fn missing_session_is_reported_through_hooks() {
    let fixture = Fixture::new();
    let reconciler = Rc::new(RefCell::new(fixture.offline()));
    let events = Rc::new(RefCell::new(Vec::<SessionEvent>::new()));
    let sink = events.clone();
    reconciler.borrow_mut().set_hooks(SessionHooks {
        on_change: Rc::new(|| {}),
        on_event: Rc::new(move |event: SessionEvent| sink.borrow_mut().push(event)),
    });

    SessionReconciler::connect(&reconciler, fixture.store.clone(), session());
    fixture.store.deliver_pending();

    assert_eq!(
        *events.borrow(),
        vec![
            SessionEvent::Connected { session: session() },
            SessionEvent::SessionMissing { session: session() },
        ]
    );
    assert!(fixture.store.writes().is_empty());
}

#[test]
fn disconnecting_stops_snapshot_delivery() {
    let fixture = Fixture::new();
    fixture.seed(&[]);
    let reconciler = fixture.joined(SessionConfig::default());
    reconciler.borrow_mut().disconnect();
    assert_eq!(reconciler.borrow().mode(), SyncMode::Local);

    fixture
        .store
        .set(&session(), "gameState/nonogram/cells/0/0", json!("filled"))
        .unwrap();
    assert_eq!(fixture.store.deliver_pending(), 0);
    assert_eq!(
        reconciler.borrow().state().game.grid.get(0, 0),
        Some(Cell::Blank)
    );
}

proptest::proptest! {
    #[test]
    fn undoing_every_gesture_restores_a_blank_board(
        gestures in proptest::collection::vec((0usize..3, 0usize..3, 0usize..3, 0usize..3, proptest::bool::ANY), 0..8)
    ) {
        let fixture = Fixture::new();
        let mut reconciler = fixture.offline();
        for (row, col, to_row, to_col, secondary) in gestures {
            let button = if secondary { PointerButton::Secondary } else { PointerButton::Primary };
            reconciler.pointer_down(row, col, button).unwrap();
            reconciler.pointer_move(to_row, to_col).unwrap();
            reconciler.pointer_up().unwrap();
        }
        while reconciler.undo().unwrap() {}
        proptest::prop_assert_eq!(reconciler.state().game.grid.count(Cell::Blank), 9);
        proptest::prop_assert_eq!(reconciler.state().game.log.applied_count(), 0);
    }
}
