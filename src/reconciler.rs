//! The client's single authoritative copy of a game session.
//!
//! A [`SessionReconciler`] owns the [`GameSessionState`] and routes every
//! mutation through a [`SessionSync`]. Offline it uses [`LocalSessionSync`];
//! after [`SessionReconciler::connect`] it uses [`RemoteSessionSync`] and
//! replaces its state with every snapshot the shared store delivers.
//!
//! Callers that hold the reconciler behind `Rc<RefCell<_>>` get events
//! through [`SessionHooks`]; the hooks run after the borrow is released, so
//! they may read the reconciler again.

use std::cell::{Cell as StdCell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use nonogrid_core::{
    Cell, CellUpdateAction, ChatMessage, CursorPosition, GameSessionState, GameState,
    PaintController, Participant, PointerButton, PuzzleDocument, SessionId, SolutionStatus,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::SyncError;
use crate::identity::LocalUser;
use crate::input::{match_shortcut, KeyInput, Shortcut};
use crate::persisted::CompletionStatus;
use crate::persisted_store::PersistedStore;
use crate::rate_limit::RateLimiter;
use crate::store::{SharedSessionStore, SnapshotListener, SubscriptionId};
use crate::sync::{GameReducer, LocalSessionSync, RemoteSessionSync, SessionSync, SyncMode};
use crate::view::SessionView;

const CURSOR_LIMIT_KEY: &str = "cursor";
const ACTIVITY_LIMIT_KEY: &str = "activity";

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Connected { session: SessionId },
    /// The subscribed session is gone from the store.
    SessionMissing { session: SessionId },
    Joined { user_id: String },
    ParticipantsHidden { user_ids: Vec<String> },
    Completion(CompletionStatus),
    SyncFailed { message: String },
}

#[derive(Clone)]
pub struct SessionHooks {
    pub on_change: Rc<dyn Fn()>,
    pub on_event: Rc<dyn Fn(SessionEvent)>,
}

impl SessionHooks {
    pub fn empty() -> Self {
        Self {
            on_change: Rc::new(|| {}),
            on_event: Rc::new(|_| {}),
        }
    }
}

struct Subscription {
    store: Rc<dyn SharedSessionStore>,
    id: SubscriptionId,
}

pub struct SessionReconciler {
    config: SessionConfig,
    clock: Rc<dyn Clock>,
    user: LocalUser,
    persisted: PersistedStore,
    sync: Box<dyn SessionSync>,
    state: GameSessionState,
    hidden: BTreeSet<String>,
    joined: bool,
    limiter: RateLimiter,
    paint: PaintController,
    subscription: Option<Subscription>,
    connect_seq: Rc<StdCell<u64>>,
    hooks: SessionHooks,
    events: Vec<SessionEvent>,
}

impl SessionReconciler {
    /// Starts a private, offline game with the local user as its only
    /// participant.
    pub fn offline(
        board_id: impl Into<String>,
        game: GameState,
        user: LocalUser,
        persisted: PersistedStore,
        clock: Rc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let now = clock.now_ms();
        let mut state = GameSessionState::new(board_id, game, now);
        state.participants.insert(
            user.id.clone(),
            Participant {
                name: user.name.clone(),
                color: user.color.clone(),
                last_active_time: now,
                cursor: None,
            },
        );
        info!(board_id = %state.board_id, user_id = %user.id, "opened offline session");
        let mut reconciler = Self {
            config,
            clock,
            user,
            persisted,
            sync: Box::new(LocalSessionSync),
            state,
            hidden: BTreeSet::new(),
            joined: true,
            limiter: RateLimiter::new(),
            paint: PaintController::new(),
            subscription: None,
            connect_seq: Rc::new(StdCell::new(0)),
            hooks: SessionHooks::empty(),
            events: Vec::new(),
        };
        reconciler.refresh_completion();
        reconciler
    }

    pub fn from_document(
        board_id: impl Into<String>,
        document: PuzzleDocument,
        user: LocalUser,
        persisted: PersistedStore,
        clock: Rc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self::offline(
            board_id,
            GameState::from_document(document),
            user,
            persisted,
            clock,
            config,
        )
    }

    pub fn set_hooks(&mut self, hooks: SessionHooks) {
        self.hooks = hooks;
    }

    /// Switches to collaborative mode on `session`. The state is replaced by
    /// the store's copy once its first snapshot arrives.
    pub fn connect(this: &Rc<RefCell<Self>>, store: Rc<dyn SharedSessionStore>, session: SessionId) {
        let (seq, connect_seq) = {
            let mut reconciler = this.borrow_mut();
            reconciler.detach();
            reconciler.sync = Box::new(RemoteSessionSync::new(store.clone(), session.clone()));
            reconciler.joined = false;
            reconciler.hidden.clear();
            reconciler.limiter.reset();
            reconciler.paint.cancel();
            let seq = reconciler.connect_seq.get().wrapping_add(1);
            reconciler.connect_seq.set(seq);
            (seq, reconciler.connect_seq.clone())
        };
        let weak = Rc::downgrade(this);
        let listener: SnapshotListener = Rc::new(move |snapshot: Value| {
            if connect_seq.get() != seq {
                return;
            }
            let Some(this) = weak.upgrade() else {
                return;
            };
            this.borrow_mut().on_remote_snapshot(snapshot);
            Self::flush(&this);
        });
        let id = store.subscribe(&session, listener);
        info!(session = %session, "connected to shared session");
        let mut reconciler = this.borrow_mut();
        reconciler.subscription = Some(Subscription { store, id });
        reconciler.events.push(SessionEvent::Connected { session });
    }

    /// Back to offline play on the current state.
    pub fn disconnect(&mut self) {
        if self.subscription.is_none() {
            return;
        }
        self.detach();
        self.sync = Box::new(LocalSessionSync);
        self.joined = true;
        self.hidden.clear();
        info!(board_id = %self.state.board_id, "disconnected from shared session");
    }

    fn detach(&mut self) {
        self.connect_seq.set(self.connect_seq.get().wrapping_add(1));
        if let Some(subscription) = self.subscription.take() {
            subscription.store.unsubscribe(subscription.id);
        }
    }

    /// Publishes the current state as a new shared session and joins it.
    pub fn share(
        this: &Rc<RefCell<Self>>,
        store: Rc<dyn SharedSessionStore>,
        session: SessionId,
    ) -> Result<(), SyncError> {
        let snapshot = this.borrow().state.to_snapshot()?;
        store.set(&session, "", snapshot)?;
        info!(session = %session, "shared session");
        Self::connect(this, store, session);
        Ok(())
    }

    /// Delivers queued events to the hooks.
    pub fn flush(this: &Rc<RefCell<Self>>) {
        let (hooks, events) = {
            let mut reconciler = this.borrow_mut();
            (reconciler.hooks.clone(), std::mem::take(&mut reconciler.events))
        };
        for event in events {
            (hooks.on_event)(event);
        }
        (hooks.on_change)();
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Replaces the local state with a store snapshot, then joins and hides
    /// idle participants. Snapshots that do not parse are dropped.
    pub fn on_remote_snapshot(&mut self, snapshot: Value) {
        let Some(session) = self.sync.session_id().cloned() else {
            debug!("snapshot arrived while offline");
            return;
        };
        if snapshot.is_null() {
            warn!(session = %session, "shared session disappeared");
            self.events.push(SessionEvent::SessionMissing { session });
            return;
        }
        let state = match GameSessionState::from_snapshot(&snapshot) {
            Ok(state) => state,
            Err(err) => {
                warn!(session = %session, %err, "dropping malformed snapshot");
                return;
            }
        };
        self.state = state;
        let now = self.clock.now_ms();
        if let Err(err) = self.join_session(now) {
            warn!(session = %session, %err, "failed to join session");
            self.events.push(SessionEvent::SyncFailed {
                message: err.to_string(),
            });
        }
        self.evict_inactive_participants(now);
        self.refresh_completion();
    }

    /// Writes the local user's record on the first snapshot, and again
    /// whenever the stored one is missing its name or color. Returns whether
    /// a write happened.
    pub fn join_session(&mut self, now: u64) -> Result<bool, SyncError> {
        let stored_complete = self
            .state
            .participants
            .get(&self.user.id)
            .is_some_and(Participant::is_complete);
        if self.joined && stored_complete {
            return Ok(false);
        }
        let cursor = self
            .state
            .participants
            .get(&self.user.id)
            .and_then(|participant| participant.cursor);
        let participant = Participant {
            name: self.user.name.clone(),
            color: self.user.color.clone(),
            last_active_time: now,
            cursor,
        };
        let user_id = self.user.id.clone();
        self.sync
            .write_participant(&mut self.state, &user_id, participant)?;
        self.joined = true;
        info!(user_id = %user_id, "joined session");
        self.events.push(SessionEvent::Joined { user_id });
        Ok(true)
    }

    /// Hides participants idle past the timeout. The local user is never
    /// hidden. Returns the ids hidden by this call.
    pub fn evict_inactive_participants(&mut self, now: u64) -> Vec<String> {
        let timeout = self.config.inactivity_timeout_ms;
        let inactive: BTreeSet<String> = self
            .state
            .participants
            .iter()
            .filter(|(id, participant)| {
                **id != self.user.id && !participant.is_active(now, timeout)
            })
            .map(|(id, _)| id.clone())
            .collect();
        let newly: Vec<String> = inactive.difference(&self.hidden).cloned().collect();
        self.hidden = inactive;
        if newly.is_empty() {
            return newly;
        }
        info!(count = newly.len(), "hiding inactive participants");
        if self.config.prune_inactive_remote && self.sync.mode() == SyncMode::Remote {
            for id in &newly {
                if let Err(err) = self.sync.remove_participant(&mut self.state, id) {
                    warn!(user_id = %id, %err, "failed to prune participant");
                }
            }
        }
        self.events.push(SessionEvent::ParticipantsHidden {
            user_ids: newly.clone(),
        });
        newly
    }

    /// Runs `reducer` on the game atomically. Remote reducers may run more
    /// than once, each time on a fresher copy.
    pub fn apply_transaction(&mut self, reducer: GameReducer) -> Result<(), SyncError> {
        self.sync.apply_transaction(&mut self.state, reducer)?;
        self.refresh_completion();
        Ok(())
    }

    /// Out-of-bounds coordinates are ignored.
    pub fn update_cell(&mut self, row: usize, col: usize, cell: Cell) -> Result<bool, SyncError> {
        if !self.state.game.grid.contains(row, col) {
            debug!(row, col, "ignoring out-of-bounds cell write");
            return Ok(false);
        }
        let now = self.clock.now_ms();
        self.sync
            .update_cell(&mut self.state, row, col, cell, now)?;
        self.refresh_completion();
        Ok(true)
    }

    /// Reports the pointer as fractions of the board. Activity is only
    /// touched on calls that get past the cursor throttle.
    pub fn update_cursor(&mut self, x: f64, y: f64) -> Result<(), SyncError> {
        if !self.joined {
            return Ok(());
        }
        let now = self.clock.now_ms();
        if !self
            .limiter
            .try_acquire(CURSOR_LIMIT_KEY, self.config.cursor_interval_ms, now)
        {
            return Ok(());
        }
        let user_id = self.user.id.clone();
        let cursor = CursorPosition::normalized(x, y, self.config.cursor_decimals);
        self.sync.update_cursor(&mut self.state, &user_id, cursor)?;
        if self
            .limiter
            .try_acquire(ACTIVITY_LIMIT_KEY, self.config.activity_interval_ms, now)
        {
            self.sync.touch_activity(&mut self.state, &user_id, now)?;
        }
        Ok(())
    }

    /// Offline, returns whether there was anything to undo. Remote history
    /// is checked inside the transaction against the store's copy, so a
    /// remote undo always reports `true`.
    pub fn undo(&mut self) -> Result<bool, SyncError> {
        if self.sync.mode() == SyncMode::Local && !self.state.game.log.can_undo() {
            return Ok(false);
        }
        self.apply_transaction(Rc::new(GameState::undo))?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, SyncError> {
        if self.sync.mode() == SyncMode::Local && !self.state.game.log.can_redo() {
            return Ok(false);
        }
        self.apply_transaction(Rc::new(GameState::redo))?;
        Ok(true)
    }

    pub fn append_action(&mut self, action: CellUpdateAction) -> Result<(), SyncError> {
        self.apply_transaction(Rc::new(move |game: GameState| game.append(action.clone())))
    }

    /// Blanks every cell and forgets the history.
    pub fn reset_board(&mut self) -> Result<(), SyncError> {
        self.paint.cancel();
        self.apply_transaction(Rc::new(GameState::reset))
    }

    /// Blank messages are ignored.
    pub fn send_chat(&mut self, message: &str) -> Result<bool, SyncError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(false);
        }
        let chat = ChatMessage {
            timestamp: self.clock.now_ms(),
            user_id: self.user.id.clone(),
            message: message.to_string(),
        };
        self.sync.send_chat(&mut self.state, chat)?;
        Ok(true)
    }

    pub fn solution_status(&self) -> SolutionStatus {
        self.state.game.puzzle.status(&self.state.game.grid)
    }

    /// Starts a paint gesture. Returns whether the press painted anything.
    pub fn pointer_down(
        &mut self,
        row: usize,
        col: usize,
        button: PointerButton,
    ) -> Result<bool, SyncError> {
        let status = self.solution_status();
        let Some(write) = self
            .paint
            .begin(&self.state.game.grid, &status, row, col, button)
        else {
            debug!(row, col, ?button, "ignoring pointer down");
            return Ok(false);
        };
        self.update_cell(write.pos.row, write.pos.col, write.cell)
    }

    /// Extends the active gesture. Returns how many cells were painted.
    pub fn pointer_move(&mut self, row: usize, col: usize) -> Result<usize, SyncError> {
        let writes = self.paint.extend(&self.state.game.grid, row, col);
        for write in &writes {
            self.update_cell(write.pos.row, write.pos.col, write.cell)?;
        }
        Ok(writes.len())
    }

    /// Ends the gesture and records it in the log.
    pub fn pointer_up(&mut self) -> Result<bool, SyncError> {
        let Some(action) = self.paint.finish() else {
            return Ok(false);
        };
        self.append_action(action)?;
        Ok(true)
    }

    /// Keyboard focus leaving the board ends the gesture like a release.
    pub fn focus_lost(&mut self) -> Result<bool, SyncError> {
        self.pointer_up()
    }

    /// Undo/redo shortcuts. Returns whether the host should suppress the
    /// key's default handling.
    pub fn handle_key(&mut self, key: &KeyInput) -> Result<bool, SyncError> {
        let Some(matched) = match_shortcut(key) else {
            return Ok(false);
        };
        match matched.shortcut {
            Shortcut::Undo => self.undo()?,
            Shortcut::Redo => self.redo()?,
        };
        Ok(matched.prevent_default)
    }

    pub fn view(&self) -> SessionView {
        SessionView::project(
            &self.state,
            &self.user.id,
            &self.hidden,
            self.sync.mode(),
            self.sync.session_id(),
        )
    }

    fn refresh_completion(&mut self) {
        let board_id = self.state.board_id.clone();
        if self.persisted.completion(&board_id) == CompletionStatus::Solved {
            return;
        }
        let game = &self.state.game;
        let status = if self.solution_status().is_solved {
            CompletionStatus::Solved
        } else if game.grid.count(Cell::Blank) < game.grid.rows() * game.grid.cols()
            || !game.log.is_empty()
        {
            CompletionStatus::InProgress
        } else {
            CompletionStatus::NotStarted
        };
        if self
            .persisted
            .set_completion(&board_id, status, self.clock.now_ms())
        {
            self.events.push(SessionEvent::Completion(status));
        }
    }

    pub fn state(&self) -> &GameSessionState {
        &self.state
    }

    pub fn user(&self) -> &LocalUser {
        &self.user
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> SyncMode {
        self.sync.mode()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.sync.session_id()
    }

    pub fn hidden_participants(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn is_painting(&self) -> bool {
        self.paint.is_active()
    }
}

impl Drop for SessionReconciler {
    fn drop(&mut self) {
        self.detach();
    }
}
