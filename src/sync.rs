use std::rc::Rc;

use nonogrid_core::session::{
    cell_path, cursor_path, user_activity_path, user_path, CHAT_PATH, GAME_STATE_PATH,
    LAST_UPDATED_PATH,
};
use nonogrid_core::{Cell, ChatMessage, CursorPosition, GameSessionState, GameState, Participant, SessionId};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::SyncError;
use crate::store::SharedSessionStore;

/// Pure transform of the game subtree. Must derive its result only from the
/// state it is given: the store may call it again with a fresher snapshot.
pub type GameReducer = Rc<dyn Fn(GameState) -> GameState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Local,
    Remote,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Local => "local",
            SyncMode::Remote => "remote",
        }
    }
}

/// Where session mutations go. The local copy passed in is the reconciler's
/// authoritative state; remote implementations may leave it alone and wait
/// for the store to echo the change back.
pub trait SessionSync {
    fn mode(&self) -> SyncMode;

    fn session_id(&self) -> Option<&SessionId>;

    fn apply_transaction(
        &self,
        state: &mut GameSessionState,
        reducer: GameReducer,
    ) -> Result<(), SyncError>;

    fn update_cell(
        &self,
        state: &mut GameSessionState,
        row: usize,
        col: usize,
        cell: Cell,
        now_ms: u64,
    ) -> Result<(), SyncError>;

    fn update_cursor(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        cursor: CursorPosition,
    ) -> Result<(), SyncError>;

    fn touch_activity(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        now_ms: u64,
    ) -> Result<(), SyncError>;

    fn write_participant(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        participant: Participant,
    ) -> Result<(), SyncError>;

    fn remove_participant(&self, state: &mut GameSessionState, user_id: &str) -> Result<(), SyncError>;

    fn send_chat(&self, state: &mut GameSessionState, message: ChatMessage) -> Result<(), SyncError>;
}

fn set_local_cell(state: &mut GameSessionState, row: usize, col: usize, cell: Cell, now_ms: u64) {
    if state.game.grid.set(row, col, cell).is_ok() {
        state.last_updated_time = now_ms;
    }
}

/// Offline play: everything applies to the local copy immediately.
#[derive(Debug, Default)]
pub struct LocalSessionSync;

impl SessionSync for LocalSessionSync {
    fn mode(&self) -> SyncMode {
        SyncMode::Local
    }

    fn session_id(&self) -> Option<&SessionId> {
        None
    }

    fn apply_transaction(
        &self,
        state: &mut GameSessionState,
        reducer: GameReducer,
    ) -> Result<(), SyncError> {
        state.game = reducer(state.game.clone());
        Ok(())
    }

    fn update_cell(
        &self,
        state: &mut GameSessionState,
        row: usize,
        col: usize,
        cell: Cell,
        now_ms: u64,
    ) -> Result<(), SyncError> {
        set_local_cell(state, row, col, cell, now_ms);
        Ok(())
    }

    fn update_cursor(
        &self,
        _state: &mut GameSessionState,
        _user_id: &str,
        _cursor: CursorPosition,
    ) -> Result<(), SyncError> {
        // Nobody to show it to.
        Ok(())
    }

    fn touch_activity(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        now_ms: u64,
    ) -> Result<(), SyncError> {
        if let Some(participant) = state.participants.get_mut(user_id) {
            participant.last_active_time = now_ms;
        }
        Ok(())
    }

    fn write_participant(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        participant: Participant,
    ) -> Result<(), SyncError> {
        state.participants.insert(user_id.to_string(), participant);
        Ok(())
    }

    fn remove_participant(&self, state: &mut GameSessionState, user_id: &str) -> Result<(), SyncError> {
        state.participants.remove(user_id);
        Ok(())
    }

    fn send_chat(&self, state: &mut GameSessionState, message: ChatMessage) -> Result<(), SyncError> {
        state.chat.push(message);
        Ok(())
    }
}

/// Collaborative play through a [`SharedSessionStore`].
///
/// Transactions run against the store and reach the local copy through the
/// change notification. Direct writes are also applied locally right away so
/// painting does not wait for the echo.
pub struct RemoteSessionSync {
    store: Rc<dyn SharedSessionStore>,
    session: SessionId,
}

impl RemoteSessionSync {
    pub fn new(store: Rc<dyn SharedSessionStore>, session: SessionId) -> Self {
        Self { store, session }
    }

    pub fn store(&self) -> &Rc<dyn SharedSessionStore> {
        &self.store
    }
}

impl SessionSync for RemoteSessionSync {
    fn mode(&self) -> SyncMode {
        SyncMode::Remote
    }

    fn session_id(&self) -> Option<&SessionId> {
        Some(&self.session)
    }

    fn apply_transaction(
        &self,
        _state: &mut GameSessionState,
        reducer: GameReducer,
    ) -> Result<(), SyncError> {
        let update = move |current: Option<Value>| -> Option<Value> {
            let current = current?;
            let game = match GameState::from_value(&current) {
                Ok(game) => game,
                Err(err) => {
                    warn!(%err, "transaction saw a malformed game state");
                    return None;
                }
            };
            reducer(game).to_value().ok()
        };
        self.store
            .transaction(&self.session, GAME_STATE_PATH, &update)?;
        Ok(())
    }

    fn update_cell(
        &self,
        state: &mut GameSessionState,
        row: usize,
        col: usize,
        cell: Cell,
        now_ms: u64,
    ) -> Result<(), SyncError> {
        set_local_cell(state, row, col, cell, now_ms);
        self.store
            .set(&self.session, LAST_UPDATED_PATH, json!(now_ms))?;
        self.store
            .set(&self.session, &cell_path(row, col), json!(cell.as_wire_str()))?;
        Ok(())
    }

    fn update_cursor(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        cursor: CursorPosition,
    ) -> Result<(), SyncError> {
        if let Some(participant) = state.participants.get_mut(user_id) {
            participant.cursor = Some(cursor);
        }
        self.store.set(
            &self.session,
            &cursor_path(user_id),
            json!({ "x": cursor.x, "y": cursor.y }),
        )?;
        Ok(())
    }

    fn touch_activity(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        now_ms: u64,
    ) -> Result<(), SyncError> {
        if let Some(participant) = state.participants.get_mut(user_id) {
            participant.last_active_time = now_ms;
        }
        self.store
            .set(&self.session, &user_activity_path(user_id), json!(now_ms))?;
        Ok(())
    }

    fn write_participant(
        &self,
        state: &mut GameSessionState,
        user_id: &str,
        participant: Participant,
    ) -> Result<(), SyncError> {
        self.store
            .set(&self.session, &user_path(user_id), participant.to_value())?;
        state.participants.insert(user_id.to_string(), participant);
        Ok(())
    }

    fn remove_participant(&self, state: &mut GameSessionState, user_id: &str) -> Result<(), SyncError> {
        self.store
            .set(&self.session, &user_path(user_id), Value::Null)?;
        self.store
            .set(&self.session, &cursor_path(user_id), Value::Null)?;
        state.participants.remove(user_id);
        Ok(())
    }

    fn send_chat(&self, _state: &mut GameSessionState, message: ChatMessage) -> Result<(), SyncError> {
        let value = serde_json::to_value(&message).map_err(nonogrid_core::WireError::from)?;
        self.store.push(&self.session, CHAT_PATH, value)?;
        Ok(())
    }
}
