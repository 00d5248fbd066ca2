//! Loading a puzzle or a session for the current route.
//!
//! Fetches resolve later than they start, and the route may change in
//! between. Each fetch takes a [`LoadTicket`]; only the newest ticket for a
//! slot may apply its result.

use std::cell::RefCell;
use std::collections::HashMap;

use nonogrid_core::{PuzzleDocument, SessionId, WireError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::router::GameRoute;
use crate::store::SharedSessionStore;

pub const NOT_FOUND_MESSAGE: &str = "The nonogram you requested does not exist.";
pub const INVALID_SESSION_MESSAGE: &str =
    "That game session does not exist. Starting a private game instead.";

/// Stored puzzle as the document store returns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBoard {
    pub board_json: String,
    pub title: Option<String>,
}

/// Read-only puzzle catalog keyed by board id.
pub trait PuzzleDocumentStore {
    fn fetch(&self, board_id: &str) -> Option<StoredBoard>;
}

#[derive(Debug, Default)]
pub struct InMemoryPuzzleStore {
    boards: RefCell<HashMap<String, StoredBoard>>,
}

impl InMemoryPuzzleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, board_id: &str, board_json: String, title: Option<String>) {
        self.boards
            .borrow_mut()
            .insert(board_id.to_string(), StoredBoard { board_json, title });
    }
}

impl PuzzleDocumentStore for InMemoryPuzzleStore {
    fn fetch(&self, board_id: &str) -> Option<StoredBoard> {
        self.boards.borrow().get(board_id).cloned()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The nonogram you requested does not exist.")]
    NotFound,
    #[error("stored puzzle is unreadable: {0}")]
    Malformed(#[from] WireError),
}

pub fn load_puzzle(
    store: &dyn PuzzleDocumentStore,
    board_id: &str,
) -> Result<PuzzleDocument, LoadError> {
    let Some(stored) = store.fetch(board_id) else {
        return Err(LoadError::NotFound);
    };
    let mut document = PuzzleDocument::from_json(&stored.board_json)?;
    if let Some(title) = stored.title.filter(|title| !title.trim().is_empty()) {
        document.puzzle = document.puzzle.with_title(title);
    }
    Ok(document)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCheck {
    /// Join this session.
    Join(SessionId),
    /// Play offline. When `alert` is set, show it and replace the URL with
    /// `redirect`.
    Offline {
        alert: Option<&'static str>,
        redirect: GameRoute,
    },
}

/// Decides whether the route's session can be joined.
pub fn check_session(
    store: &dyn SharedSessionStore,
    route: &GameRoute,
    rejected_session: Option<&str>,
) -> SessionCheck {
    let invalid = SessionCheck::Offline {
        alert: Some(INVALID_SESSION_MESSAGE),
        redirect: route.without_session(),
    };
    if let Some(raw) = rejected_session {
        warn!(session = raw, "malformed session id in url");
        return invalid;
    }
    let Some(session) = route.session.clone() else {
        return SessionCheck::Offline {
            alert: None,
            redirect: route.clone(),
        };
    };
    if !store.exists(&session) {
        warn!(session = %session, "session not found");
        return invalid;
    }
    SessionCheck::Join(session)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadSlot {
    Puzzle,
    Session,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    slot: LoadSlot,
    key: String,
    generation: u64,
}

impl LoadTicket {
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    current: HashMap<LoadSlot, (String, u64)>,
    next_generation: u64,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a load, superseding any in flight for the same slot.
    pub fn begin(&mut self, slot: LoadSlot, key: &str) -> LoadTicket {
        self.next_generation = self.next_generation.wrapping_add(1);
        let generation = self.next_generation;
        self.current.insert(slot, (key.to_string(), generation));
        LoadTicket {
            slot,
            key: key.to_string(),
            generation,
        }
    }

    /// Teardown: whatever is in flight for `slot` will be discarded.
    pub fn cancel(&mut self, slot: LoadSlot) {
        self.current.remove(&slot);
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.current
            .get(&ticket.slot)
            .is_some_and(|(key, generation)| *generation == ticket.generation && *key == ticket.key)
    }

    /// Hands back `result` only if `ticket` is still the newest for its slot.
    pub fn complete<T>(&mut self, ticket: &LoadTicket, result: T) -> Option<T> {
        if !self.is_current(ticket) {
            debug!(slot = ?ticket.slot, key = %ticket.key, "discarding stale load");
            return None;
        }
        self.current.remove(&ticket.slot);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_wins() {
        let mut tracker = LoadTracker::new();
        let first = tracker.begin(LoadSlot::Puzzle, "a");
        let second = tracker.begin(LoadSlot::Puzzle, "b");
        assert_eq!(tracker.complete(&first, 1), None);
        assert_eq!(tracker.complete(&second, 2), Some(2));
        assert_eq!(tracker.complete(&second, 3), None);
    }

    #[test]
    fn cancelled_loads_are_discarded() {
        let mut tracker = LoadTracker::new();
        let session = tracker.begin(LoadSlot::Session, "s");
        let puzzle = tracker.begin(LoadSlot::Puzzle, "p");
        tracker.cancel(LoadSlot::Session);
        assert_eq!(tracker.complete(&session, ()), None);
        assert_eq!(tracker.complete(&puzzle, ()), Some(()));
    }
}
