//! Session aggregate and its shared-store document form.
//!
//! The store document keeps `users` and `cursors` as sibling maps and the
//! puzzle (with live cells) under `gameState/nonogram`. Parsing tolerates
//! every subtree the store may have dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::action::{ActionLog, CellUpdateAction};
use crate::error::WireError;
use crate::grid::Grid;
use crate::puzzle::{Puzzle, PuzzleDocument};
use crate::wire::{list_or_empty, map_or_empty, SparseList};

pub const USERS_PATH: &str = "users";
pub const CURSORS_PATH: &str = "cursors";
pub const CHAT_PATH: &str = "chatLog";
pub const GAME_STATE_PATH: &str = "gameState";
pub const LAST_UPDATED_PATH: &str = "lastUpdatedTime";

pub fn user_path(user_id: &str) -> String {
    format!("{USERS_PATH}/{user_id}")
}

pub fn user_activity_path(user_id: &str) -> String {
    format!("{USERS_PATH}/{user_id}/lastActiveTime")
}

pub fn cursor_path(user_id: &str) -> String {
    format!("{CURSORS_PATH}/{user_id}")
}

pub fn cell_path(row: usize, col: usize) -> String {
    format!("{GAME_STATE_PATH}/nonogram/cells/{row}/{col}")
}

/// Pointer position as fractions of the board's width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

impl CursorPosition {
    /// Clamps into `[0, 1]` and rounds to `decimals` places.
    pub fn normalized(x: f64, y: f64, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        let fix = |v: f64| {
            let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
            (v * scale).round() / scale
        };
        Self { x: fix(x), y: fix(y) }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Participant {
    pub name: String,
    pub color: String,
    pub last_active_time: u64,
    pub cursor: Option<CursorPosition>,
}

impl Participant {
    /// Stored records written by older clients may lack these.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.color.is_empty()
    }

    pub fn is_active(&self, now: u64, timeout_ms: u64) -> bool {
        now.saturating_sub(self.last_active_time) <= timeout_ms
    }

    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "color": self.color,
            "lastActiveTime": self.last_active_time,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    last_active_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
}

/// The part of a session that undo, redo and appends mutate atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub puzzle: Puzzle,
    pub grid: Grid,
    pub log: ActionLog,
}

impl GameState {
    pub fn new(puzzle: Puzzle) -> Self {
        let grid = puzzle.blank_grid();
        Self {
            puzzle,
            grid,
            log: ActionLog::new(),
        }
    }

    pub fn from_document(document: PuzzleDocument) -> Self {
        Self {
            puzzle: document.puzzle,
            grid: document.cells,
            log: ActionLog::new(),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, WireError> {
        let nonogram = value
            .get("nonogram")
            .cloned()
            .ok_or(WireError::Missing("gameState.nonogram"))?;
        let document = PuzzleDocument::from_value(nonogram)?;
        let entries = match value.get("actionLog") {
            Some(raw) => serde_json::from_value::<SparseList<CellUpdateAction>>(raw.clone())?
                .into_present(),
            None => Vec::new(),
        };
        let applied = value
            .get("numAppliedActionsInLog")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        Ok(Self {
            puzzle: document.puzzle,
            grid: document.cells,
            log: ActionLog::from_parts(entries, applied),
        })
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        let document = PuzzleDocument {
            puzzle: self.puzzle.clone(),
            cells: self.grid.clone(),
        };
        Ok(json!({
            "nonogram": document.to_value()?,
            "actionLog": serde_json::to_value(self.log.entries())?,
            "numAppliedActionsInLog": self.log.applied_count(),
        }))
    }

    pub fn undo(mut self) -> Self {
        self.log.undo(&mut self.grid);
        self
    }

    pub fn redo(mut self) -> Self {
        self.log.redo(&mut self.grid);
        self
    }

    pub fn append(mut self, action: CellUpdateAction) -> Self {
        self.log.append(action);
        self
    }

    /// Blank board, empty history.
    pub fn reset(mut self) -> Self {
        self.grid = self.grid.cleared();
        self.log.clear();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSessionState {
    pub board_id: String,
    pub last_updated_time: u64,
    pub participants: BTreeMap<String, Participant>,
    pub game: GameState,
    pub chat: Vec<ChatMessage>,
}

impl GameSessionState {
    pub fn new(board_id: impl Into<String>, game: GameState, now: u64) -> Self {
        Self {
            board_id: board_id.into(),
            last_updated_time: now,
            participants: BTreeMap::new(),
            game,
            chat: Vec::new(),
        }
    }

    /// Parses a store snapshot, substituting empty containers for dropped
    /// subtrees and merging `cursors` into the participants.
    pub fn from_snapshot(snapshot: &Value) -> Result<Self, WireError> {
        let game_value = snapshot
            .get(GAME_STATE_PATH)
            .ok_or(WireError::Missing("gameState"))?;
        let game = GameState::from_value(game_value)?;
        let board_id = snapshot
            .get("boardId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| game.puzzle.id().to_string());
        let last_updated_time = snapshot
            .get(LAST_UPDATED_PATH)
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let mut cursors = map_or_empty::<CursorPosition>(snapshot.get(CURSORS_PATH));
        let participants = map_or_empty::<WireUser>(snapshot.get(USERS_PATH))
            .into_iter()
            .map(|(id, user)| {
                let participant = Participant {
                    name: user.name.unwrap_or_default(),
                    color: user.color.unwrap_or_default(),
                    last_active_time: user.last_active_time.unwrap_or(0),
                    cursor: cursors.remove(&id),
                };
                (id, participant)
            })
            .collect();
        let chat = list_or_empty::<ChatMessage>(snapshot.get(CHAT_PATH));

        Ok(Self {
            board_id,
            last_updated_time,
            participants,
            game,
            chat,
        })
    }

    pub fn to_snapshot(&self) -> Result<Value, WireError> {
        let users: serde_json::Map<String, Value> = self
            .participants
            .iter()
            .map(|(id, participant)| (id.clone(), participant.to_value()))
            .collect();
        let cursors: serde_json::Map<String, Value> = self
            .participants
            .iter()
            .filter_map(|(id, participant)| {
                let cursor = participant.cursor?;
                serde_json::to_value(cursor).ok().map(|v| (id.clone(), v))
            })
            .collect();
        Ok(json!({
            "boardId": self.board_id,
            "lastUpdatedTime": self.last_updated_time,
            "users": users,
            "cursors": cursors,
            "gameState": self.game.to_value()?,
            "chatLog": serde_json::to_value(&self.chat)?,
        }))
    }
}
