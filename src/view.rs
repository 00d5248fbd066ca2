//! What the board UI renders, derived from the session state on demand.

use std::collections::BTreeSet;

use nonogrid_core::{GameSessionState, SessionId, SolutionStatus};

use crate::sync::SyncMode;

/// Appended to the local user's name on screen only.
pub const YOU_SUFFIX: &str = " (you)";
const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantView {
    pub id: String,
    pub display_name: String,
    pub color: String,
    pub is_local: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CursorView {
    pub user_id: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    pub timestamp: u64,
    pub author: String,
    pub color: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub board_id: String,
    pub title: String,
    /// Revealed once the board is solved.
    pub secondary_title: Option<String>,
    pub next_board_id: Option<String>,
    pub mode: SyncMode,
    pub session_id: Option<SessionId>,
    pub participants: Vec<ParticipantView>,
    /// Everyone else's pointer; the local one is drawn by the host.
    pub cursors: Vec<CursorView>,
    pub chat: Vec<ChatLine>,
    pub status: SolutionStatus,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl SessionView {
    pub fn project(
        state: &GameSessionState,
        local_user_id: &str,
        hidden: &BTreeSet<String>,
        mode: SyncMode,
        session_id: Option<&SessionId>,
    ) -> Self {
        let puzzle = &state.game.puzzle;
        let status = puzzle.status(&state.game.grid);
        let display_name = |id: &str, name: &str| {
            if id == local_user_id {
                format!("{name}{YOU_SUFFIX}")
            } else {
                name.to_string()
            }
        };

        let visible = state
            .participants
            .iter()
            .filter(|(id, _)| id.as_str() == local_user_id || !hidden.contains(id.as_str()));
        let participants = visible
            .clone()
            .map(|(id, participant)| ParticipantView {
                id: id.clone(),
                display_name: display_name(id, &participant.name),
                color: participant.color.clone(),
                is_local: id == local_user_id,
            })
            .collect();
        let cursors = visible
            .filter(|(id, _)| id.as_str() != local_user_id)
            .filter_map(|(id, participant)| {
                let cursor = participant.cursor?;
                Some(CursorView {
                    user_id: id.clone(),
                    color: participant.color.clone(),
                    x: cursor.x,
                    y: cursor.y,
                })
            })
            .collect();
        let chat = state
            .chat
            .iter()
            .map(|message| {
                let author = state.participants.get(&message.user_id);
                ChatLine {
                    timestamp: message.timestamp,
                    author: match author {
                        Some(participant) => display_name(&message.user_id, &participant.name),
                        None => UNKNOWN_AUTHOR.to_string(),
                    },
                    color: author.map(|participant| participant.color.clone()),
                    message: message.message.clone(),
                }
            })
            .collect();

        Self {
            board_id: state.board_id.clone(),
            title: puzzle.title().to_string(),
            secondary_title: puzzle
                .secondary_title()
                .filter(|_| status.is_solved)
                .map(str::to_string),
            next_board_id: puzzle.next_board_id().map(str::to_string),
            mode,
            session_id: session_id.cloned(),
            participants,
            cursors,
            chat,
            status,
            can_undo: state.game.log.can_undo(),
            can_redo: state.game.log.can_redo(),
        }
    }

    pub fn local_participant(&self) -> Option<&ParticipantView> {
        self.participants.iter().find(|participant| participant.is_local)
    }
}
