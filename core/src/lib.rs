pub mod action;
pub mod cell;
pub mod codec;
pub mod error;
pub mod generator;
pub mod grid;
pub mod paint;
pub mod puzzle;
pub mod session;
pub mod session_id;
pub mod solver;
pub mod wire;

pub use action::{ActionLog, CellUpdateAction, DragDirection};
pub use cell::{Cell, CellPos, CellWrite};
pub use codec::{decode, decode_current, encode, Versioned};
pub use error::{GenerateError, GridError, PuzzleError, SessionIdError, WireError};
pub use generator::{generate_human_solvable_nonogram, generate_random_nonogram, GeneratorConfig};
pub use grid::{derive_clues, runs, solution_status, Clue, Grid, SolutionStatus};
pub use paint::{PaintController, PointerButton};
pub use puzzle::{Puzzle, PuzzleDocument};
pub use session::{ChatMessage, CursorPosition, GameSessionState, GameState, Participant};
pub use session_id::{is_valid_session_id, random_id, SessionId, ID_ALPHABET, SESSION_ID_LEN};
pub use solver::{count_solutions, solve_with_logic};
