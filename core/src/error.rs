use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid must have at least one row and one column")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cell ({row}, {col}) is outside a {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleError {
    #[error("puzzle needs at least one row clue and one column clue")]
    NoClues,
    #[error("{axis} clue {index} contains a zero-length run")]
    ZeroRun { axis: &'static str, index: usize },
    #[error("{axis} clue {index} needs {needed} cells but the line has {len}")]
    ClueTooLong {
        axis: &'static str,
        index: usize,
        needed: usize,
        len: usize,
    },
    #[error("{what} is {found_rows}x{found_cols}, expected {rows}x{cols}")]
    ShapeMismatch {
        what: &'static str,
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot is missing `{0}`")]
    Missing(&'static str),
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionIdError {
    #[error("session id must be {expected} chars, got {found}")]
    InvalidLength { expected: usize, found: usize },
    #[error("invalid character '{ch}' at position {index}")]
    InvalidCharacter { ch: char, index: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("puzzle size must be at least 1")]
    ZeroSize,
    #[error("fill probability {0} is outside (0, 1]")]
    FillProbability(f64),
    #[error("no logic-solvable puzzle found in {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
}
