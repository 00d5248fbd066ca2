use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cell::Cell;
use crate::error::{PuzzleError, WireError};
use crate::grid::{solution_status, Clue, Grid, SolutionStatus};
use crate::wire::SparseList;

/// Immutable puzzle definition. The live board lives next to it in
/// [`crate::session::GameState`].
#[derive(Debug, Clone, PartialEq)]
pub struct Puzzle {
    id: String,
    title: String,
    secondary_title: Option<String>,
    next_board_id: Option<String>,
    row_clues: Vec<Clue>,
    col_clues: Vec<Clue>,
    solution: Option<Grid>,
    solution_colors: Option<Vec<Vec<String>>>,
}

impl Puzzle {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        row_clues: Vec<Clue>,
        col_clues: Vec<Clue>,
    ) -> Result<Self, PuzzleError> {
        if row_clues.is_empty() || col_clues.is_empty() {
            return Err(PuzzleError::NoClues);
        }
        validate_clues("row", &row_clues, col_clues.len())?;
        validate_clues("column", &col_clues, row_clues.len())?;
        Ok(Self {
            id: id.into(),
            title: title.into(),
            secondary_title: None,
            next_board_id: None,
            row_clues,
            col_clues,
            solution: None,
            solution_colors: None,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_secondary_title(mut self, title: impl Into<String>) -> Self {
        self.secondary_title = Some(title.into());
        self
    }

    pub fn with_next_board_id(mut self, id: impl Into<String>) -> Self {
        self.next_board_id = Some(id.into());
        self
    }

    pub fn with_solution(
        mut self,
        solution: Grid,
        colors: Option<Vec<Vec<String>>>,
    ) -> Result<Self, PuzzleError> {
        self.check_shape("solution", solution.rows(), solution.cols())?;
        if let Some(colors) = colors.as_ref() {
            let found_cols = colors.first().map(Vec::len).unwrap_or(0);
            let ragged = colors.iter().any(|row| row.len() != found_cols);
            if ragged || colors.len() != self.rows() || found_cols != self.cols() {
                return Err(PuzzleError::ShapeMismatch {
                    what: "solution colors",
                    rows: self.rows(),
                    cols: self.cols(),
                    found_rows: colors.len(),
                    found_cols,
                });
            }
        }
        self.solution = Some(solution);
        self.solution_colors = colors;
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Only meant to be shown once the board is solved.
    pub fn secondary_title(&self) -> Option<&str> {
        self.secondary_title.as_deref()
    }

    pub fn next_board_id(&self) -> Option<&str> {
        self.next_board_id.as_deref()
    }

    pub fn rows(&self) -> usize {
        self.row_clues.len()
    }

    pub fn cols(&self) -> usize {
        self.col_clues.len()
    }

    pub fn row_clues(&self) -> &[Clue] {
        &self.row_clues
    }

    pub fn col_clues(&self) -> &[Clue] {
        &self.col_clues
    }

    pub fn solution(&self) -> Option<&Grid> {
        self.solution.as_ref()
    }

    pub fn solution_colors(&self) -> Option<&[Vec<String>]> {
        self.solution_colors.as_deref()
    }

    pub fn blank_grid(&self) -> Grid {
        Grid::new(self.rows(), self.cols())
    }

    pub fn status(&self, grid: &Grid) -> SolutionStatus {
        solution_status(grid, &self.row_clues, &self.col_clues)
    }

    pub fn check_shape(&self, what: &'static str, rows: usize, cols: usize) -> Result<(), PuzzleError> {
        if rows != self.rows() || cols != self.cols() {
            return Err(PuzzleError::ShapeMismatch {
                what,
                rows: self.rows(),
                cols: self.cols(),
                found_rows: rows,
                found_cols: cols,
            });
        }
        Ok(())
    }

    /// Wire document for a fresh game: every cell blank.
    pub fn to_document(&self) -> PuzzleDocument {
        PuzzleDocument {
            puzzle: self.clone(),
            cells: self.blank_grid(),
        }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        self.to_document().to_json()
    }
}

fn validate_clues(axis: &'static str, clues: &[Clue], len: usize) -> Result<(), PuzzleError> {
    for (index, clue) in clues.iter().enumerate() {
        if clue.runs().contains(&0) {
            return Err(PuzzleError::ZeroRun { axis, index });
        }
        let needed = clue.min_span();
        if needed > len {
            return Err(PuzzleError::ClueTooLong {
                axis,
                index,
                needed,
                len,
            });
        }
    }
    Ok(())
}

/// A puzzle plus the board state it travels with on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleDocument {
    pub puzzle: Puzzle,
    pub cells: Grid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireNonogram {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secondary_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_board_id: Option<String>,
    #[serde(default)]
    row_counts: SparseList<Vec<u32>>,
    #[serde(default)]
    col_counts: SparseList<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cells: Option<Vec<Vec<Cell>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    solution: Option<Vec<Vec<Cell>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    solution_colors: Option<Vec<Vec<String>>>,
}

impl PuzzleDocument {
    pub fn from_json(raw: &str) -> Result<Self, WireError> {
        let wire: WireNonogram = serde_json::from_str(raw)?;
        Self::from_wire(wire)
    }

    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let wire: WireNonogram = serde_json::from_value(value)?;
        Self::from_wire(wire)
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        Ok(serde_json::to_value(self.to_wire())?)
    }

    pub(crate) fn from_wire(wire: WireNonogram) -> Result<Self, WireError> {
        let cells = match wire.cells {
            Some(rows) => Some(Grid::from_rows(rows)?),
            None => None,
        };
        // Trailing empty clues vanish on the wire; the board shape wins.
        let (rows, cols) = match cells.as_ref() {
            Some(grid) => (grid.rows(), grid.cols()),
            None => (wire.row_counts.wire_len(), wire.col_counts.wire_len()),
        };
        if wire.row_counts.wire_len() > rows || wire.col_counts.wire_len() > cols {
            return Err(PuzzleError::ShapeMismatch {
                what: "clues",
                rows,
                cols,
                found_rows: wire.row_counts.wire_len(),
                found_cols: wire.col_counts.wire_len(),
            }
            .into());
        }
        let row_clues = wire
            .row_counts
            .into_dense(rows)
            .into_iter()
            .map(Clue::from)
            .collect();
        let col_clues = wire
            .col_counts
            .into_dense(cols)
            .into_iter()
            .map(Clue::from)
            .collect();
        let mut puzzle = Puzzle::new(wire.id, wire.title, row_clues, col_clues)?;
        puzzle.secondary_title = wire.secondary_title;
        puzzle.next_board_id = wire.next_board_id;
        if let Some(solution) = wire.solution {
            puzzle = puzzle.with_solution(Grid::from_rows(solution)?, wire.solution_colors)?;
        }
        let cells = cells.unwrap_or_else(|| puzzle.blank_grid());
        puzzle.check_shape("cells", cells.rows(), cells.cols())?;
        Ok(Self { puzzle, cells })
    }

    pub(crate) fn to_wire(&self) -> WireNonogram {
        let puzzle = &self.puzzle;
        WireNonogram {
            id: puzzle.id.clone(),
            title: puzzle.title.clone(),
            secondary_title: puzzle.secondary_title.clone(),
            next_board_id: puzzle.next_board_id.clone(),
            row_counts: SparseList::dense(
                puzzle.row_clues.iter().map(|c| c.runs().to_vec()).collect(),
            ),
            col_counts: SparseList::dense(
                puzzle.col_clues.iter().map(|c| c.runs().to_vec()).collect(),
            ),
            cells: Some(self.cells.to_rows()),
            solution: puzzle.solution.as_ref().map(Grid::to_rows),
            solution_colors: puzzle.solution_colors.clone(),
        }
    }
}
