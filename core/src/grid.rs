use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellPos};
use crate::error::GridError;

/// Rectangular cell matrix, stored row-major. Dimensions never change after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled_with(rows, cols, Cell::Blank)
    }

    pub fn filled_with(rows: usize, cols: usize, cell: Cell) -> Self {
        Self {
            rows,
            cols,
            cells: vec![cell; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, GridError> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || expected == 0 {
            return Err(GridError::Empty);
        }
        let mut cells = Vec::with_capacity(rows.len() * expected);
        for (row, line) in rows.iter().enumerate() {
            if line.len() != expected {
                return Err(GridError::Ragged {
                    row,
                    expected,
                    found: line.len(),
                });
            }
            cells.extend_from_slice(line);
        }
        Ok(Self {
            rows: rows.len(),
            cols: expected,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if !self.contains(row, col) {
            return None;
        }
        Some(self.cells[row * self.cols + col])
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> Result<(), GridError> {
        if !self.contains(row, col) {
            return Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        self.cells[row * self.cols + col] = cell;
        Ok(())
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    pub fn column(&self, col: usize) -> Vec<Cell> {
        (0..self.rows)
            .map(|row| self.cells[row * self.cols + col])
            .collect()
    }

    pub fn set_row(&mut self, row: usize, line: &[Cell]) {
        let start = row * self.cols;
        self.cells[start..start + self.cols].copy_from_slice(line);
    }

    pub fn set_column(&mut self, col: usize, line: &[Cell]) {
        for (row, cell) in line.iter().enumerate().take(self.rows) {
            self.cells[row * self.cols + col] = *cell;
        }
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }

    pub fn positions(&self) -> impl Iterator<Item = (CellPos, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| (CellPos::new(idx / self.cols, idx % self.cols), *cell))
    }

    /// Same shape, every cell blank.
    pub fn cleared(&self) -> Self {
        Self::new(self.rows, self.cols)
    }

    pub fn to_rows(&self) -> Vec<Vec<Cell>> {
        self.cells.chunks(self.cols).map(<[Cell]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<Cell>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

/// Run lengths one row or column must contain, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Clue(Vec<u32>);

impl Clue {
    pub fn new(runs: Vec<u32>) -> Self {
        Self(runs)
    }

    pub fn runs(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|run| *run as usize).sum()
    }

    /// Shortest line that can hold every run with single gaps between them.
    pub fn min_span(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.total() + self.0.len() - 1
        }
    }
}

impl From<Vec<u32>> for Clue {
    fn from(runs: Vec<u32>) -> Self {
        Self(runs)
    }
}

/// Maximal runs of `Filled` cells; blanks and crosses both break a run.
pub fn runs(line: &[Cell]) -> Clue {
    let mut out = Vec::new();
    let mut streak = 0u32;
    for cell in line {
        if cell.is_filled() {
            streak += 1;
        } else if streak > 0 {
            out.push(streak);
            streak = 0;
        }
    }
    if streak > 0 {
        out.push(streak);
    }
    Clue(out)
}

pub fn derive_clues(grid: &Grid) -> (Vec<Clue>, Vec<Clue>) {
    let row_clues = (0..grid.rows()).map(|row| runs(grid.row(row))).collect();
    let col_clues = (0..grid.cols())
        .map(|col| runs(&grid.column(col)))
        .collect();
    (row_clues, col_clues)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolutionStatus {
    pub is_solved: bool,
    /// Enough cells are filled to finish, but some line is arranged wrong.
    pub is_not_complete_because_has_mistakes: bool,
    /// Number of rows and columns whose runs differ from their clue.
    pub num_mistakes: usize,
    pub num_filled_cells: usize,
    pub total_required_filled_cells: usize,
}

pub fn solution_status(grid: &Grid, row_clues: &[Clue], col_clues: &[Clue]) -> SolutionStatus {
    let mut num_mistakes = 0;
    for (row, clue) in row_clues.iter().enumerate().take(grid.rows()) {
        if runs(grid.row(row)) != *clue {
            num_mistakes += 1;
        }
    }
    for (col, clue) in col_clues.iter().enumerate().take(grid.cols()) {
        if runs(&grid.column(col)) != *clue {
            num_mistakes += 1;
        }
    }
    let num_filled_cells = grid.count(Cell::Filled);
    let total_required_filled_cells: usize = row_clues.iter().map(Clue::total).sum();
    SolutionStatus {
        is_solved: num_mistakes == 0 && num_filled_cells == total_required_filled_cells,
        is_not_complete_because_has_mistakes: num_mistakes > 0
            && num_filled_cells >= total_required_filled_cells,
        num_mistakes,
        num_filled_cells,
        total_required_filled_cells,
    }
}
