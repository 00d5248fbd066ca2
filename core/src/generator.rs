use rand::Rng;

use crate::cell::Cell;
use crate::error::GenerateError;
use crate::grid::{derive_clues, Grid};
use crate::puzzle::Puzzle;
use crate::session_id::random_id;
use crate::solver::solve_with_logic;

pub const GENERATED_ID_LEN: usize = 8;
pub const GENERATED_TITLE: &str = "Random Nonogram";
pub const FILLED_COLOR: &str = "#808080";
pub const EMPTY_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Chance that any one cell of the hidden solution is filled.
    pub fill_probability: f64,
    /// Candidate grids drawn before giving up.
    pub max_attempts: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fill_probability: 0.75,
            max_attempts: 10_000,
        }
    }
}

impl GeneratorConfig {
    fn validate(&self, size: usize) -> Result<(), GenerateError> {
        if size == 0 {
            return Err(GenerateError::ZeroSize);
        }
        let p = self.fill_probability;
        if !(p > 0.0 && p <= 1.0) {
            return Err(GenerateError::FillProbability(p));
        }
        Ok(())
    }
}

fn random_solution<R: Rng + ?Sized>(size: usize, fill_probability: f64, rng: &mut R) -> Grid {
    let mut grid = Grid::new(size, size);
    for row in 0..size {
        for col in 0..size {
            let cell = if rng.random_bool(fill_probability) {
                Cell::Filled
            } else {
                Cell::Crossed
            };
            let _ = grid.set(row, col, cell);
        }
    }
    grid
}

/// Builds the puzzle for `solution`, or `None` when some line has no boxes.
fn puzzle_for<R: Rng + ?Sized>(solution: Grid, rng: &mut R) -> Option<Puzzle> {
    let (row_clues, col_clues) = derive_clues(&solution);
    if row_clues.iter().chain(&col_clues).any(|clue| clue.is_empty()) {
        return None;
    }
    let colors = solution
        .to_rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Cell::Filled => FILLED_COLOR.to_string(),
                    _ => EMPTY_COLOR.to_string(),
                })
                .collect()
        })
        .collect();
    Puzzle::new(random_id(rng, GENERATED_ID_LEN), GENERATED_TITLE, row_clues, col_clues)
        .and_then(|puzzle| puzzle.with_solution(solution, Some(colors)))
        .ok()
}

/// A `size` x `size` puzzle from a random solution. Every row and column has
/// at least one box.
pub fn generate_random_nonogram<R: Rng + ?Sized>(
    size: usize,
    rng: &mut R,
    config: &GeneratorConfig,
) -> Result<Puzzle, GenerateError> {
    config.validate(size)?;
    for _ in 0..config.max_attempts {
        let solution = random_solution(size, config.fill_probability, rng);
        if let Some(puzzle) = puzzle_for(solution, rng) {
            return Ok(puzzle);
        }
    }
    Err(GenerateError::AttemptsExhausted {
        attempts: config.max_attempts,
    })
}

/// Like [`generate_random_nonogram`], but only accepts puzzles the logic
/// solver finishes without guessing.
pub fn generate_human_solvable_nonogram<R: Rng + ?Sized>(
    size: usize,
    rng: &mut R,
    config: &GeneratorConfig,
) -> Result<Puzzle, GenerateError> {
    config.validate(size)?;
    for _ in 0..config.max_attempts {
        let solution = random_solution(size, config.fill_probability, rng);
        let Some(puzzle) = puzzle_for(solution, rng) else {
            continue;
        };
        if solve_with_logic(&puzzle).is_some() {
            return Ok(puzzle);
        }
    }
    Err(GenerateError::AttemptsExhausted {
        attempts: config.max_attempts,
    })
}
