//! Deductive solver used to keep generated puzzles solvable without guessing.
//!
//! The working grid uses `Blank` for "unknown", `Filled` for a known box and
//! `Crossed` for a known gap. Every rule only writes cells it can prove.

use thiserror::Error;

use crate::cell::Cell;
use crate::grid::{Clue, Grid};
use crate::puzzle::Puzzle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Row(usize),
    Column(usize),
}

/// No arrangement of the clue fits what is already known about a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no arrangement fits {line:?}")]
pub struct Contradiction {
    pub line: Line,
}

pub trait LogicRule {
    fn name(&self) -> &'static str;

    /// Returns how many cells this pass determined.
    fn apply(&self, puzzle: &Puzzle, grid: &mut Grid) -> Result<usize, Contradiction>;
}

/// Lines with an empty clue hold no boxes at all.
pub struct EmptyLineRule;

/// Cells every placement of a run must cover, ignoring what is already known.
pub struct OverlapRule;

/// Exact per-line deduction: a cell is decided when every arrangement that
/// fits the known cells agrees on it.
pub struct LineSolverRule;

impl LogicRule for EmptyLineRule {
    fn name(&self) -> &'static str {
        "empty-line"
    }

    fn apply(&self, puzzle: &Puzzle, grid: &mut Grid) -> Result<usize, Contradiction> {
        for_each_line(puzzle, grid, |clue, line| {
            if !clue.is_empty() {
                return Some(Vec::new());
            }
            if line.contains(&Cell::Filled) {
                return None;
            }
            Some(vec![Cell::Crossed; line.len()])
        })
    }
}

impl LogicRule for OverlapRule {
    fn name(&self) -> &'static str {
        "overlap"
    }

    fn apply(&self, puzzle: &Puzzle, grid: &mut Grid) -> Result<usize, Contradiction> {
        for_each_line(puzzle, grid, |clue, line| {
            let len = line.len();
            let slack = len.checked_sub(clue.min_span())?;
            let mut out = line.to_vec();
            let mut leftmost = 0;
            for run in clue.runs() {
                let run = *run as usize;
                // Rightmost start is the leftmost start shifted by the slack.
                for cell in out.iter_mut().take(leftmost + run).skip(leftmost + slack) {
                    if *cell == Cell::Crossed {
                        return None;
                    }
                    *cell = Cell::Filled;
                }
                leftmost += run + 1;
            }
            Some(out)
        })
    }
}

impl LogicRule for LineSolverRule {
    fn name(&self) -> &'static str {
        "line-solver"
    }

    fn apply(&self, puzzle: &Puzzle, grid: &mut Grid) -> Result<usize, Contradiction> {
        for_each_line(puzzle, grid, |clue, line| solve_line(clue.runs(), line))
    }
}

pub fn default_rules() -> Vec<Box<dyn LogicRule>> {
    vec![
        Box::new(EmptyLineRule),
        Box::new(OverlapRule),
        Box::new(LineSolverRule),
    ]
}

/// Runs `deduce` over every row then every column. `deduce` returns the line
/// it proved (or `None` on contradiction); only blank cells are taken from it.
fn for_each_line<F>(puzzle: &Puzzle, grid: &mut Grid, mut deduce: F) -> Result<usize, Contradiction>
where
    F: FnMut(&Clue, &[Cell]) -> Option<Vec<Cell>>,
{
    let mut determined = 0;
    for (row, clue) in puzzle.row_clues().iter().enumerate() {
        let line = grid.row(row).to_vec();
        let proved = deduce(clue, &line).ok_or(Contradiction { line: Line::Row(row) })?;
        if let Some(merged) = merge(&line, &proved, &mut determined) {
            grid.set_row(row, &merged);
        }
    }
    for (col, clue) in puzzle.col_clues().iter().enumerate() {
        let line = grid.column(col);
        let proved = deduce(clue, &line).ok_or(Contradiction {
            line: Line::Column(col),
        })?;
        if let Some(merged) = merge(&line, &proved, &mut determined) {
            grid.set_column(col, &merged);
        }
    }
    Ok(determined)
}

fn merge(line: &[Cell], proved: &[Cell], determined: &mut usize) -> Option<Vec<Cell>> {
    if proved.len() != line.len() {
        return None;
    }
    let mut merged = line.to_vec();
    let mut changed = false;
    for (cell, new) in merged.iter_mut().zip(proved) {
        if cell.is_blank() && !new.is_blank() {
            *cell = *new;
            *determined += 1;
            changed = true;
        }
    }
    changed.then_some(merged)
}

/// `reach[i][j]`: the first `i` cells can hold exactly the first `j` runs,
/// with every cell after the last run empty.
fn prefix_reach(runs: &[u32], line: &[Cell]) -> Vec<Vec<bool>> {
    let n = line.len();
    let k = runs.len();
    let mut crossed_before = vec![0usize; n + 1];
    for (i, cell) in line.iter().enumerate() {
        crossed_before[i + 1] = crossed_before[i] + usize::from(*cell == Cell::Crossed);
    }
    let mut reach = vec![vec![false; k + 1]; n + 1];
    reach[0][0] = true;
    for i in 1..=n {
        for j in 0..=k {
            let mut ok = reach[i - 1][j] && line[i - 1] != Cell::Filled;
            if !ok && j > 0 {
                let run = runs[j - 1] as usize;
                if run <= i && crossed_before[i] == crossed_before[i - run] {
                    let start = i - run;
                    ok = if start == 0 {
                        j == 1
                    } else {
                        line[start - 1] != Cell::Filled && reach[start - 1][j - 1]
                    };
                }
            }
            reach[i][j] = ok;
        }
    }
    reach
}

/// Decides every cell of one line that all fitting arrangements agree on.
pub fn solve_line(runs: &[u32], line: &[Cell]) -> Option<Vec<Cell>> {
    let n = line.len();
    let k = runs.len();
    let forward = prefix_reach(runs, line);
    if !forward[n][k] {
        return None;
    }
    let reversed_runs: Vec<u32> = runs.iter().rev().copied().collect();
    let reversed_line: Vec<Cell> = line.iter().rev().copied().collect();
    let backward = prefix_reach(&reversed_runs, &reversed_line);
    // Cells `i..` can hold exactly the last `j` runs.
    let suffix = |i: usize, j: usize| backward[n - i][j];

    let mut can_empty = vec![false; n];
    for (p, slot) in can_empty.iter_mut().enumerate() {
        if line[p] == Cell::Filled {
            continue;
        }
        *slot = (0..=k).any(|j| forward[p][j] && suffix(p + 1, k - j));
    }

    // Difference array of positions some placed run may cover.
    let mut cover = vec![0i64; n + 1];
    let mut crossed_before = vec![0usize; n + 1];
    for (i, cell) in line.iter().enumerate() {
        crossed_before[i + 1] = crossed_before[i] + usize::from(*cell == Cell::Crossed);
    }
    for (j, run) in runs.iter().enumerate() {
        let run = *run as usize;
        if run > n {
            return None;
        }
        for start in 0..=(n - run) {
            let end = start + run;
            if crossed_before[end] != crossed_before[start] {
                continue;
            }
            let before_ok = if start == 0 {
                j == 0
            } else {
                line[start - 1] != Cell::Filled && forward[start - 1][j]
            };
            let after_ok = if end == n {
                j + 1 == k
            } else {
                line[end] != Cell::Filled && suffix(end + 1, k - j - 1)
            };
            if before_ok && after_ok {
                cover[start] += 1;
                cover[end] -= 1;
            }
        }
    }

    let mut out = line.to_vec();
    let mut running = 0i64;
    for p in 0..n {
        running += cover[p];
        let can_fill = running > 0;
        out[p] = match (can_fill, can_empty[p]) {
            (true, false) => Cell::Filled,
            (false, true) => Cell::Crossed,
            (true, true) => line[p],
            (false, false) => return None,
        };
    }
    Some(out)
}

fn blank_count(grid: &Grid) -> usize {
    grid.count(Cell::Blank)
}

/// Applies `rules` until the grid stops changing.
pub fn propagate(
    puzzle: &Puzzle,
    grid: &mut Grid,
    rules: &[Box<dyn LogicRule>],
) -> Result<(), Contradiction> {
    loop {
        let before = blank_count(grid);
        if before == 0 {
            return Ok(());
        }
        for rule in rules {
            rule.apply(puzzle, grid)?;
        }
        if blank_count(grid) == before {
            return Ok(());
        }
    }
}

/// Solves with deduction only. `None` means the puzzle needs guessing, or has
/// no solution.
pub fn solve_with_logic(puzzle: &Puzzle) -> Option<Grid> {
    let mut grid = puzzle.blank_grid();
    propagate(puzzle, &mut grid, &default_rules()).ok()?;
    if blank_count(&grid) > 0 || !puzzle.status(&grid).is_solved {
        return None;
    }
    Some(grid)
}

/// Counts solutions by propagation plus branching, stopping at `limit`.
pub fn count_solutions(puzzle: &Puzzle, limit: usize) -> usize {
    let rules = default_rules();
    let mut found = 0;
    search(puzzle, puzzle.blank_grid(), &rules, limit, &mut found);
    found
}

fn search(
    puzzle: &Puzzle,
    mut grid: Grid,
    rules: &[Box<dyn LogicRule>],
    limit: usize,
    found: &mut usize,
) {
    if *found >= limit || propagate(puzzle, &mut grid, rules).is_err() {
        return;
    }
    let Some((pos, _)) = grid.positions().find(|(_, cell)| cell.is_blank()) else {
        if puzzle.status(&grid).is_solved {
            *found += 1;
        }
        return;
    };
    for guess in [Cell::Filled, Cell::Crossed] {
        let mut branch = grid.clone();
        let _ = branch.set(pos.row, pos.col, guess);
        search(puzzle, branch, rules, limit, found);
        if *found >= limit {
            return;
        }
    }
}
