//! Drag painting: one pointer gesture becomes one [`CellUpdateAction`].
//!
//! The controller never touches the grid. It returns the writes a gesture
//! produces and expects the caller to apply them before the next event, so
//! that later moves see the cells the gesture already painted.

use crate::action::{CellUpdateAction, DragDirection};
use crate::cell::{Cell, CellPos, CellWrite};
use crate::grid::{Grid, SolutionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

impl PointerButton {
    /// DOM `MouseEvent.button` numbering.
    pub fn from_dom(button: i16) -> Self {
        match button {
            0 => PointerButton::Primary,
            2 => PointerButton::Secondary,
            _ => PointerButton::Other,
        }
    }

    /// State a press of this button writes onto a cell currently at `from`.
    pub fn target(self, from: Cell) -> Option<Cell> {
        match (self, from) {
            (PointerButton::Primary, Cell::Filled) => Some(Cell::Blank),
            (PointerButton::Primary, _) => Some(Cell::Filled),
            (PointerButton::Secondary, Cell::Crossed) => Some(Cell::Blank),
            (PointerButton::Secondary, _) => Some(Cell::Crossed),
            (PointerButton::Other, _) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaintController {
    active: Option<CellUpdateAction>,
}

impl PaintController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current(&self) -> Option<&CellUpdateAction> {
        self.active.as_ref()
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn begin(
        &mut self,
        grid: &Grid,
        status: &SolutionStatus,
        row: usize,
        col: usize,
        button: PointerButton,
    ) -> Option<CellWrite> {
        self.active = None;
        let original = grid.get(row, col)?;
        let updated = button.target(original)?;
        if status.is_solved {
            return None;
        }
        if status.is_not_complete_because_has_mistakes && updated == Cell::Filled {
            return None;
        }
        let pos = CellPos::new(row, col);
        self.active = Some(CellUpdateAction {
            original_cell_state: original,
            updated_cell_state: updated,
            start_row: row,
            start_col: col,
            drag_direction: None,
            affected_cells: vec![pos],
        });
        Some(CellWrite { pos, cell: updated })
    }

    pub fn extend(&mut self, grid: &Grid, row: usize, col: usize) -> Vec<CellWrite> {
        let Some(action) = self.active.as_mut() else {
            return Vec::new();
        };
        if grid.rows() == 0 || grid.cols() == 0 {
            return Vec::new();
        }
        let start = action.start();
        let direction = match action.drag_direction {
            Some(direction) => direction,
            None if (row, col) == (start.row, start.col) => return Vec::new(),
            None if row != start.row => DragDirection::Vertical,
            None => DragDirection::Horizontal,
        };
        action.drag_direction = Some(direction);

        let (row, col) = match direction {
            DragDirection::Vertical => (row.min(grid.rows() - 1), start.col),
            DragDirection::Horizontal => (start.row, col.min(grid.cols() - 1)),
        };
        let span: Vec<CellPos> = match direction {
            DragDirection::Vertical => (start.row.min(row)..=start.row.max(row))
                .map(|r| CellPos::new(r, col))
                .collect(),
            DragDirection::Horizontal => (start.col.min(col)..=start.col.max(col))
                .map(|c| CellPos::new(row, c))
                .collect(),
        };

        let mut writes = Vec::new();
        for pos in span {
            if grid.get(pos.row, pos.col) != Some(action.original_cell_state) {
                continue;
            }
            // A cell reverted mid-drag is painted again but recorded once.
            if !action.affected_cells.contains(&pos) {
                action.affected_cells.push(pos);
            }
            writes.push(CellWrite {
                pos,
                cell: action.updated_cell_state,
            });
        }
        writes
    }

    pub fn finish(&mut self) -> Option<CellUpdateAction> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(grid: &mut Grid, writes: &[CellWrite]) {
        for write in writes {
            grid.set(write.pos.row, write.pos.col, write.cell).unwrap();
        }
    }

    #[test]
    fn primary_on_crossed_cell_fills_it() {
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, Cell::Crossed).unwrap();
        let mut paint = PaintController::new();
        let write = paint
            .begin(&grid, &SolutionStatus::default(), 1, 1, PointerButton::Primary)
            .unwrap();
        assert_eq!(write.cell, Cell::Filled);
    }

    #[test]
    fn other_buttons_clear_the_gesture() {
        let grid = Grid::new(2, 2);
        let mut paint = PaintController::new();
        let status = SolutionStatus::default();
        paint.begin(&grid, &status, 0, 0, PointerButton::Primary).unwrap();
        assert!(paint.begin(&grid, &status, 0, 0, PointerButton::from_dom(1)).is_none());
        assert!(paint.finish().is_none());
    }

    #[test]
    fn solved_board_ignores_gestures() {
        let grid = Grid::new(2, 2);
        let status = SolutionStatus {
            is_solved: true,
            ..SolutionStatus::default()
        };
        let mut paint = PaintController::new();
        assert!(paint.begin(&grid, &status, 0, 0, PointerButton::Secondary).is_none());
        assert!(!paint.is_active());
    }

    #[test]
    fn mistakes_block_filling_but_not_crossing() {
        let grid = Grid::new(2, 2);
        let status = SolutionStatus {
            is_not_complete_because_has_mistakes: true,
            ..SolutionStatus::default()
        };
        let mut paint = PaintController::new();
        assert!(paint.begin(&grid, &status, 0, 0, PointerButton::Primary).is_none());
        assert!(paint.begin(&grid, &status, 0, 0, PointerButton::Secondary).is_some());
    }

    #[test]
    fn drag_only_repaints_cells_matching_the_start_state() {
        let mut grid = Grid::new(1, 5);
        grid.set(0, 2, Cell::Crossed).unwrap();
        let mut paint = PaintController::new();
        let first = paint
            .begin(&grid, &SolutionStatus::default(), 0, 0, PointerButton::Primary)
            .unwrap();
        apply(&mut grid, &[first]);
        let writes = paint.extend(&grid, 0, 4);
        apply(&mut grid, &writes);
        let action = paint.finish().unwrap();
        assert_eq!(action.drag_direction, Some(DragDirection::Horizontal));
        assert_eq!(
            action.affected_cells,
            vec![
                CellPos::new(0, 0),
                CellPos::new(0, 1),
                CellPos::new(0, 3),
                CellPos::new(0, 4)
            ]
        );
        assert_eq!(grid.get(0, 2), Some(Cell::Crossed));
    }
}
