use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellPos};
use crate::grid::Grid;

/// Axis a drag gesture latched onto. A gesture that never left its start
/// cell has no direction (`null` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragDirection {
    Vertical,
    Horizontal,
}

/// One undoable gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdateAction {
    pub original_cell_state: Cell,
    pub updated_cell_state: Cell,
    pub start_row: usize,
    pub start_col: usize,
    #[serde(default)]
    pub drag_direction: Option<DragDirection>,
    #[serde(default)]
    pub affected_cells: Vec<CellPos>,
}

impl CellUpdateAction {
    pub fn start(&self) -> CellPos {
        CellPos::new(self.start_row, self.start_col)
    }

    fn write_all(&self, grid: &mut Grid, cell: Cell) {
        for pos in &self.affected_cells {
            // Remote entries are not trusted to fit the board.
            if grid.contains(pos.row, pos.col) {
                let _ = grid.set(pos.row, pos.col, cell);
            }
        }
    }

    /// Restores every affected cell to the state it had before the gesture.
    pub fn revert(&self, grid: &mut Grid) {
        self.write_all(grid, self.original_cell_state);
    }

    pub fn replay(&self, grid: &mut Grid) {
        self.write_all(grid, self.updated_cell_state);
    }
}

/// Linear undo history. Entries at `applied..` are redoable until the next
/// append discards them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLog {
    entries: Vec<CellUpdateAction>,
    applied: usize,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from stored parts, clamping an out-of-range applied count.
    pub fn from_parts(entries: Vec<CellUpdateAction>, applied: usize) -> Self {
        let applied = applied.min(entries.len());
        Self { entries, applied }
    }

    pub fn entries(&self) -> &[CellUpdateAction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn applied_count(&self) -> usize {
        self.applied
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Records a finished gesture and drops the redo tail.
    ///
    /// A candidate equal to the latest applied entry is a duplicate delivery
    /// and is not recorded; the return value says whether it was.
    pub fn append(&mut self, action: CellUpdateAction) -> bool {
        if self.applied > 0 && self.entries[self.applied - 1] == action {
            return false;
        }
        self.entries.truncate(self.applied);
        self.entries.push(action);
        self.applied = self.entries.len();
        true
    }

    pub fn undo(&mut self, grid: &mut Grid) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.applied -= 1;
        self.entries[self.applied].revert(grid);
        true
    }

    pub fn redo(&mut self, grid: &mut Grid) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.entries[self.applied].replay(grid);
        self.applied += 1;
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }
}
