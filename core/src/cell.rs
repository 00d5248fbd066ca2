use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum Cell {
    #[default]
    Blank,
    Filled,
    #[serde(rename = "crossedOut")]
    Crossed,
}

impl Cell {
    pub fn is_blank(self) -> bool {
        self == Cell::Blank
    }

    pub fn is_filled(self) -> bool {
        self == Cell::Filled
    }

    pub fn as_wire_str(self) -> &'static str {
        match self {
            Cell::Blank => "blank",
            Cell::Filled => "filled",
            Cell::Crossed => "crossedOut",
        }
    }
}

/// A `{row, col}` coordinate as it appears in action logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// One cell write produced by a gesture or a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWrite {
    pub pos: CellPos,
    pub cell: Cell,
}
