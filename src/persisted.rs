use nonogrid_core::Versioned;

pub(crate) const IDENTITY_VERSION: u32 = 1;
pub(crate) const COMPLETION_VERSION: u32 = 1;

pub(crate) const IDENTITY_KEY: &str = "identity.v1";
pub(crate) const COMPLETION_KEY_PREFIX: &str = "completion.v1.";

pub(crate) fn completion_key(board_id: &str) -> String {
    format!("{COMPLETION_KEY_PREFIX}{board_id}")
}

/// How far the local player got on one puzzle, shown on the puzzle list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[repr(u8)]
pub enum CompletionStatus {
    #[default]
    NotStarted,
    InProgress,
    Solved,
}

impl CompletionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::NotStarted => "notStarted",
            CompletionStatus::InProgress => "inProgress",
            CompletionStatus::Solved => "solved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub(crate) struct IdentityRecord {
    pub(crate) version: u32,
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) color: String,
}

impl Versioned for IdentityRecord {
    const VERSION: u32 = IDENTITY_VERSION;

    fn version(&self) -> u32 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub(crate) struct CompletionRecord {
    pub(crate) version: u32,
    pub(crate) status: CompletionStatus,
    pub(crate) updated_at: u64,
}

impl Versioned for CompletionRecord {
    const VERSION: u32 = COMPLETION_VERSION;

    fn version(&self) -> u32 {
        self.version
    }
}
