use nonogrid_core::WireError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("session `{0}` does not exist")]
    MissingSession(String),
    #[error("path `{path}` does not address a value: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("transaction on `{0}` was aborted by its update")]
    Aborted(String),
    #[error("transaction on `{path}` gave up after {attempts} attempts")]
    TooManyRetries { path: String, attempts: u32 },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Wire(#[from] WireError),
}
