use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use nonogrid_core::{decode_current, encode};
use tracing::debug;

use crate::local_store::LocalStore;
use crate::persisted::{
    completion_key, CompletionRecord, CompletionStatus, IdentityRecord, COMPLETION_VERSION,
    IDENTITY_KEY, IDENTITY_VERSION,
};

/// Typed, cached access to the records kept in a [`LocalStore`].
#[derive(Clone)]
pub struct PersistedStore {
    backend: Rc<dyn LocalStore>,
    identity_cache: Rc<RefCell<Option<IdentityRecord>>>,
    completion_cache: Rc<RefCell<HashMap<String, CompletionStatus>>>,
}

impl PersistedStore {
    pub fn new(backend: Rc<dyn LocalStore>) -> Self {
        Self {
            backend,
            identity_cache: Rc::new(RefCell::new(None)),
            completion_cache: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn backend(&self) -> &dyn LocalStore {
        self.backend.as_ref()
    }

    pub(crate) fn identity(&self) -> Option<IdentityRecord> {
        if let Some(record) = self.identity_cache.borrow().clone() {
            return Some(record);
        }
        let bytes = self.backend.get_bytes(IDENTITY_KEY)?;
        let record = decode_current::<IdentityRecord>(&bytes)?;
        *self.identity_cache.borrow_mut() = Some(record.clone());
        Some(record)
    }

    pub(crate) fn save_identity(&self, id: &str, name: &str, color: &str) {
        let record = IdentityRecord {
            version: IDENTITY_VERSION,
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        };
        let Some(bytes) = encode(&record) else {
            return;
        };
        self.backend.put_bytes(IDENTITY_KEY, &bytes);
        *self.identity_cache.borrow_mut() = Some(record);
    }

    pub fn completion(&self, board_id: &str) -> CompletionStatus {
        if let Some(status) = self.completion_cache.borrow().get(board_id) {
            return *status;
        }
        let status = self
            .backend
            .get_bytes(&completion_key(board_id))
            .and_then(|bytes| decode_current::<CompletionRecord>(&bytes))
            .map(|record| record.status)
            .unwrap_or_default();
        self.completion_cache
            .borrow_mut()
            .insert(board_id.to_string(), status);
        status
    }

    /// Writes only when the status changed. Returns whether it did.
    pub fn set_completion(&self, board_id: &str, status: CompletionStatus, now_ms: u64) -> bool {
        if self.completion(board_id) == status {
            return false;
        }
        let record = CompletionRecord {
            version: COMPLETION_VERSION,
            status,
            updated_at: now_ms,
        };
        let Some(bytes) = encode(&record) else {
            return false;
        };
        self.backend.put_bytes(&completion_key(board_id), &bytes);
        self.completion_cache
            .borrow_mut()
            .insert(board_id.to_string(), status);
        debug!(board_id, status = status.as_str(), "saved completion status");
        true
    }

    /// Numeric debug override stored as text. Blank or unparsable values
    /// count as unset.
    pub fn debug_override(&self, key: &str) -> Option<u64> {
        let raw = self.backend.get_text(key)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::MemoryLocalStore;

    #[test]
    fn completion_survives_a_fresh_cache() {
        let backend = Rc::new(MemoryLocalStore::new());
        let store = PersistedStore::new(backend.clone());
        assert_eq!(store.completion("b1"), CompletionStatus::NotStarted);
        assert!(store.set_completion("b1", CompletionStatus::Solved, 5));
        assert!(!store.set_completion("b1", CompletionStatus::Solved, 6));

        let reopened = PersistedStore::new(backend);
        assert_eq!(reopened.completion("b1"), CompletionStatus::Solved);
    }

    #[test]
    fn debug_overrides_ignore_junk() {
        let backend = Rc::new(MemoryLocalStore::new());
        backend.put_text("a", " 250 ");
        backend.put_text("b", "");
        backend.put_text("c", "soon");
        let store = PersistedStore::new(backend);
        assert_eq!(store.debug_override("a"), Some(250));
        assert_eq!(store.debug_override("b"), None);
        assert_eq!(store.debug_override("c"), None);
        assert_eq!(store.debug_override("missing"), None);
    }
}
