use crate::persisted_store::PersistedStore;

const INACTIVITY_TIMEOUT_KEY: &str = "nonogrid.debug.inactivity_timeout_ms";
const CURSOR_INTERVAL_KEY: &str = "nonogrid.debug.cursor_interval_ms";
const ACTIVITY_INTERVAL_KEY: &str = "nonogrid.debug.activity_interval_ms";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Participants idle for longer than this are hidden.
    pub inactivity_timeout_ms: u64,
    /// Minimum spacing between cursor broadcasts.
    pub cursor_interval_ms: u64,
    /// Minimum spacing between `lastActiveTime` touches.
    pub activity_interval_ms: u64,
    /// Also delete hidden participants from the shared store.
    pub prune_inactive_remote: bool,
    pub cursor_decimals: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: 30 * 60 * 1000,
            cursor_interval_ms: 20,
            activity_interval_ms: 1000,
            prune_inactive_remote: false,
            cursor_decimals: 3,
        }
    }
}

impl SessionConfig {
    /// Applies `nonogrid.debug.*` overrides found in local storage.
    pub fn with_debug_overrides(mut self, store: &PersistedStore) -> Self {
        if let Some(value) = store.debug_override(INACTIVITY_TIMEOUT_KEY) {
            self.inactivity_timeout_ms = value;
        }
        if let Some(value) = store.debug_override(CURSOR_INTERVAL_KEY) {
            self.cursor_interval_ms = value;
        }
        if let Some(value) = store.debug_override(ACTIVITY_INTERVAL_KEY) {
            self.activity_interval_ms = value;
        }
        self
    }
}
