use std::collections::HashMap;

/// Per-key "at most once per interval" gate. Owned by whoever needs it, so two
/// sessions never share budgets.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    last_allowed: HashMap<&'static str, u64>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `now_ms` when `key` was last allowed at
    /// least `interval_ms` ago (or never).
    pub fn try_acquire(&mut self, key: &'static str, interval_ms: u64, now_ms: u64) -> bool {
        if let Some(last) = self.last_allowed.get(key) {
            if now_ms.saturating_sub(*last) < interval_ms {
                return false;
            }
        }
        self.last_allowed.insert(key, now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_allowed.clear();
    }
}
