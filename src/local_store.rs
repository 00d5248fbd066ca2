use std::cell::RefCell;
use std::collections::HashMap;

/// Per-browser key/value storage. Values are opaque bytes; debug overrides
/// are stored as UTF-8 text.
pub trait LocalStore {
    fn get_bytes(&self, key: &str) -> Option<Vec<u8>>;
    fn put_bytes(&self, key: &str, bytes: &[u8]);
    fn delete_key(&self, key: &str);

    fn get_text(&self, key: &str) -> Option<String> {
        self.get_bytes(key)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    fn put_text(&self, key: &str, value: &str) {
        self.put_bytes(key, value.as_bytes());
    }
}

#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }

    fn put_bytes(&self, key: &str, bytes: &[u8]) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
    }

    fn delete_key(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}
