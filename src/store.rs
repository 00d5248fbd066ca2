//! The shared session store: the authoritative copy of every collaborative
//! session, addressed by session id and `/`-separated paths.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use nonogrid_core::wire::sparsify;
use nonogrid_core::SessionId;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StoreError;

pub type SubscriptionId = u64;

/// Receives the whole session document after every change. `Value::Null`
/// means the session does not exist.
pub type SnapshotListener = Rc<dyn Fn(Value)>;

/// Transaction update: gets the current value at the path (if any) and
/// returns the replacement, or `None` to abort. May run more than once.
pub type TransactionUpdate<'a> = &'a dyn Fn(Option<Value>) -> Option<Value>;

pub trait SharedSessionStore {
    fn subscribe(&self, session: &SessionId, listener: SnapshotListener) -> SubscriptionId;
    fn unsubscribe(&self, subscription: SubscriptionId);
    /// Last-writer-wins write. `Value::Null` deletes.
    fn set(&self, session: &SessionId, path: &str, value: Value) -> Result<(), StoreError>;
    fn transaction(
        &self,
        session: &SessionId,
        path: &str,
        update: TransactionUpdate<'_>,
    ) -> Result<Value, StoreError>;
    fn read(&self, session: &SessionId) -> Option<Value>;
    /// Appends under a fresh key that sorts after every earlier one.
    fn push(&self, session: &SessionId, path: &str, value: Value) -> Result<String, StoreError>;

    fn exists(&self, session: &SessionId) -> bool {
        self.read(session).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Set,
    Transaction,
    Push,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub session: String,
    pub path: String,
    pub kind: WriteKind,
}

const DEFAULT_MAX_TRANSACTION_ATTEMPTS: u32 = 25;

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Value>,
    listeners: BTreeMap<SubscriptionId, (String, SnapshotListener)>,
    next_subscription: SubscriptionId,
    pending: VecDeque<(SubscriptionId, Value)>,
    push_seq: u64,
    writes: Vec<WriteRecord>,
    concurrent: VecDeque<(String, Value)>,
}

/// Single-process store with the same lossy encoding and notification
/// behavior as the hosted one. Notifications queue up until
/// [`InMemorySessionStore::deliver_pending`] runs, the way an event loop would
/// deliver them after the current callback returns.
pub struct InMemorySessionStore {
    inner: RefCell<Inner>,
    max_attempts: u32,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner::default()),
            max_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delivers queued notifications, including ones queued by listeners
    /// while this runs. Returns how many listeners were called.
    pub fn deliver_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.inner.borrow_mut().pending.pop_front();
            let Some((subscription, snapshot)) = next else {
                break;
            };
            let listener = self
                .inner
                .borrow()
                .listeners
                .get(&subscription)
                .map(|(_, listener)| listener.clone());
            if let Some(listener) = listener {
                listener(snapshot);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner.borrow_mut().writes.clear();
    }

    /// Makes the next transaction attempt lose a race: after its update runs,
    /// this write lands first and the transaction retries on the new value.
    /// Queued writes are consumed one per attempt.
    pub fn inject_concurrent_write(&self, path: &str, value: Value) {
        self.inner
            .borrow_mut()
            .concurrent
            .push_back((path.to_string(), value));
    }

    pub fn read_path(&self, session: &SessionId, path: &str) -> Option<Value> {
        let segments = split_path(path).ok()?;
        let inner = self.inner.borrow();
        let root = inner.sessions.get(session.as_str())?;
        read_at(root, &segments).cloned()
    }

    fn write(
        &self,
        session: &SessionId,
        path: &str,
        value: Value,
        kind: WriteKind,
    ) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut inner = self.inner.borrow_mut();
        let key = session.as_str().to_string();
        let mut root = inner.sessions.remove(&key).unwrap_or(Value::Null);
        write_at(&mut root, &segments, value);
        let snapshot = if sparsify(&mut root) {
            inner.sessions.insert(key.clone(), root.clone());
            root
        } else {
            Value::Null
        };
        inner.writes.push(WriteRecord {
            session: key.clone(),
            path: path.to_string(),
            kind,
        });
        let targets: Vec<SubscriptionId> = inner
            .listeners
            .iter()
            .filter(|(_, (listened, _))| *listened == key)
            .map(|(id, _)| *id)
            .collect();
        for id in targets {
            inner.pending.push_back((id, snapshot.clone()));
        }
        Ok(())
    }
}

impl SharedSessionStore for InMemorySessionStore {
    fn subscribe(&self, session: &SessionId, listener: SnapshotListener) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        inner.next_subscription += 1;
        let id = inner.next_subscription;
        let snapshot = inner
            .sessions
            .get(session.as_str())
            .cloned()
            .unwrap_or(Value::Null);
        inner
            .listeners
            .insert(id, (session.as_str().to_string(), listener));
        inner.pending.push_back((id, snapshot));
        debug!(session = %session, subscription = id, "subscribed");
        id
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        let mut inner = self.inner.borrow_mut();
        inner.listeners.remove(&subscription);
        inner.pending.retain(|(id, _)| *id != subscription);
    }

    fn set(&self, session: &SessionId, path: &str, value: Value) -> Result<(), StoreError> {
        self.write(session, path, value, WriteKind::Set)
    }

    fn transaction(
        &self,
        session: &SessionId,
        path: &str,
        update: TransactionUpdate<'_>,
    ) -> Result<Value, StoreError> {
        for attempt in 1..=self.max_attempts {
            let current = self.read_path(session, path);
            let Some(next) = update(current) else {
                return Err(StoreError::Aborted(path.to_string()));
            };
            let raced = self.inner.borrow_mut().concurrent.pop_front();
            if let Some((other_path, other_value)) = raced {
                debug!(path, attempt, "transaction lost a race, retrying");
                self.write(session, &other_path, other_value, WriteKind::Set)?;
                continue;
            }
            self.write(session, path, next.clone(), WriteKind::Transaction)?;
            return Ok(next);
        }
        warn!(path, attempts = self.max_attempts, "transaction retries exhausted");
        Err(StoreError::TooManyRetries {
            path: path.to_string(),
            attempts: self.max_attempts,
        })
    }

    fn read(&self, session: &SessionId) -> Option<Value> {
        self.inner.borrow().sessions.get(session.as_str()).cloned()
    }

    fn push(&self, session: &SessionId, path: &str, value: Value) -> Result<String, StoreError> {
        let key = {
            let mut inner = self.inner.borrow_mut();
            inner.push_seq += 1;
            format!("-{:016x}", inner.push_seq)
        };
        let full = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}/{key}")
        };
        self.write(session, &full, value, WriteKind::Push)?;
        Ok(key)
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "empty segment",
        });
    }
    Ok(segments)
}

fn read_at<'a>(node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(node);
    };
    let child = match node {
        Value::Object(map) => map.get(*head)?,
        Value::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    read_at(child, rest)
}

fn write_at(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if let Value::Array(items) = node {
        match head.parse::<usize>() {
            Ok(index) if index < items.len() => {
                write_at(&mut items[index], rest, value);
                return;
            }
            _ => {
                let keyed: Map<String, Value> = std::mem::take(items)
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), item))
                    .collect();
                *node = Value::Object(keyed);
            }
        }
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        write_at(child, rest, value);
    }
}
