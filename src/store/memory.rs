//! In-process store backend.

use super::{Connection, Connector, NodeStat, StoreCode, StoreResult, parent_path, validate_path};
use crate::client::Quorum;
use crate::error::{LockError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug, Clone)]
struct MemoryNode {
    data: Vec<u8>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: BTreeMap<String, MemoryNode>,
    /// Addresses that accept connections; `None` accepts any quorum.
    members: Option<BTreeSet<String>>,
    unreachable: bool,
    fail_close: bool,
    fail_create: BTreeSet<String>,
    created: Vec<String>,
    create_calls: Vec<(String, Instant)>,
    opened: usize,
    closed: usize,
}

/// Shared in-memory tree implementing the store capability.
///
/// Clones share the same tree, so a test can hold one handle while the
/// engine connects through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Empty store that accepts connections for any quorum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store that only accepts quorums naming one of `members`.
    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        store.lock().members = Some(members.into_iter().map(Into::into).collect());
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Refuse all connections while `unreachable` is set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make every `close` call fail while `fail` is set.
    pub fn set_fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Make `create` of exactly `path` fail with a backend error.
    pub fn fail_create_of(&self, path: &str) {
        self.lock().fail_create.insert(path.to_string());
    }

    /// Data of `path`, bypassing connections.
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().nodes.get(path).map(|n| n.data.clone())
    }

    /// Whether `path` exists.
    pub fn exists(&self, path: &str) -> bool {
        path == "/" || self.lock().nodes.contains_key(path)
    }

    /// Paths in the order they were successfully created.
    pub fn creation_log(&self) -> Vec<String> {
        self.lock().created.clone()
    }

    /// When `create` was called for `path`, successful or not.
    pub fn create_calls_of(&self, path: &str) -> Vec<Instant> {
        self.lock()
            .create_calls
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Number of connections opened and closed so far.
    pub fn connection_counts(&self) -> (usize, usize) {
        let state = self.lock();
        (state.opened, state.closed)
    }

    /// Overwrite the creation time of an existing node.
    pub fn set_created_at(&self, path: &str, created_at: DateTime<Utc>) {
        if let Some(node) = self.lock().nodes.get_mut(path) {
            node.created_at = created_at;
        }
    }
}

impl Connector for MemoryStore {
    fn connect(&self, quorum: &Quorum) -> Result<Box<dyn Connection>> {
        let mut state = self.lock();
        let reachable = !state.unreachable
            && state.members.as_ref().is_none_or(|members| {
                quorum.addresses().iter().any(|a| members.contains(a))
            });
        if !reachable {
            return Err(LockError::Connection {
                quorum: quorum.connect_string(),
                reason: "no quorum member accepted the connection".to_string(),
            });
        }
        state.opened += 1;
        drop(state);

        Ok(Box::new(MemoryConnection {
            store: self.clone(),
            closed: false,
        }))
    }
}

struct MemoryConnection {
    store: MemoryStore,
    closed: bool,
}

impl MemoryConnection {
    fn live(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        if self.closed {
            return Err(StoreCode::ConnectionLoss);
        }
        Ok(self.store.lock())
    }
}

impl Connection for MemoryConnection {
    fn is_connected(&self) -> bool {
        !self.closed
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn create(&mut self, path: &str, data: &[u8]) -> StoreResult<()> {
        validate_path(path)?;
        let mut state = self.live()?;
        state.create_calls.push((path.to_string(), Instant::now()));
        if state.fail_create.contains(path) {
            return Err(StoreCode::Other(format!("injected create failure for {}", path)));
        }
        if path == "/" || state.nodes.contains_key(path) {
            return Err(StoreCode::NodeExists);
        }
        let parent = parent_path(path);
        if parent != "/" && !state.nodes.contains_key(parent) {
            return Err(StoreCode::NoNode);
        }
        state.nodes.insert(
            path.to_string(),
            MemoryNode {
                data: data.to_vec(),
                created_at: Utc::now(),
            },
        );
        state.created.push(path.to_string());
        Ok(())
    }

    fn get(&mut self, path: &str) -> StoreResult<Vec<u8>> {
        validate_path(path)?;
        let state = self.live()?;
        if path == "/" {
            return Ok(Vec::new());
        }
        state
            .nodes
            .get(path)
            .map(|n| n.data.clone())
            .ok_or(StoreCode::NoNode)
    }

    fn delete(&mut self, path: &str) -> StoreResult<()> {
        validate_path(path)?;
        let mut state = self.live()?;
        if !state.nodes.contains_key(path) {
            return Err(StoreCode::NoNode);
        }
        let prefix = format!("{}/", path);
        if state.nodes.keys().any(|k| k.starts_with(&prefix)) {
            return Err(StoreCode::NotEmpty);
        }
        state.nodes.remove(path);
        Ok(())
    }

    fn stat(&mut self, path: &str) -> StoreResult<NodeStat> {
        validate_path(path)?;
        let state = self.live()?;
        state
            .nodes
            .get(path)
            .map(|n| NodeStat {
                created_at: n.created_at,
            })
            .ok_or(StoreCode::NoNode)
    }

    fn close(&mut self) -> StoreResult<()> {
        let mut state = self.store.lock();
        state.closed += 1;
        self.closed = true;
        if state.fail_close {
            return Err(StoreCode::Other("injected close failure".to_string()));
        }
        Ok(())
    }
}
