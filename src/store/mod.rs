//! Coordination store capability interface.
//!
//! The lock protocol only needs a handful of operations from the store:
//! connect, create-if-absent, get, delete, stat and close. Any hierarchical,
//! linearizable namespace offering those can back fleetlock.
//!
//! # Backends
//!
//! - [`MemoryStore`]: shared in-process tree, used by tests and dry runs.
//!   Supports fault injection (unreachable quorum, failing close, failing create).
//! - [`DirectoryStore`]: every node is a directory on a (typically shared)
//!   filesystem. Node creation publishes a fully written staging directory with
//!   a single `rename`, so exactly one concurrent creator wins.

mod directory;
mod memory;


pub use directory::DirectoryStore;
pub use memory::MemoryStore;

use crate::client::Quorum;
use crate::error::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result codes a store operation can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreCode {
    /// The node (or, for `create`, its parent) does not exist.
    #[error("node does not exist")]
    NoNode,
    /// `create` targeted a path that is already present.
    #[error("node already exists")]
    NodeExists,
    /// `delete` targeted a node that still has children.
    #[error("node has children")]
    NotEmpty,
    /// The connection was closed or lost.
    #[error("connection lost")]
    ConnectionLoss,
    /// The path is malformed.
    #[error("bad arguments: {0}")]
    BadArguments(String),
    /// Anything else the backend reports.
    #[error("{0}")]
    Other(String),
}

/// Result type for a single store operation.
pub type StoreResult<T> = std::result::Result<T, StoreCode>;

/// Metadata returned by `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    /// Store-assigned creation time of the node.
    pub created_at: DateTime<Utc>,
}

/// One open connection to the store.
///
/// Connections are short-lived: fleetlock opens one per operation and closes
/// it before returning (see [`crate::client::CoordinationClient::run_scoped`]).
pub trait Connection {
    /// Whether the connection is usable.
    fn is_connected(&self) -> bool;

    /// Whether `close` has already been called.
    fn is_closed(&self) -> bool;

    /// Create `path` holding `data`. Fails with `NodeExists` if the path is
    /// taken and `NoNode` if its parent is missing.
    fn create(&mut self, path: &str, data: &[u8]) -> StoreResult<()>;

    /// Read the data of `path`.
    fn get(&mut self, path: &str) -> StoreResult<Vec<u8>>;

    /// Delete `path`. Fails with `NotEmpty` if it has children.
    fn delete(&mut self, path: &str) -> StoreResult<()>;

    /// Read the metadata of `path`.
    fn stat(&mut self, path: &str) -> StoreResult<NodeStat>;

    /// Close the connection.
    fn close(&mut self) -> StoreResult<()>;
}

/// Opens connections to a quorum.
pub trait Connector: Send + Sync {
    /// Connect to the quorum, failing with `LockError::Connection` when no
    /// member can be reached.
    fn connect(&self, quorum: &Quorum) -> Result<Box<dyn Connection>>;
}

/// Check that `path` is an absolute, normalized node path.
///
/// `/` is the root; every other path starts with `/`, has no trailing `/`,
/// no empty segments and no `.`/`..` segments.
pub fn validate_path(path: &str) -> StoreResult<()> {
    if !path.starts_with('/') {
        return Err(StoreCode::BadArguments(format!(
            "path '{}' must start with '/'",
            path
        )));
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(StoreCode::BadArguments(format!(
            "path '{}' must not end with '/'",
            path
        )));
    }
    for segment in path[1..].split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StoreCode::BadArguments(format!(
                "path '{}' has an invalid segment '{}'",
                path, segment
            )));
        }
    }
    Ok(())
}

/// Parent of a validated, non-root path (`/a/b` -> `/a`, `/a` -> `/`).
pub(crate) fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}
