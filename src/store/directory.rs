//! Shared-directory store backend.
//!
//! Layout under a quorum member directory:
//!
//! ```text
//! <root>/lock/               node "/lock"
//! <root>/lock/.data          raw node data
//! <root>/lock/.created       RFC3339 creation time
//! <root>/lock/svc/           node "/lock/svc"
//! ```
//!
//! Names starting with `.` are reserved for node metadata and staging
//! directories, so node segments may not start with `.`.

use super::{Connection, Connector, NodeStat, StoreCode, StoreResult, parent_path, validate_path};
use crate::client::Quorum;
use crate::error::{LockError, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DATA_FILE: &str = ".data";
const CREATED_FILE: &str = ".created";

/// Connector for the shared-directory backend.
///
/// Each quorum address is a directory path; the first one that exists and is
/// a directory is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryStore;

impl Connector for DirectoryStore {
    fn connect(&self, quorum: &Quorum) -> Result<Box<dyn Connection>> {
        let root = quorum
            .addresses()
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_dir())
            .ok_or_else(|| LockError::Connection {
                quorum: quorum.connect_string(),
                reason: "no quorum member is an accessible directory".to_string(),
            })?;

        tracing::debug!(root = %root.display(), "opened directory store connection");
        Ok(Box::new(DirectoryConnection {
            root,
            closed: false,
        }))
    }
}

struct DirectoryConnection {
    root: PathBuf,
    closed: bool,
}

impl DirectoryConnection {
    fn check(&self, path: &str) -> StoreResult<()> {
        if self.closed {
            return Err(StoreCode::ConnectionLoss);
        }
        validate_path(path)?;
        if path[1..].split('/').any(|s| s.starts_with('.')) {
            return Err(StoreCode::BadArguments(format!(
                "path '{}' has a segment starting with '.'",
                path
            )));
        }
        Ok(())
    }

    fn node_dir(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn is_node(&self, path: &str) -> bool {
        path == "/" || self.node_dir(path).join(DATA_FILE).is_file()
    }
}

/// Unique sibling name for staging and tombstone directories.
fn scratch_name(kind: &str, leaf: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(".{}-{}-{}-{}", kind, leaf, std::process::id(), nanos)
}

fn io_code(e: std::io::Error) -> StoreCode {
    match e.kind() {
        ErrorKind::NotFound => StoreCode::NoNode,
        _ => StoreCode::Other(e.to_string()),
    }
}

fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

impl Connection for DirectoryConnection {
    fn is_connected(&self) -> bool {
        !self.closed && self.root.is_dir()
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn create(&mut self, path: &str, data: &[u8]) -> StoreResult<()> {
        self.check(path)?;
        if path == "/" || self.is_node(path) {
            return Err(StoreCode::NodeExists);
        }
        let parent = parent_path(path);
        if !self.is_node(parent) {
            return Err(StoreCode::NoNode);
        }

        let target = self.node_dir(path);
        let leaf = path.rsplit('/').next().unwrap_or_default();
        let staging = self.node_dir(parent).join(scratch_name("stage", leaf));

        let staged = fs::create_dir(&staging)
            .and_then(|_| write_file(&staging.join(DATA_FILE), data))
            .and_then(|_| {
                write_file(
                    &staging.join(CREATED_FILE),
                    Utc::now().to_rfc3339().as_bytes(),
                )
            });
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(StoreCode::Other(format!(
                "failed to stage node {}: {}",
                path, e
            )));
        }

        // A non-empty target makes rename fail, so only one creator wins.
        match fs::rename(&staging, &target) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                if self.is_node(path) || target.exists() {
                    Err(StoreCode::NodeExists)
                } else {
                    Err(StoreCode::Other(format!(
                        "failed to publish node {}: {}",
                        path, e
                    )))
                }
            }
        }
    }

    fn get(&mut self, path: &str) -> StoreResult<Vec<u8>> {
        self.check(path)?;
        if path == "/" {
            return Ok(Vec::new());
        }
        fs::read(self.node_dir(path).join(DATA_FILE)).map_err(io_code)
    }

    fn delete(&mut self, path: &str) -> StoreResult<()> {
        self.check(path)?;
        if path == "/" {
            return Err(StoreCode::BadArguments("cannot delete the root".to_string()));
        }
        if !self.is_node(path) {
            return Err(StoreCode::NoNode);
        }

        let dir = self.node_dir(path);
        let entries = fs::read_dir(&dir).map_err(io_code)?;
        for entry in entries {
            let entry = entry.map_err(io_code)?;
            if !entry.file_name().to_string_lossy().starts_with('.') {
                return Err(StoreCode::NotEmpty);
            }
        }

        // Move the node out of the namespace in one step, then clean up.
        let leaf = path.rsplit('/').next().unwrap_or_default();
        let tombstone = self.node_dir(parent_path(path)).join(scratch_name("tomb", leaf));
        fs::rename(&dir, &tombstone).map_err(io_code)?;
        if let Err(e) = fs::remove_dir_all(&tombstone) {
            tracing::warn!(
                tombstone = %tombstone.display(),
                error = %e,
                "failed to remove deleted node directory"
            );
        }
        Ok(())
    }

    fn stat(&mut self, path: &str) -> StoreResult<NodeStat> {
        self.check(path)?;
        if path == "/" {
            let modified = fs::metadata(&self.root)
                .and_then(|m| m.modified())
                .map_err(io_code)?;
            return Ok(NodeStat {
                created_at: DateTime::<Utc>::from(modified),
            });
        }
        let raw = fs::read_to_string(self.node_dir(path).join(CREATED_FILE)).map_err(io_code)?;
        let created_at = DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|e| StoreCode::Other(format!("corrupt creation time for {}: {}", path, e)))?
            .with_timezone(&Utc);
        Ok(NodeStat { created_at })
    }

    fn close(&mut self) -> StoreResult<()> {
        self.closed = true;
        Ok(())
    }
}
