//! Rerun ledger: failed lock acquisitions keyed by lock path.
//!
//! A single invocation timing out on a lock must not be final. The ledger
//! remembers *since when* a path has been failing so a later invocation can
//! decide whether the guarded action still has to run (see
//! [`crate::serializer::Serializer::serialize_if_stale`]).
//!
//! # Persistence
//!
//! [`RerunLedger::open`] backs the ledger with a JSON file that is rewritten
//! atomically after every mutation:
//!
//! ```json
//! {
//!   "failed_locks": {
//!     "/lock/svc": { "last_failure_time": "2026-10-19T10:00:00Z", "failure_count": 2 }
//!   }
//! }
//! ```


use crate::error::{LockError, Result};
use crate::fs::atomic_write;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Failure record for one lock path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerunRecord {
    /// Time of the first failure in the current run of failures.
    pub last_failure_time: DateTime<Utc>,

    /// Number of consecutive failures; at least 1.
    pub failure_count: u32,
}

/// Storage for rerun records, injected into the engine and the serializer.
pub trait FailureLedger {
    /// Record a failed acquisition of `path`.
    ///
    /// The first failure stores the current time with a count of 1; later
    /// failures increment the count and keep the original time.
    fn record_failure(&mut self, path: &str) -> Result<RerunRecord>;

    /// The record for `path`, if any.
    fn get(&self, path: &str) -> Option<RerunRecord>;

    /// Time of the first recorded failure for `path`, if any.
    fn peek_failure_time(&self, path: &str) -> Option<DateTime<Utc>> {
        self.get(path).map(|r| r.last_failure_time)
    }

    /// Remove any record for `path`. Removing a missing record is not an error.
    fn clear(&mut self, path: &str) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    failed_locks: BTreeMap<String, RerunRecord>,
}

/// Map-backed ledger, optionally persisted to a JSON file.
#[derive(Debug, Default)]
pub struct RerunLedger {
    records: BTreeMap<String, RerunRecord>,
    file: Option<PathBuf>,
}

impl RerunLedger {
    /// Ledger that lives only as long as this process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the ledger persisted at `path`; a missing file is an empty ledger.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let records = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                let file: LedgerFile = serde_json::from_str(&content).map_err(|e| {
                    LockError::Ledger(format!(
                        "failed to parse ledger file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                file.failed_locks
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(LockError::Ledger(format!(
                    "failed to read ledger file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self {
            records,
            file: Some(path.to_path_buf()),
        })
    }

    /// All records, ordered by lock path.
    pub fn records(&self) -> impl Iterator<Item = (&str, &RerunRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let file = LedgerFile {
            failed_locks: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| LockError::Ledger(format!("failed to serialize ledger: {}", e)))?;
        atomic_write(path, json.as_bytes()).map_err(|e| {
            LockError::Ledger(format!(
                "failed to write ledger file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

impl FailureLedger for RerunLedger {
    fn record_failure(&mut self, path: &str) -> Result<RerunRecord> {
        let record = self
            .records
            .entry(path.to_string())
            .and_modify(|r| r.failure_count = r.failure_count.saturating_add(1))
            .or_insert_with(|| RerunRecord {
                last_failure_time: Utc::now(),
                failure_count: 1,
            });
        let record = *record;
        self.save()?;
        Ok(record)
    }

    fn get(&self, path: &str) -> Option<RerunRecord> {
        self.records.get(path).copied()
    }

    fn clear(&mut self, path: &str) -> Result<()> {
        if self.records.remove(path).is_some() {
            self.save()?;
        }
        Ok(())
    }
}
