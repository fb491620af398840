//! Lock acquisition, inspection and release.

use super::types::{Acquisition, AcquisitionAttempt, LockInfo};
use crate::client::CoordinationClient;
use crate::error::{LockError, Result};
use crate::ledger::FailureLedger;
use crate::paths;
use crate::store::StoreCode;
use chrono::{DateTime, Utc};
use std::thread;

/// The lock protocol, run through a [`CoordinationClient`].
#[derive(Debug, Clone)]
pub struct LockEngine {
    client: CoordinationClient,
}

impl LockEngine {
    /// Create an engine talking to the store through `client`.
    pub fn new(client: CoordinationClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &CoordinationClient {
        &self.client
    }

    /// Whether the lock node at `path` exists and holds exactly `holder`.
    ///
    /// A missing node is `Ok(false)`, not an error.
    pub fn lock_matches(&self, path: &str, holder: &str) -> Result<bool> {
        let data = paths::get_node_data(&self.client, path)?;
        Ok(data.as_deref() == Some(holder.as_bytes()))
    }

    /// Try once to create the lock node at `path` holding `holder`,
    /// creating missing ancestors.
    pub fn create_node(&self, path: &str, holder: &str) -> Result<bool> {
        paths::ensure_node_exists(&self.client, path, holder.as_bytes())
    }

    /// Creation time of the node at `path`, or `None` if it does not exist.
    pub fn node_created_at(&self, path: &str) -> Result<Option<DateTime<Utc>>> {
        self.client.run_scoped(|conn| match conn.stat(path) {
            Ok(stat) => Ok(Some(stat.created_at)),
            Err(StoreCode::NoNode) => Ok(None),
            Err(code) => Err(self.client.store_error("stat", path, code)),
        })
    }

    /// Holder and creation time of the lock at `path`, if held.
    pub fn lock_info(&self, path: &str) -> Result<Option<LockInfo>> {
        self.client.run_scoped(|conn| {
            let data = match conn.get(path) {
                Ok(data) => data,
                Err(StoreCode::NoNode) => return Ok(None),
                Err(code) => return Err(self.client.store_error("get", path, code)),
            };
            let created_at = match conn.stat(path) {
                Ok(stat) => stat.created_at,
                // Released between the two calls.
                Err(StoreCode::NoNode) => return Ok(None),
                Err(code) => return Err(self.client.store_error("stat", path, code)),
            };
            Ok(Some(LockInfo {
                path: path.to_string(),
                holder: String::from_utf8_lossy(&data).into_owned(),
                created_at,
            }))
        })
    }

    /// Release the lock at `path` if it is held by `holder`.
    ///
    /// Returns whether the delete succeeded. A lock held by someone else (or
    /// not held at all) is never deleted; that case fails with
    /// `LockError::LockOwnership`.
    pub fn release_lock(&self, path: &str, holder: &str) -> Result<bool> {
        if !self.lock_matches(path, holder)? {
            return Err(LockError::LockOwnership {
                path: path.to_string(),
                holder: holder.to_string(),
            });
        }

        self.client.run_scoped(|conn| match conn.delete(path) {
            Ok(()) => {
                tracing::info!(path, holder, "released lock");
                Ok(true)
            }
            Err(StoreCode::NoNode) => {
                tracing::warn!(path, holder, "lock vanished before it could be released");
                Ok(false)
            }
            Err(code) => Err(self.client.store_error("delete", path, code)),
        })
    }

    /// Run the acquisition loop for `attempt`.
    ///
    /// A pre-existing lock holding our own identity counts as acquired.
    /// Otherwise the node is created, retrying every `retry_interval` until
    /// the deadline; no try starts after the deadline. On timeout the failure
    /// is recorded in `ledger` and `LockError::LockAcquisitionFailed` is
    /// returned (a ledger write failure is logged, not returned). Connection
    /// failures are not retried here.
    pub fn acquire(
        &self,
        attempt: &AcquisitionAttempt,
        ledger: &mut dyn FailureLedger,
    ) -> Result<Acquisition> {
        let path = attempt.path.as_str();
        let holder = attempt.holder.as_str();
        tracing::info!(path, holder, "acquiring lock");

        if self.lock_matches(path, holder)? {
            tracing::info!(path, holder, "found pre-existing lock matching our identity");
            return Ok(Acquisition::Reclaimed);
        }

        let mut tries = 0u32;
        loop {
            // No create may start once the deadline has passed.
            if tries > 0 && attempt.remaining().is_zero() {
                break;
            }
            tries += 1;
            if self.create_node(path, holder)? {
                tracing::info!(path, holder, tries, "acquired new lock");
                return Ok(Acquisition::Fresh { tries });
            }

            let remaining = attempt.remaining();
            if remaining.is_zero() {
                break;
            }
            let pause = attempt.retry_interval.min(remaining);
            tracing::debug!(
                path,
                tries,
                pause_ms = pause.as_millis() as u64,
                "lock held elsewhere; retrying"
            );
            thread::sleep(pause);
        }

        // The timeout is reported even if the ledger cannot be updated.
        match ledger.record_failure(path) {
            Ok(record) => tracing::warn!(
                path,
                holder,
                tries,
                failure_count = record.failure_count,
                failing_since = %record.last_failure_time.to_rfc3339(),
                "timed out acquiring lock"
            ),
            Err(err) => tracing::error!(
                path,
                holder,
                tries,
                error = %err,
                "timed out acquiring lock; failed to record the failure in the rerun ledger"
            ),
        }
        Err(LockError::LockAcquisitionFailed {
            path: path.to_string(),
            holder: holder.to_string(),
            timeout: attempt.timeout,
        })
    }
}
