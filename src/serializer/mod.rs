//! Orchestration adapter: runs a guarded action under a fleet-wide lock.
//!
//! [`Serializer::serialize`] acquires the lock, runs the action, then releases
//! the lock whether or not the action succeeded. [`Serializer::serialize_if_stale`]
//! additionally consults the rerun ledger and the process liveness probe to
//! skip the action when a restart it would have performed already happened.
//!
//! Release after the action is best effort: a release failure is logged at
//! warning level and never masks the action's own outcome.


use crate::client::CoordinationClient;
use crate::config::Config;
use crate::engine::{Acquisition, AcquisitionAttempt, LockEngine};
use crate::error::{LockError, Result};
use crate::ledger::FailureLedger;
use crate::paths;
use crate::probe::{self, ProcessQuery, ProcessSearch};
use crate::store::Connector;
use std::sync::Arc;
use std::thread;

/// Result of a serialized invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOutcome {
    /// Lock path the invocation was serialized on.
    pub lock_path: String,

    /// Whether the guarded action was run.
    pub ran: bool,
}

/// Lock engine, ledger and probe wired together from one [`Config`].
pub struct Serializer {
    config: Config,
    engine: LockEngine,
    search: Box<dyn ProcessSearch>,
    ledger: Box<dyn FailureLedger>,
}

impl Serializer {
    /// Build a serializer connecting through `connector` to the configured
    /// quorum.
    pub fn new(
        config: Config,
        connector: Arc<dyn Connector>,
        search: Box<dyn ProcessSearch>,
        ledger: Box<dyn FailureLedger>,
    ) -> Result<Self> {
        config.validate()?;
        let client = CoordinationClient::new(connector, config.quorum()?);
        Ok(Self {
            config,
            engine: LockEngine::new(client),
            search,
            ledger,
        })
    }

    /// The rerun ledger.
    pub fn ledger(&self) -> &dyn FailureLedger {
        self.ledger.as_ref()
    }

    /// The lock engine.
    pub fn engine(&self) -> &LockEngine {
        &self.engine
    }

    /// Lock path for `name` under the configured lock root.
    pub fn lock_path(&self, name: &str) -> Result<String> {
        if name.trim().is_empty() {
            return Err(LockError::InvalidArgument(
                "lock name must not be empty".to_string(),
            ));
        }
        Ok(paths::lock_path(&self.config.lock_root, name))
    }

    /// Run `action` while holding the lock `name` as `holder`.
    ///
    /// Fails with `LockAcquisitionFailed` (after recording the failure in the
    /// ledger) if the lock cannot be acquired in time; the action is not run
    /// in that case.
    pub fn serialize<F>(&mut self, name: &str, holder: &str, action: F) -> Result<SerializeOutcome>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        let lock_path = self.lock_path(name)?;
        if self.config.skip_coordination {
            return self.run_uncoordinated(lock_path, action);
        }

        self.acquire(&lock_path, holder)?;
        self.run_guarded(lock_path, holder, action)
    }

    /// Like [`serialize`](Self::serialize), but skips the action when the
    /// process tree matching `query` shows the work was already done:
    ///
    /// - a failure is on record for the lock and the process restarted after
    ///   it (someone restarted the service out of band), or
    /// - we found our own lock left behind and the process restarted after
    ///   that lock was created (our previous run got as far as the restart).
    ///
    /// A skipped action still clears the ledger record and releases a
    /// reclaimed lock.
    pub fn serialize_if_stale<F>(
        &mut self,
        name: &str,
        holder: &str,
        query: &ProcessQuery,
        action: F,
    ) -> Result<SerializeOutcome>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        let lock_path = self.lock_path(name)?;
        if self.config.skip_coordination {
            return self.run_uncoordinated(lock_path, action);
        }

        if let Some(failed_at) = self.ledger.peek_failure_time(&lock_path)
            && probe::restarted_since(self.search.as_ref(), query, failed_at)?
        {
            tracing::info!(
                path = %lock_path,
                failing_since = %failed_at.to_rfc3339(),
                "process restarted since the last failed acquisition; nothing to do"
            );
            self.ledger.clear(&lock_path)?;
            return Ok(SerializeOutcome {
                lock_path,
                ran: false,
            });
        }

        let acquisition = self.acquire(&lock_path, holder)?;
        if acquisition == Acquisition::Reclaimed {
            let already_done = match self.reclaimed_lock_is_stale(&lock_path, query) {
                Ok(done) => done,
                Err(err) => {
                    self.release_best_effort(&lock_path, holder);
                    return Err(err);
                }
            };
            if already_done {
                tracing::info!(
                    path = %lock_path,
                    holder,
                    "process restarted after our stale lock was taken; releasing without running"
                );
                self.release_best_effort(&lock_path, holder);
                self.ledger.clear(&lock_path)?;
                return Ok(SerializeOutcome {
                    lock_path,
                    ran: false,
                });
            }
        }

        self.run_guarded(lock_path, holder, action)
    }

    fn acquire(&mut self, lock_path: &str, holder: &str) -> Result<Acquisition> {
        let attempt = AcquisitionAttempt::new(
            lock_path,
            holder,
            self.config.acquire_timeout(),
            self.config.retry_interval(),
        );
        self.engine.acquire(&attempt, self.ledger.as_mut())
    }

    fn reclaimed_lock_is_stale(&self, lock_path: &str, query: &ProcessQuery) -> Result<bool> {
        let Some(created_at) = self.engine.node_created_at(lock_path)? else {
            return Ok(false);
        };
        probe::restarted_since(self.search.as_ref(), query, created_at)
    }

    fn run_uncoordinated<F>(&self, lock_path: String, action: F) -> Result<SerializeOutcome>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        tracing::warn!(
            path = %lock_path,
            "coordination skipped; running guarded action without a lock"
        );
        action().map_err(LockError::ActionFailed)?;
        Ok(SerializeOutcome {
            lock_path,
            ran: true,
        })
    }

    fn run_guarded<F>(
        &mut self,
        lock_path: String,
        holder: &str,
        action: F,
    ) -> Result<SerializeOutcome>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        tracing::info!(path = %lock_path, holder, "running guarded action");
        let outcome = action().map_err(LockError::ActionFailed);

        match &outcome {
            Ok(()) => {
                let delay = self.config.release_delay();
                if !delay.is_zero() {
                    tracing::info!(
                        path = %lock_path,
                        delay_secs = delay.as_secs(),
                        "holding lock for release delay"
                    );
                    thread::sleep(delay);
                }
            }
            Err(err) => tracing::error!(path = %lock_path, error = %err, "guarded action failed"),
        }

        self.release_best_effort(&lock_path, holder);
        outcome?;

        self.ledger.clear(&lock_path)?;
        Ok(SerializeOutcome {
            lock_path,
            ran: true,
        })
    }

    fn release_best_effort(&self, lock_path: &str, holder: &str) {
        if let Err(err) = self.engine.release_lock(lock_path, holder) {
            tracing::warn!(path = lock_path, holder, error = %err, "failed to release lock");
        }
    }
}
