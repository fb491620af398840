//! Error types for fleetlock.
//!
//! Uses thiserror for derive macros. Every variant maps to a process exit code
//! so the CLI can report failures without inspecting messages.

use crate::exit_codes;
use std::time::Duration;
use thiserror::Error;

/// Main error type for fleetlock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// Bad input detected before any store I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The coordination store could not be reached.
    #[error("unable to connect to coordination quorum {quorum}: {reason}")]
    Connection { quorum: String, reason: String },

    /// The store refused an operation the protocol depends on
    /// (e.g. creating an ancestor node).
    #[error("locking resource error: {0}")]
    LockingResource(String),

    /// Release attempted by a caller that does not hold the lock.
    #[error("lock {path} does not contain expected holder '{holder}'; not releasing the lock")]
    LockOwnership { path: String, holder: String },

    /// Deadline passed without acquiring the lock.
    #[error(
        "failed to acquire lock {path} for holder '{holder}' within {}s",
        timeout.as_secs_f64()
    )]
    LockAcquisitionFailed {
        path: String,
        holder: String,
        timeout: Duration,
    },

    /// The process search primitive itself failed.
    #[error("process probe failed: {0}")]
    Probe(String),

    /// Configuration could not be read, parsed or validated.
    #[error("{0}")]
    Config(String),

    /// The rerun ledger could not be loaded or persisted.
    #[error("rerun ledger error: {0}")]
    Ledger(String),

    /// The guarded action ran and returned an error.
    #[error("guarded action failed: {0:#}")]
    ActionFailed(#[source] anyhow::Error),
}

impl LockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::InvalidArgument(_) | LockError::Config(_) | LockError::Ledger(_) => {
                exit_codes::USER_ERROR
            }
            LockError::ActionFailed(_) => exit_codes::ACTION_FAILURE,
            LockError::Connection { .. } | LockError::LockingResource(_) => {
                exit_codes::STORE_FAILURE
            }
            LockError::LockOwnership { .. } | LockError::LockAcquisitionFailed { .. } => {
                exit_codes::LOCK_FAILURE
            }
            LockError::Probe(_) => exit_codes::PROBE_FAILURE,
        }
    }
}

/// Result type alias for fleetlock operations.
pub type Result<T> = std::result::Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_failure_names_path_and_holder() {
        let err = LockError::LockAcquisitionFailed {
            path: "/lock/svc".to_string(),
            holder: "hostA".to_string(),
            timeout: Duration::from_secs(5),
        };
        let msg = err.to_string();
        assert!(msg.contains("/lock/svc"));
        assert!(msg.contains("hostA"));
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    }

    #[test]
    fn ownership_error_has_lock_exit_code() {
        let err = LockError::LockOwnership {
            path: "/lock/svc".to_string(),
            holder: "hostA".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
        assert!(err.to_string().contains("not releasing"));
    }

    #[test]
    fn connection_error_has_store_exit_code() {
        let err = LockError::Connection {
            quorum: "zk1:2181".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
        assert!(err.to_string().contains("zk1:2181"));
    }

    #[test]
    fn action_failure_keeps_inner_message() {
        let err = LockError::ActionFailed(anyhow::anyhow!("restart exited with 3"));
        assert_eq!(err.exit_code(), exit_codes::ACTION_FAILURE);
        assert!(err.to_string().contains("restart exited with 3"));
    }

    #[test]
    fn user_errors_share_exit_code() {
        for err in [
            LockError::InvalidArgument("empty quorum".to_string()),
            LockError::Config("bad yaml".to_string()),
            LockError::Ledger("unreadable".to_string()),
        ] {
            assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        }
        assert_eq!(
            LockError::Probe("pgrep: bad regex".to_string()).exit_code(),
            exit_codes::PROBE_FAILURE
        );
    }
}
