//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for fleetlock.
///
/// Static settings only; runtime state such as failed acquisitions lives in
/// the rerun ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Store settings
    // =========================================================================
    /// Store backend used by the CLI.
    #[serde(default)]
    pub store: StoreBackend,

    /// Quorum member addresses, passed verbatim to the store's connect.
    #[serde(default = "default_quorum")]
    pub quorum: Vec<String>,

    /// Parent path of every lock node (default: "/lock").
    #[serde(default = "default_lock_root")]
    pub lock_root: String,

    // =========================================================================
    // Acquisition settings
    // =========================================================================
    /// Seconds to keep retrying before giving up on a lock.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Milliseconds to sleep between acquisition tries.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Seconds to keep holding the lock after the guarded action succeeded.
    #[serde(default)]
    pub release_delay_secs: u64,

    /// Run guarded actions without any coordination (e.g. when the quorum is
    /// down or the host is not part of a coordinated fleet).
    #[serde(default)]
    pub skip_coordination: bool,

    /// Identity written into lock nodes. Defaults to the host name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,

    // =========================================================================
    // Rerun ledger settings
    // =========================================================================
    /// JSON file persisting failed acquisitions across invocations
    /// (default: /var/lib/fleetlock/ledger.json). Set to `null` to keep the
    /// ledger for one process only.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreBackend::default(),
            quorum: default_quorum(),
            lock_root: default_lock_root(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            retry_interval_ms: default_retry_interval_ms(),
            release_delay_secs: 0,
            skip_coordination: false,
            holder: None,
            ledger_path: default_ledger_path(),
        }
    }
}
