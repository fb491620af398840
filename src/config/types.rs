//! Configuration types and defaults for fleetlock.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which store backend the CLI connects through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Node tree on a shared filesystem; quorum entries are directories.
    #[default]
    Directory,
    /// Process-local tree, discarded when the process exits. Locks taken
    /// through it never exclude another invocation, so it is only fit for
    /// dry runs of the CLI and for embedding the library in tests.
    Memory,
}

impl StoreBackend {
    /// Parse a backend name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "directory" => Some(Self::Directory),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

// Default value functions for serde
pub(crate) fn default_lock_root() -> String {
    "/lock".to_string()
}
pub(crate) fn default_quorum() -> Vec<String> {
    vec!["/var/lib/fleetlock/store".to_string()]
}
pub(crate) fn default_acquire_timeout_secs() -> u64 {
    30
}
pub(crate) fn default_retry_interval_ms() -> u64 {
    2000
}
pub(crate) fn default_ledger_path() -> Option<PathBuf> {
    Some(PathBuf::from("/var/lib/fleetlock/ledger.json"))
}
