//! Process liveness probe.
//!
//! Answers "since when has the process tree of this service been up?" by
//! taking the earliest start time of all processes matching a pattern. The
//! serializer compares that time against lock creation and ledger failure
//! times to decide whether a previous guarded action already took effect.
//!
//! Searching the process table is an injected capability ([`ProcessSearch`]);
//! [`PgrepSearch`] implements it with `pgrep(1)` and `ps(1)`.

mod pgrep;

#[cfg(test)]
mod tests;

pub use pgrep::{MAX_NAME_PATTERN_LEN, PgrepSearch};

use crate::error::Result;
use chrono::{DateTime, Utc};

/// What to search the process table for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessQuery {
    /// Pattern handed to the search primitive.
    pub pattern: String,

    /// Match against the full command line (the default) instead of the
    /// process name.
    pub full_command_line: bool,

    /// Only consider processes of this user (name or uid).
    pub user: Option<String>,
}

impl ProcessQuery {
    /// Query matching `pattern` against full command lines of any user.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            full_command_line: true,
            user: None,
        }
    }

    /// Match against the full command line, or only the process name.
    pub fn full_command_line(mut self, full: bool) -> Self {
        self.full_command_line = full;
        self
    }

    /// Restrict to processes owned by `user`.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// A process found by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMatch {
    /// Process id.
    pub pid: u32,

    /// When the process started.
    pub started_at: DateTime<Utc>,
}

/// Searches the process table.
///
/// "Nothing matched" is an empty list; `Err(LockError::Probe)` is reserved
/// for failures of the search primitive itself.
pub trait ProcessSearch {
    /// All processes matching `query`.
    fn search(&self, query: &ProcessQuery) -> Result<Vec<ProcessMatch>>;
}

/// Earliest start time among processes matching `query`, or `None`.
pub fn probe_start_time(
    search: &dyn ProcessSearch,
    query: &ProcessQuery,
) -> Result<Option<DateTime<Utc>>> {
    let matches = search.search(query)?;
    let earliest = matches.iter().map(|m| m.started_at).min();
    tracing::debug!(
        pattern = %query.pattern,
        matches = matches.len(),
        earliest = ?earliest,
        "probed process start time"
    );
    Ok(earliest)
}

/// Whether a matching process tree started strictly after `since`.
///
/// Times are compared at whole-second granularity; process start times are
/// not reported any finer. No matching process means `false`.
pub fn restarted_since(
    search: &dyn ProcessSearch,
    query: &ProcessQuery,
    since: DateTime<Utc>,
) -> Result<bool> {
    let Some(started_at) = probe_start_time(search, query)? else {
        return Ok(false);
    };

    let restarted = started_at.timestamp() > since.timestamp();
    if restarted {
        tracing::info!(
            pattern = %query.pattern,
            started_at = %started_at.to_rfc3339(),
            since = %since.to_rfc3339(),
            "process appears to have started after reference time"
        );
    }
    Ok(restarted)
}
