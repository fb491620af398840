//! Acquisition attempt and lock information types.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::time::{Duration, Instant};

/// One invocation of the acquisition loop.
#[derive(Debug, Clone)]
pub struct AcquisitionAttempt {
    /// Lock path to create.
    pub path: String,

    /// Data written into the lock node.
    pub holder: String,

    /// Total time allowed for the attempt.
    pub timeout: Duration,

    /// Delay between retries. Should be smaller than `timeout` for the loop
    /// to retry at all.
    pub retry_interval: Duration,

    /// Absolute deadline (start + timeout).
    pub deadline: Instant,
}

impl AcquisitionAttempt {
    /// Start a new attempt now.
    pub fn new(
        path: impl Into<String>,
        holder: impl Into<String>,
        timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            holder: holder.into(),
            timeout,
            retry_interval,
            deadline: Instant::now() + timeout,
        }
    }

    /// Time left before the deadline (zero once it has passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// How an attempt obtained the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// We created the lock node, after `tries` create calls.
    Fresh { tries: u32 },
    /// A lock node holding our own identity already existed, e.g. left
    /// behind by an earlier run of ours that died before releasing.
    Reclaimed,
}

/// Snapshot of a lock node, for display.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock path.
    pub path: String,

    /// Holder data, lossily decoded as UTF-8.
    pub holder: String,

    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
}

impl LockInfo {
    /// How long the lock has existed.
    pub fn age(&self) -> ChronoDuration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", age.num_seconds().max(0))
        }
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (holder: {}, age: {}, created: {})",
            self.path,
            self.holder,
            self.age_string(),
            self.created_at.to_rfc3339()
        )
    }
}
