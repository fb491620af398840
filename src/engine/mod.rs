//! Lock protocol engine.
//!
//! A lock is a persistent node in the coordination store whose data names the
//! holder. Creating the node is the acquisition; the store's create-if-absent
//! semantics guarantee that only one concurrent creator succeeds.
//!
//! # Acquisition
//!
//! 1. If the node already holds our own identity (an earlier run of ours died
//!    holding it) the lock is considered acquired.
//! 2. Otherwise try to create the node, sleeping `retry_interval` between
//!    tries until the deadline passes.
//! 3. On timeout, record the failure in the rerun ledger and fail with
//!    `LockAcquisitionFailed`.
//!
//! # Release
//!
//! Release re-reads the node and deletes it only if it still holds our
//! identity. Nodes have no TTL, so a holder that dies without releasing leaves
//! the lock in place until it comes back (step 1 above) or an operator clears
//! it.

mod operations;
mod types;

#[cfg(test)]
mod tests;

pub use operations::LockEngine;
pub use types::{Acquisition, AcquisitionAttempt, LockInfo};
