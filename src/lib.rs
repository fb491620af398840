//! Fleetlock: serialize an action across a fleet through a coordination store.
//!
//! A lock is a persistent node in a hierarchical coordination store whose data
//! names the holder. [`serializer::Serializer`] wraps a guarded action with
//! acquire and release, and can skip the action when the process liveness
//! probe shows it already took effect. Failed acquisitions are remembered in
//! the rerun ledger so a later invocation can still catch up.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod ledger;
pub mod paths;
pub mod probe;
pub mod serializer;
pub mod store;
