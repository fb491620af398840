//! Configuration model for fleetlock.
//!
//! This module defines the `Config` struct read from a YAML file (by default
//! `/etc/fleetlock/config.yaml`). Unknown fields are ignored for forward
//! compatibility, every field has a default, and values are validated after
//! parsing.

mod model;
mod operations;
pub mod types;


pub use model::Config;
pub use operations::DEFAULT_CONFIG_PATH;
pub use types::StoreBackend;
