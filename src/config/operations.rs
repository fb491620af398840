//! Config loading, validation, and derived values.

use super::model::Config;
use crate::client::Quorum;
use crate::error::{LockError, Result};
use std::path::Path;
use std::time::Duration;

/// Config file read when none is given explicitly.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fleetlock/config.yaml";

impl Config {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load `path` if given, else the default config file if it exists,
    /// else built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => Self::load(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `quorum` must contain at least one non-blank address
    /// - `lock_root` must be an absolute path
    /// - `acquire_timeout_secs` and `retry_interval_ms` must be positive
    /// - `holder`, when set, must not be blank
    pub fn validate(&self) -> Result<()> {
        Quorum::new(self.quorum.iter().map(String::as_str))
            .map_err(|e| LockError::Config(format!("config validation failed: {}", e)))?;

        if !self.lock_root.starts_with('/') {
            return Err(LockError::Config(format!(
                "config validation failed: lock_root must start with '/' (found '{}')",
                self.lock_root
            )));
        }

        if self.acquire_timeout_secs == 0 {
            return Err(LockError::Config(
                "config validation failed: acquire_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry_interval_ms == 0 {
            return Err(LockError::Config(
                "config validation failed: retry_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.holder.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(LockError::Config(
                "config validation failed: holder must not be blank".to_string(),
            ));
        }

        if self.retry_interval() >= self.acquire_timeout() {
            tracing::warn!(
                retry_interval_ms = self.retry_interval_ms,
                acquire_timeout_secs = self.acquire_timeout_secs,
                "retry interval is not shorter than the acquire timeout; \
                 lock acquisition will try only once"
            );
        }

        Ok(())
    }

    /// The configured quorum.
    pub fn quorum(&self) -> Result<Quorum> {
        Quorum::new(self.quorum.iter().map(String::as_str))
    }

    /// Total time allowed for one acquisition.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Delay between acquisition tries.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// How long to hold the lock after a successful guarded action.
    pub fn release_delay(&self) -> Duration {
        Duration::from_secs(self.release_delay_secs)
    }

    /// Identity written into lock nodes: the configured holder, else the
    /// host name.
    pub fn holder_id(&self) -> String {
        if let Some(holder) = &self.holder {
            return holder.clone();
        }
        hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
