//! Scoped-connection client for the coordination store.
//!
//! Every coordination operation runs against a fresh connection that is closed
//! before the operation's result is returned. Connections are never held
//! across retry sleeps, so an interrupted process cannot leave a long-lived,
//! possibly stuck session behind.

use crate::error::{LockError, Result};
use crate::store::{Connection, Connector, StoreCode};
use std::fmt;
use std::sync::Arc;

/// Non-empty list of coordination store addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quorum {
    addresses: Vec<String>,
}

impl Quorum {
    /// Build a quorum from a list of addresses.
    ///
    /// Fails with `InvalidArgument` if the list is empty or contains a blank
    /// address.
    pub fn new<I, S>(addresses: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let addresses: Vec<String> = addresses
            .into_iter()
            .map(|a| a.into().trim().to_string())
            .collect();

        if addresses.is_empty() {
            return Err(LockError::InvalidArgument(
                "quorum address list must not be empty".to_string(),
            ));
        }
        if addresses.iter().any(|a| a.is_empty()) {
            return Err(LockError::InvalidArgument(format!(
                "quorum address list contains a blank entry: {:?}",
                addresses
            )));
        }
        Ok(Self { addresses })
    }

    /// Parse a comma separated connect string (`zk1:2181,zk2:2181`).
    pub fn parse(connect_string: &str) -> Result<Self> {
        let parts: Vec<&str> = connect_string
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .collect();
        Self::new(parts)
    }

    /// The individual member addresses.
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Comma-joined connect string handed to the store.
    pub fn connect_string(&self) -> String {
        self.addresses.join(",")
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connect_string())
    }
}

/// Closes the wrapped connection when dropped.
///
/// Close failures are logged and never replace the outcome of the operation
/// that used the connection.
struct ScopedConnection {
    conn: Box<dyn Connection>,
    quorum: String,
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        if !self.conn.is_closed()
            && let Err(e) = self.conn.close()
        {
            tracing::warn!(
                quorum = %self.quorum,
                error = %e,
                "failed to close coordination store connection"
            );
        }
    }
}

/// Client that runs operations against short-lived store connections.
#[derive(Clone)]
pub struct CoordinationClient {
    connector: Arc<dyn Connector>,
    quorum: Quorum,
}

impl fmt::Debug for CoordinationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinationClient")
            .field("quorum", &self.quorum)
            .finish_non_exhaustive()
    }
}

impl CoordinationClient {
    /// Create a client for `quorum` using `connector` to open connections.
    pub fn new(connector: Arc<dyn Connector>, quorum: Quorum) -> Self {
        Self { connector, quorum }
    }

    /// The quorum this client connects to.
    pub fn quorum(&self) -> &Quorum {
        &self.quorum
    }

    /// Run `operation` against a fresh connection.
    ///
    /// The connection is closed on every exit path. Connection failures are
    /// reported as `LockError::Connection`; errors returned by `operation`
    /// propagate unchanged after the connection is closed.
    pub fn run_scoped<T, F>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Connection) -> Result<T>,
    {
        let quorum = self.quorum.connect_string();
        let conn = self.connector.connect(&self.quorum)?;
        let mut scoped = ScopedConnection {
            conn,
            quorum: quorum.clone(),
        };

        if !scoped.conn.is_connected() {
            return Err(LockError::Connection {
                quorum,
                reason: "connection reported not connected".to_string(),
            });
        }

        operation(scoped.conn.as_mut())
    }

    /// Translate a store result code from `op` on `path` into a `LockError`.
    pub fn store_error(&self, op: &str, path: &str, code: StoreCode) -> LockError {
        match code {
            StoreCode::ConnectionLoss => LockError::Connection {
                quorum: self.quorum.connect_string(),
                reason: format!("connection lost during {} of {}", op, path),
            },
            StoreCode::BadArguments(msg) => LockError::InvalidArgument(msg),
            other => LockError::LockingResource(format!("{} of {} failed: {}", op, path, other)),
        }
    }
}
