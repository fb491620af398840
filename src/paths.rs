//! Lock path construction and recursive node creation.

use crate::client::CoordinationClient;
use crate::error::Result;
use crate::store::StoreCode;

/// Build the lock path for a human-readable lock name.
///
/// Spaces in `name` are replaced with `:` and the result is joined to `root`
/// with a single `/`. Distinct names that collapse to the same path share a
/// lock; callers must avoid that.
pub fn lock_path(root: &str, name: &str) -> String {
    let name = name.replace(' ', ":");
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// Proper ancestors of `path` in root-to-leaf order.
///
/// `/a/b/c` yields `["/a", "/a/b"]`; the root itself is never included.
pub fn ancestors(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut out = Vec::with_capacity(segments.len().saturating_sub(1));
    let mut current = String::new();
    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        current.push('/');
        current.push_str(segment);
        out.push(current.clone());
    }
    out
}

/// Data held by the node at `path`, or `None` if it does not exist.
pub fn get_node_data(client: &CoordinationClient, path: &str) -> Result<Option<Vec<u8>>> {
    client.run_scoped(|conn| match conn.get(path) {
        Ok(data) => Ok(Some(data)),
        Err(StoreCode::NoNode) => Ok(None),
        Err(code) => Err(client.store_error("get", path, code)),
    })
}

/// Create `path` holding `data`, creating missing ancestors first.
///
/// Ancestors are created strictly root-to-leaf with empty data. Returns
/// `Ok(true)` if the leaf was created and `Ok(false)` if it already existed.
/// Failing to create an ancestor is a `LockingResource` error.
pub fn ensure_node_exists(client: &CoordinationClient, path: &str, data: &[u8]) -> Result<bool> {
    if get_node_data(client, path)?.is_none() {
        tracing::debug!(path, "did not find node; creating missing ancestors");

        for ancestor in ancestors(path) {
            if get_node_data(client, &ancestor)?.is_some() {
                continue;
            }
            client.run_scoped(|conn| {
                let ret = conn.create(&ancestor, b"");
                tracing::debug!(path = %ancestor, result = ?ret, "tried to create ancestor node");
                match ret {
                    // Another client created it between our check and create.
                    Ok(()) | Err(StoreCode::NodeExists) => Ok(()),
                    Err(code) => Err(client.store_error("create", &ancestor, code)),
                }
            })?;
        }
    }

    client.run_scoped(|conn| {
        let ret = conn.create(path, data);
        tracing::debug!(path, result = ?ret, "tried to create node");
        match ret {
            Ok(()) => Ok(true),
            Err(StoreCode::NodeExists) => Ok(false),
            Err(code) => Err(client.store_error("create", path, code)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Quorum;
    use crate::error::LockError;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn client(store: &MemoryStore) -> CoordinationClient {
        CoordinationClient::new(
            Arc::new(store.clone()),
            Quorum::new(["local:2181"]).unwrap(),
        )
    }

    #[test]
    fn test_lock_path_replaces_spaces() {
        assert_eq!(
            lock_path("/lock", "Dummy Resource Lock"),
            "/lock/Dummy:Resource:Lock"
        );
        assert_eq!(
            lock_path("/lock/", "ruby_block[Dummy Resource One]"),
            "/lock/ruby_block[Dummy:Resource:One]"
        );
        assert_eq!(lock_path("/", "svc"), "/svc");
    }

    #[test]
    fn test_ancestors_ascending() {
        assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b"]);
        assert_eq!(ancestors("/a"), Vec::<String>::new());
        assert_eq!(ancestors("/"), Vec::<String>::new());
    }

    #[test]
    fn test_get_node_data_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(get_node_data(&client(&store), "/lock/svc").unwrap(), None);
    }

    #[test]
    fn test_ensure_node_exists_creates_ancestors_first() {
        let store = MemoryStore::new();
        let created = ensure_node_exists(&client(&store), "/fleet/locks/svc", b"hostA").unwrap();

        assert!(created);
        assert_eq!(
            store.creation_log(),
            vec!["/fleet", "/fleet/locks", "/fleet/locks/svc"]
        );
        assert_eq!(store.data("/fleet"), Some(Vec::new()));
        assert_eq!(store.data("/fleet/locks"), Some(Vec::new()));
        assert_eq!(store.data("/fleet/locks/svc"), Some(b"hostA".to_vec()));
    }

    #[test]
    fn test_ensure_node_exists_skips_present_ancestors() {
        let store = MemoryStore::new();
        let client = client(&store);
        ensure_node_exists(&client, "/lock", b"").unwrap();

        assert!(ensure_node_exists(&client, "/lock/svc", b"hostA").unwrap());
        assert_eq!(store.creation_log(), vec!["/lock", "/lock/svc"]);
    }

    #[test]
    fn test_ensure_node_exists_existing_leaf_is_false() {
        let store = MemoryStore::new();
        let client = client(&store);
        assert!(ensure_node_exists(&client, "/lock/svc", b"hostB").unwrap());

        assert!(!ensure_node_exists(&client, "/lock/svc", b"hostA").unwrap());
        assert_eq!(store.data("/lock/svc"), Some(b"hostB".to_vec()));
    }

    #[test]
    fn test_ancestor_failure_is_fatal() {
        let store = MemoryStore::new();
        store.fail_create_of("/fleet/locks");

        let err = ensure_node_exists(&client(&store), "/fleet/locks/svc", b"hostA").unwrap_err();
        assert!(matches!(err, LockError::LockingResource(msg) if msg.contains("/fleet/locks")));
        assert!(!store.exists("/fleet/locks/svc"));
    }

    #[test]
    fn test_every_operation_closes_its_connection() {
        let store = MemoryStore::new();
        ensure_node_exists(&client(&store), "/a/b/c", b"x").unwrap();

        let (opened, closed) = store.connection_counts();
        assert!(opened > 1);
        assert_eq!(opened, closed);
    }
}
