//! Tests for the lock protocol engine.

use super::*;
use crate::client::{CoordinationClient, Quorum};
use crate::error::LockError;
use crate::error::Result;
use crate::ledger::{FailureLedger, RerunLedger, RerunRecord};
use crate::store::MemoryStore;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn engine(store: &MemoryStore) -> LockEngine {
    LockEngine::new(CoordinationClient::new(
        Arc::new(store.clone()),
        Quorum::new(["local:2181"]).unwrap(),
    ))
}

fn attempt(holder: &str, timeout_ms: u64, retry_ms: u64) -> AcquisitionAttempt {
    AcquisitionAttempt::new(
        "/lock/svc",
        holder,
        Duration::from_millis(timeout_ms),
        Duration::from_millis(retry_ms),
    )
}

#[test]
fn test_uncontested_lock_acquired_on_first_try() {
    let store = MemoryStore::with_members(["local:2181"]);
    let engine = engine(&store);
    let mut ledger = RerunLedger::in_memory();

    let started = Instant::now();
    let acquisition = engine.acquire(&attempt("hostA", 5000, 250), &mut ledger).unwrap();

    assert_eq!(acquisition, Acquisition::Fresh { tries: 1 });
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(store.data("/lock/svc"), Some(b"hostA".to_vec()));
    assert!(ledger.is_empty());
}

#[test]
fn test_foreign_lock_times_out_and_records_failure() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    assert!(engine.create_node("/lock/svc", "hostB").unwrap());
    let mut ledger = RerunLedger::in_memory();

    let started = Instant::now();
    let err = engine.acquire(&attempt("hostA", 1000, 250), &mut ledger).unwrap_err();
    let elapsed = started.elapsed();

    match err {
        LockError::LockAcquisitionFailed { path, holder, .. } => {
            assert_eq!(path, "/lock/svc");
            assert_eq!(holder, "hostA");
        }
        other => panic!("expected acquisition failure, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(1000), "failed early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2000), "failed late: {:?}", elapsed);
    assert_eq!(ledger.get("/lock/svc").unwrap().failure_count, 1);
    assert_eq!(store.data("/lock/svc"), Some(b"hostB".to_vec()));
}

#[test]
fn test_repeated_timeouts_increment_failure_count() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "foobar").unwrap();
    let mut ledger = RerunLedger::in_memory();

    assert!(engine.acquire(&attempt("hostA", 100, 50), &mut ledger).is_err());
    let first = ledger.get("/lock/svc").unwrap();
    assert!(engine.acquire(&attempt("hostA", 100, 50), &mut ledger).is_err());
    let second = ledger.get("/lock/svc").unwrap();

    assert_eq!(second.failure_count, 2);
    assert_eq!(second.last_failure_time, first.last_failure_time);
}

#[test]
fn test_acquires_after_competing_lock_released() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "colliding data").unwrap();

    let releaser = {
        let engine = engine.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            let released_at = Instant::now();
            engine.release_lock("/lock/svc", "colliding data").unwrap();
            released_at
        })
    };

    let mut ledger = RerunLedger::in_memory();
    let started = Instant::now();
    let acquisition = engine.acquire(&attempt("hostA", 3000, 50), &mut ledger).unwrap();
    let acquired_at = Instant::now();
    let released_at = releaser.join().unwrap();

    assert!(matches!(acquisition, Acquisition::Fresh { tries } if tries > 1));
    assert!(acquired_at >= released_at);
    assert!(acquired_at - started < Duration::from_millis(3000));
    assert!(engine.lock_matches("/lock/svc", "hostA").unwrap());
    assert!(ledger.is_empty());
}

#[test]
fn test_sleep_never_overshoots_deadline() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "hostB").unwrap();
    let mut ledger = RerunLedger::in_memory();

    // Retry interval far beyond the timeout: the loop must not wait it out.
    let started = Instant::now();
    let result = engine.acquire(&attempt("hostA", 200, 10_000), &mut ledger);

    assert!(matches!(result, Err(LockError::LockAcquisitionFailed { .. })));
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_no_create_starts_after_deadline() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "hostB").unwrap();
    let mut ledger = RerunLedger::in_memory();

    let attempt = attempt("hostA", 200, 100);
    let result = engine.acquire(&attempt, &mut ledger);

    assert!(matches!(result, Err(LockError::LockAcquisitionFailed { .. })));
    // The create_node above plus the tries of the attempt.
    let calls = store.create_calls_of("/lock/svc");
    let tries = &calls[1..];
    assert!(!tries.is_empty());
    assert!(tries.len() <= 2, "too many tries: {}", tries.len());
    for at in tries {
        assert!(*at < attempt.deadline, "create started at or after the deadline");
    }
}

#[test]
fn test_retry_equal_to_timeout_tries_once() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "hostB").unwrap();
    let mut ledger = RerunLedger::in_memory();

    let result = engine.acquire(&attempt("hostA", 150, 150), &mut ledger);

    assert!(matches!(result, Err(LockError::LockAcquisitionFailed { .. })));
    assert_eq!(store.create_calls_of("/lock/svc").len(), 2);
}

/// Ledger whose writes always fail.
struct UnwritableLedger;

impl FailureLedger for UnwritableLedger {
    fn record_failure(&mut self, _path: &str) -> Result<RerunRecord> {
        Err(LockError::Ledger("disk full".to_string()))
    }

    fn get(&self, _path: &str) -> Option<RerunRecord> {
        None
    }

    fn clear(&mut self, _path: &str) -> Result<()> {
        Err(LockError::Ledger("disk full".to_string()))
    }
}

#[test]
fn test_timeout_reported_when_ledger_write_fails() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "hostB").unwrap();

    let err = engine
        .acquire(&attempt("hostA", 100, 50), &mut UnwritableLedger)
        .unwrap_err();

    assert!(matches!(err, LockError::LockAcquisitionFailed { ref path, ref holder, .. }
        if path == "/lock/svc" && holder == "hostA"));
}

#[test]
fn test_own_stale_lock_is_reclaimed() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "hostA").unwrap();
    let mut ledger = RerunLedger::in_memory();

    let acquisition = engine.acquire(&attempt("hostA", 1000, 250), &mut ledger).unwrap();

    assert_eq!(acquisition, Acquisition::Reclaimed);
    assert!(ledger.is_empty());
}

#[test]
fn test_lock_matches_is_exact() {
    let store = MemoryStore::new();
    let engine = engine(&store);

    assert!(!engine.lock_matches("/lock/svc", "hostA").unwrap());

    engine.create_node("/lock/svc", "hostA").unwrap();
    assert!(engine.lock_matches("/lock/svc", "hostA").unwrap());
    assert!(!engine.lock_matches("/lock/svc", "hostA ").unwrap());
    assert!(!engine.lock_matches("/lock/svc", "hosta").unwrap());
    assert!(!engine.lock_matches("/lock/svc", "").unwrap());
}

#[test]
fn test_acquire_release_round_trip() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    let mut ledger = RerunLedger::in_memory();

    engine.acquire(&attempt("hostA", 1000, 100), &mut ledger).unwrap();
    assert!(engine.lock_matches("/lock/svc", "hostA").unwrap());

    assert!(engine.release_lock("/lock/svc", "hostA").unwrap());
    assert!(!engine.lock_matches("/lock/svc", "hostA").unwrap());
    assert!(!store.exists("/lock/svc"));
    // The parent created along the way stays.
    assert!(store.exists("/lock"));
}

#[test]
fn test_release_never_deletes_foreign_lock() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    engine.create_node("/lock/svc", "hostB").unwrap();

    let err = engine.release_lock("/lock/svc", "hostA").unwrap_err();

    assert!(matches!(err, LockError::LockOwnership { ref path, ref holder }
        if path == "/lock/svc" && holder == "hostA"));
    assert_eq!(store.data("/lock/svc"), Some(b"hostB".to_vec()));
}

#[test]
fn test_release_of_missing_lock_is_ownership_error() {
    let store = MemoryStore::new();
    let engine = engine(&store);

    let err = engine.release_lock("/lock/svc", "hostA").unwrap_err();
    assert!(matches!(err, LockError::LockOwnership { .. }));
}

#[test]
fn test_connection_failure_is_not_retried() {
    let store = MemoryStore::new();
    store.set_unreachable(true);
    let engine = engine(&store);
    let mut ledger = RerunLedger::in_memory();

    let started = Instant::now();
    let err = engine.acquire(&attempt("hostA", 5000, 250), &mut ledger).unwrap_err();

    assert!(matches!(err, LockError::Connection { .. }));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(ledger.is_empty());
}

#[test]
fn test_node_created_at_and_lock_info() {
    let store = MemoryStore::new();
    let engine = engine(&store);
    assert_eq!(engine.node_created_at("/lock/svc").unwrap(), None);
    assert!(engine.lock_info("/lock/svc").unwrap().is_none());

    let before = chrono::Utc::now();
    engine.create_node("/lock/svc", "hostA").unwrap();

    let created = engine.node_created_at("/lock/svc").unwrap().unwrap();
    assert!(created >= before);

    let info = engine.lock_info("/lock/svc").unwrap().unwrap();
    assert_eq!(info.holder, "hostA");
    assert_eq!(info.created_at, created);
    assert!(info.to_string().contains("/lock/svc"));
    assert!(info.age_string().ends_with('s'));
}

#[test]
fn test_lock_info_age_string() {
    let mut info = LockInfo {
        path: "/lock/svc".to_string(),
        holder: "hostA".to_string(),
        created_at: chrono::Utc::now() - chrono::Duration::hours(2),
    };
    assert!(info.age_string().contains('h'));

    info.created_at = chrono::Utc::now() - chrono::Duration::days(3);
    assert!(info.age_string().contains('d'));
}
