//! Tests for the process liveness probe.

use super::pgrep::{parse_pids, parse_start_times};
use super::*;
use crate::error::LockError;
use chrono::{Duration, NaiveDate, TimeZone};
use serial_test::serial;
use std::process::{Child, Command};

/// Search returning a fixed answer, recording the last query.
struct FixedSearch {
    result: std::result::Result<Vec<ProcessMatch>, String>,
    last_query: std::cell::RefCell<Option<ProcessQuery>>,
}

impl FixedSearch {
    fn matches(matches: Vec<ProcessMatch>) -> Self {
        Self {
            result: Ok(matches),
            last_query: Default::default(),
        }
    }

    fn failing(msg: &str) -> Self {
        Self {
            result: Err(msg.to_string()),
            last_query: Default::default(),
        }
    }
}

impl ProcessSearch for FixedSearch {
    fn search(&self, query: &ProcessQuery) -> crate::error::Result<Vec<ProcessMatch>> {
        *self.last_query.borrow_mut() = Some(query.clone());
        self.result.clone().map_err(LockError::Probe)
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[test]
fn test_probe_returns_earliest_of_three() {
    let search = FixedSearch::matches(vec![
        ProcessMatch { pid: 30, started_at: at(20) },
        ProcessMatch { pid: 10, started_at: at(0) },
        ProcessMatch { pid: 20, started_at: at(10) },
    ]);

    let earliest = probe_start_time(&search, &ProcessQuery::new("java")).unwrap();
    assert_eq!(earliest, Some(at(0)));
}

#[test]
fn test_probe_no_match_is_none() {
    let search = FixedSearch::matches(Vec::new());
    assert_eq!(
        probe_start_time(&search, &ProcessQuery::new("not a command")).unwrap(),
        None
    );
}

#[test]
fn test_probe_error_propagates() {
    let search = FixedSearch::failing("pgrep: invalid user name");
    let err = probe_start_time(&search, &ProcessQuery::new("x").user("nobody?")).unwrap_err();
    assert!(matches!(err, LockError::Probe(msg) if msg.contains("invalid user")));
}

#[test]
fn test_query_builder_passes_filters() {
    let search = FixedSearch::matches(Vec::new());
    let query = ProcessQuery::new("sleep 60").user("root");
    probe_start_time(&search, &query).unwrap();

    let seen = search.last_query.borrow().clone().unwrap();
    assert!(seen.full_command_line);
    assert_eq!(seen.user.as_deref(), Some("root"));
    assert_eq!(seen.pattern, "sleep 60");
}

#[test]
fn test_restarted_since_compares_whole_seconds() {
    let search = FixedSearch::matches(vec![ProcessMatch {
        pid: 1,
        started_at: at(10) + Duration::milliseconds(900),
    }]);
    let query = ProcessQuery::new("svc");

    assert!(restarted_since(&search, &query, at(9)).unwrap());
    // Same second is not "after".
    assert!(!restarted_since(&search, &query, at(10)).unwrap());
    assert!(!restarted_since(&search, &query, at(11)).unwrap());
}

#[test]
fn test_restarted_since_without_process_is_false() {
    let search = FixedSearch::matches(Vec::new());
    assert!(!restarted_since(&search, &ProcessQuery::new("svc"), at(0)).unwrap());
}

#[test]
fn test_parse_pids() {
    assert_eq!(parse_pids("123\n456\n").unwrap(), vec![123, 456]);
    assert_eq!(parse_pids("").unwrap(), Vec::<u32>::new());
    assert!(matches!(parse_pids("12a"), Err(LockError::Probe(_))));
}

#[test]
fn test_parse_start_times() {
    let output = " 123 Mon Oct 19 10:00:00 2026\n  456 Fri Oct  9 08:05:07 2026\n";
    let parsed = parse_start_times(output).unwrap();
    assert_eq!(
        parsed,
        vec![
            (
                123,
                NaiveDate::from_ymd_opt(2026, 10, 19)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap()
            ),
            (
                456,
                NaiveDate::from_ymd_opt(2026, 10, 9)
                    .unwrap()
                    .and_hms_opt(8, 5, 7)
                    .unwrap()
            ),
        ]
    );
    assert!(matches!(parse_start_times("123"), Err(LockError::Probe(_))));
    assert!(matches!(parse_start_times("123 45"), Err(LockError::Probe(_))));
}

#[test]
fn test_query_defaults_to_full_command_line() {
    let query = ProcessQuery::new("hadoop-hdfs-datanode");
    assert!(query.full_command_line);
    assert!(PgrepSearch::check_query(&query).is_ok());
}

#[test]
fn test_long_name_only_pattern_rejected_before_searching() {
    let query = ProcessQuery::new("hadoop-hdfs-datanode").full_command_line(false);

    let err = PgrepSearch.search(&query).unwrap_err();
    assert!(matches!(err, LockError::InvalidArgument(ref msg) if msg.contains("15")));

    let short = ProcessQuery::new("datanode").full_command_line(false);
    assert!(PgrepSearch::check_query(&short).is_ok());
    assert_eq!(MAX_NAME_PATTERN_LEN, 15);
}

#[test]
fn test_empty_pattern_rejected() {
    let err = PgrepSearch::check_query(&ProcessQuery::new("  ")).unwrap_err();
    assert!(matches!(err, LockError::InvalidArgument(_)));
}

fn tools_available() -> bool {
    ["pgrep", "ps"].iter().all(|tool| {
        Command::new(tool)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

#[test]
#[serial]
fn test_pgrep_finds_spawned_process() {
    if !tools_available() {
        eprintln!("skipping: pgrep/ps not available");
        return;
    }

    let before = Utc::now() - Duration::seconds(1);
    let child = KillOnDrop(Command::new("sleep").arg("31.4159").spawn().unwrap());
    std::thread::sleep(std::time::Duration::from_millis(200));

    let query = ProcessQuery::new("sleep 31.4159");
    let matches = PgrepSearch.search(&query).unwrap();

    assert!(matches.iter().any(|m| m.pid == child.0.id()));
    let started = probe_start_time(&PgrepSearch, &query).unwrap().unwrap();
    assert!(started >= before);
    assert!(started <= Utc::now());
}

#[test]
#[serial]
fn test_pgrep_no_match_is_empty() {
    if !tools_available() {
        eprintln!("skipping: pgrep/ps not available");
        return;
    }

    let query = ProcessQuery::new("fleetlock-no-such-process-e4f1");
    assert!(PgrepSearch.search(&query).unwrap().is_empty());

    let by_name = ProcessQuery::new("fleetlk-e4f1x").full_command_line(false);
    assert!(PgrepSearch.search(&by_name).unwrap().is_empty());
}
