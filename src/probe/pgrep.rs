//! `pgrep`/`ps` backed process search.

use super::{ProcessMatch, ProcessQuery, ProcessSearch};
use crate::error::{LockError, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::process::{Command, Output};

/// Longest pattern `pgrep` can match against a process name; the kernel
/// truncates names to this many bytes.
pub const MAX_NAME_PATTERN_LEN: usize = 15;

/// `ps -o lstart` layout under the C locale, e.g. `Mon Oct 19 10:00:00 2026`.
const LSTART_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Process search using `pgrep` to find pids and `ps` for their start times.
///
/// Exit status 0 (matches) and 1 (no matches) are both success for these
/// tools; anything else, or any stderr output, is a probe failure. The
/// calling process itself is never reported, since its own command line may
/// contain the pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgrepSearch;

impl PgrepSearch {
    /// Reject queries `pgrep` cannot answer.
    ///
    /// Process names are at most [`MAX_NAME_PATTERN_LEN`] bytes, so a longer
    /// name-only pattern could never match (and makes `pgrep` complain on
    /// stderr).
    pub fn check_query(query: &ProcessQuery) -> Result<()> {
        if query.pattern.trim().is_empty() {
            return Err(LockError::InvalidArgument(
                "process pattern must not be empty".to_string(),
            ));
        }
        if !query.full_command_line && query.pattern.len() > MAX_NAME_PATTERN_LEN {
            return Err(LockError::InvalidArgument(format!(
                "process name pattern '{}' is longer than {} bytes and can never match; \
                 match the full command line instead",
                query.pattern, MAX_NAME_PATTERN_LEN
            )));
        }
        Ok(())
    }
}

struct ToolOutput {
    stdout: String,
}

fn run_tool(program: &str, args: &[&str]) -> Result<ToolOutput> {
    let output: Output = Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .output()
        .map_err(|e| LockError::Probe(format!("failed to execute {}: {}", program, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    match output.status.code() {
        Some(0) | Some(1) => {}
        code => {
            return Err(LockError::Probe(format!(
                "{} {} failed (exit code {:?}): {}",
                program,
                args.join(" "),
                code,
                stderr
            )));
        }
    }
    if !stderr.is_empty() {
        return Err(LockError::Probe(format!("{} reported: {}", program, stderr)));
    }

    Ok(ToolOutput { stdout })
}

/// Parse `pgrep` output (one pid per line).
pub(super) fn parse_pids(stdout: &str) -> Result<Vec<u32>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<u32>()
                .map_err(|e| LockError::Probe(format!("unexpected pgrep output '{}': {}", l, e)))
        })
        .collect()
}

/// Parse `ps -o pid=,lstart=` output into (pid, local start time) pairs.
pub(super) fn parse_start_times(stdout: &str) -> Result<Vec<(u32, NaiveDateTime)>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            let mut fields = l.split_whitespace();
            let pid = fields.next().and_then(|f| f.parse::<u32>().ok());
            // Day of month is space padded; normalize before parsing.
            let lstart = fields.collect::<Vec<_>>().join(" ");
            let started = NaiveDateTime::parse_from_str(&lstart, LSTART_FORMAT).ok();
            match (pid, started) {
                (Some(pid), Some(started)) => Ok((pid, started)),
                _ => Err(LockError::Probe(format!("unexpected ps output '{}'", l))),
            }
        })
        .collect()
}

/// Interpret a wall-clock time printed by `ps` in the local time zone.
fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| LockError::Probe(format!("start time {} does not exist locally", naive)))
}

impl ProcessSearch for PgrepSearch {
    fn search(&self, query: &ProcessQuery) -> Result<Vec<ProcessMatch>> {
        Self::check_query(query)?;

        let mut args: Vec<&str> = Vec::new();
        if query.full_command_line {
            args.push("-f");
        }
        if let Some(user) = &query.user {
            args.extend(["-u", user.as_str()]);
        }
        args.extend(["--", query.pattern.as_str()]);

        let own_pid = std::process::id();
        let pids: Vec<u32> = parse_pids(&run_tool("pgrep", &args)?.stdout)?
            .into_iter()
            .filter(|pid| *pid != own_pid)
            .collect();
        if pids.is_empty() {
            return Ok(Vec::new());
        }

        let pid_list = pids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        // Processes that exited since pgrep ran are simply absent here.
        let ps = run_tool("ps", &["-o", "pid=,lstart=", "-p", &pid_list])?;

        parse_start_times(&ps.stdout)?
            .into_iter()
            .map(|(pid, started)| {
                Ok(ProcessMatch {
                    pid,
                    started_at: local_to_utc(started)?,
                })
            })
            .collect()
    }
}
