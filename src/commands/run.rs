//! Implementation of the `fleetlock run` and `fleetlock run-if-stale` commands.

use super::{connector, holder, open_ledger, process_query};
use crate::cli::{GuardedCommandArgs, RunArgs, RunIfStaleArgs};
use anyhow::{Context, bail};
use fleetlock::config::Config;
use fleetlock::error::{LockError, Result};
use fleetlock::probe::PgrepSearch;
use fleetlock::serializer::{SerializeOutcome, Serializer};
use std::process::Command;

/// Execute `fleetlock run`.
pub fn cmd_run(config: &Config, args: RunArgs) -> Result<()> {
    let (holder, argv) = prepare(config, &args.guarded)?;
    let mut serializer = build_serializer(config)?;

    let outcome = serializer.serialize(&args.guarded.name, &holder, || run_command(&argv))?;
    report(&outcome);
    Ok(())
}

/// Execute `fleetlock run-if-stale`.
pub fn cmd_run_if_stale(config: &Config, args: RunIfStaleArgs) -> Result<()> {
    let (holder, argv) = prepare(config, &args.guarded)?;
    let query = process_query(args.pattern, args.process)?;
    let mut serializer = build_serializer(config)?;

    let outcome =
        serializer.serialize_if_stale(&args.guarded.name, &holder, &query, || run_command(&argv))?;
    report(&outcome);
    Ok(())
}

fn prepare(config: &Config, args: &GuardedCommandArgs) -> Result<(String, Vec<String>)> {
    let argv = split_command(&args.command)?;
    Ok((holder(config, args.holder.clone()), argv))
}

fn build_serializer(config: &Config) -> Result<Serializer> {
    Serializer::new(
        config.clone(),
        connector(config),
        Box::new(PgrepSearch),
        Box::new(open_ledger(config)?),
    )
}

fn report(outcome: &SerializeOutcome) {
    if outcome.ran {
        println!("Ran command under lock {}", outcome.lock_path);
    } else {
        println!(
            "Skipped command under lock {}: process already restarted",
            outcome.lock_path
        );
    }
}

/// Split a command string into argv the way a POSIX shell would.
pub(super) fn split_command(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command).map_err(|e| {
        LockError::InvalidArgument(format!("cannot parse command '{}': {}", command, e))
    })?;
    if argv.is_empty() {
        return Err(LockError::InvalidArgument("command must not be empty".to_string()));
    }
    Ok(argv)
}

/// Run `argv`, inheriting stdio; a non-zero exit is an error.
pub(super) fn run_command(argv: &[String]) -> anyhow::Result<()> {
    let Some((program, args)) = argv.split_first() else {
        bail!("empty command");
    };
    tracing::debug!(program = %program, ?args, "spawning guarded command");

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to execute '{}'", program))?;
    if !status.success() {
        bail!("'{}' exited with {}", shell_words::join(argv), status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_handles_quoting() {
        assert_eq!(
            split_command("sh -c 'echo \"a b\"'").unwrap(),
            vec!["sh", "-c", "echo \"a b\""]
        );
    }

    #[test]
    fn test_split_command_rejects_bad_input() {
        assert!(matches!(split_command(""), Err(LockError::InvalidArgument(_))));
        assert!(matches!(split_command("   "), Err(LockError::InvalidArgument(_))));
        assert!(matches!(
            split_command("echo 'unterminated"),
            Err(LockError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_run_command_success_and_failure() {
        assert!(run_command(&split_command("true").unwrap()).is_ok());

        let err = run_command(&split_command("sh -c 'exit 3'").unwrap()).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn test_run_command_missing_program() {
        let err = run_command(&["fleetlock-no-such-binary".to_string()]).unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
    }
}
