//! CLI argument parsing for fleetlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Fleetlock: serialize an action across a fleet through a coordination store.
///
/// Each host runs the same command; only one at a time holds the named lock
/// and runs it. Failed acquisitions are remembered so a later run can catch
/// up, and `run-if-stale` skips work a restarted process already did.
#[derive(Parser, Debug)]
#[command(name = "fleetlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: /etc/fleetlock/config.yaml if it exists).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by FLEETLOCK_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for fleetlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding a lock.
    ///
    /// Blocks until the lock is free or the acquire timeout passes, runs the
    /// command, then releases the lock whether or not the command succeeded.
    Run(RunArgs),

    /// Run a command under a lock unless a matching process already restarted.
    ///
    /// The command is skipped when the process matching --pattern started
    /// after the last failed acquisition, or after our own leftover lock was
    /// created.
    RunIfStale(RunIfStaleArgs),

    /// Inspect or release locks.
    Lock(LockCommand),

    /// Inspect or clear the rerun ledger.
    Ledger(LedgerCommand),

    /// Print the earliest start time of processes matching a pattern.
    Probe(ProbeArgs),
}

/// Holder and command shared by the run commands.
#[derive(Args, Debug)]
pub struct GuardedCommandArgs {
    /// Lock name (spaces are replaced with ':' in the lock path).
    pub name: String,

    /// Identity written into the lock (default: config holder, then host name).
    #[arg(long)]
    pub holder: Option<String>,

    /// Command to run, split like a POSIX shell would.
    #[arg(long)]
    pub command: String,
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub guarded: GuardedCommandArgs,
}

/// Process selection shared by `run-if-stale` and `probe`.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Match only the process name (at most 15 bytes) instead of the full
    /// command line.
    #[arg(long)]
    pub name_only: bool,

    /// Only consider processes of this user.
    #[arg(long)]
    pub user: Option<String>,
}

/// Arguments for the `run-if-stale` command.
#[derive(Args, Debug)]
pub struct RunIfStaleArgs {
    #[command(flatten)]
    pub guarded: GuardedCommandArgs,

    /// Pattern identifying the service's processes.
    #[arg(long)]
    pub pattern: String,

    #[command(flatten)]
    pub process: ProcessArgs,
}

/// Lock subcommands.
#[derive(Args, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show who holds a lock and since when.
    Status(LockNameArgs),

    /// Release a lock held by the given holder.
    ///
    /// A lock held by anyone else is never deleted.
    Release(LockReleaseArgs),
}

/// A lock name.
#[derive(Args, Debug)]
pub struct LockNameArgs {
    /// Lock name.
    pub name: String,
}

/// Arguments for `lock release`.
#[derive(Args, Debug)]
pub struct LockReleaseArgs {
    /// Lock name.
    pub name: String,

    /// Holder the lock must contain (default: config holder, then host name).
    #[arg(long)]
    pub holder: Option<String>,
}

/// Ledger subcommands.
#[derive(Args, Debug)]
pub struct LedgerCommand {
    #[command(subcommand)]
    pub action: LedgerAction,
}

/// Ledger actions.
#[derive(Subcommand, Debug)]
pub enum LedgerAction {
    /// List failed acquisitions on record.
    List,

    /// Forget the failures recorded for a lock.
    Clear(LockNameArgs),
}

/// Arguments for the `probe` command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Process pattern.
    pub pattern: String,

    #[command(flatten)]
    pub process: ProcessArgs,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
