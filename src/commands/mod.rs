//! Command implementations for fleetlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the wiring from [`Config`] to store connector,
//! ledger and lock engine shared by them.

mod ledger;
mod lock;
mod probe;
mod run;


use crate::cli::{Cli, Command, LedgerAction, LockAction, ProcessArgs};
use fleetlock::client::CoordinationClient;
use fleetlock::config::{Config, StoreBackend};
use fleetlock::engine::LockEngine;
use fleetlock::error::Result;
use fleetlock::ledger::RerunLedger;
use fleetlock::probe::{PgrepSearch, ProcessQuery};
use fleetlock::store::{Connector, DirectoryStore, MemoryStore};
use std::sync::Arc;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => run::cmd_run(&config, args),
        Command::RunIfStale(args) => run::cmd_run_if_stale(&config, args),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::Status(args) => lock::cmd_lock_status(&config, args),
            LockAction::Release(args) => lock::cmd_lock_release(&config, args),
        },
        Command::Ledger(ledger_cmd) => match ledger_cmd.action {
            LedgerAction::List => ledger::cmd_ledger_list(&config),
            LedgerAction::Clear(args) => ledger::cmd_ledger_clear(&config, args),
        },
        Command::Probe(args) => probe::cmd_probe(args),
    }
}

/// Store connector for the configured backend.
fn connector(config: &Config) -> Arc<dyn Connector> {
    match config.store {
        StoreBackend::Directory => Arc::new(DirectoryStore),
        StoreBackend::Memory => {
            tracing::warn!(
                "memory store backend is process-local; locks do not exclude other invocations"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

/// The rerun ledger, persisted if a ledger path is configured.
fn open_ledger(config: &Config) -> Result<RerunLedger> {
    match &config.ledger_path {
        Some(path) => RerunLedger::open(path),
        None => Ok(RerunLedger::in_memory()),
    }
}

/// Lock engine talking to the configured quorum.
fn lock_engine(config: &Config) -> Result<LockEngine> {
    let client = CoordinationClient::new(connector(config), config.quorum()?);
    Ok(LockEngine::new(client))
}

/// Holder given on the command line, else the configured one.
fn holder(config: &Config, explicit: Option<String>) -> String {
    explicit.unwrap_or_else(|| config.holder_id())
}

/// Process query for `pattern`, checked before any lock is taken.
fn process_query(pattern: String, args: ProcessArgs) -> Result<ProcessQuery> {
    let mut query = ProcessQuery::new(pattern).full_command_line(!args.name_only);
    if let Some(user) = args.user {
        query = query.user(user);
    }
    PgrepSearch::check_query(&query)?;
    Ok(query)
}
