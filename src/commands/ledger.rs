//! Implementation of the `fleetlock ledger` subcommands.

use super::open_ledger;
use crate::cli::LockNameArgs;
use fleetlock::config::Config;
use fleetlock::error::Result;
use fleetlock::ledger::FailureLedger;
use fleetlock::paths::lock_path;

/// Execute `fleetlock ledger list`.
pub fn cmd_ledger_list(config: &Config) -> Result<()> {
    if config.ledger_path.is_none() {
        println!("No ledger_path configured; failures are not kept between runs.");
        return Ok(());
    }
    let ledger = open_ledger(config)?;

    if ledger.is_empty() {
        println!("No failed acquisitions on record.");
        return Ok(());
    }

    println!("Failed acquisitions:");
    println!();
    for (path, record) in ledger.records() {
        println!("  {}:", path);
        println!(
            "    Failing since: {}",
            record.last_failure_time.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("    Failures:      {}", record.failure_count);
        println!();
    }
    Ok(())
}

/// Execute `fleetlock ledger clear`.
pub fn cmd_ledger_clear(config: &Config, args: LockNameArgs) -> Result<()> {
    let path = lock_path(&config.lock_root, &args.name);
    let mut ledger = open_ledger(config)?;

    if ledger.get(&path).is_none() {
        println!("No failures on record for {}.", path);
        return Ok(());
    }
    ledger.clear(&path)?;
    println!("Cleared failures for {}.", path);
    Ok(())
}
