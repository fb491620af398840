//! Implementation of the `fleetlock lock` subcommands.

use super::{holder, lock_engine};
use crate::cli::{LockNameArgs, LockReleaseArgs};
use fleetlock::config::Config;
use fleetlock::error::Result;
use fleetlock::paths::lock_path;

/// Execute `fleetlock lock status`.
pub fn cmd_lock_status(config: &Config, args: LockNameArgs) -> Result<()> {
    let path = lock_path(&config.lock_root, &args.name);
    let engine = lock_engine(config)?;

    match engine.lock_info(&path)? {
        Some(info) => {
            println!("Lock {}:", info.path);
            println!("  Holder:     {}", info.holder);
            println!("  Created:    {}", info.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  Age:        {}", info.age_string());
        }
        None => println!("Lock {} is not held.", path),
    }
    Ok(())
}

/// Execute `fleetlock lock release`.
pub fn cmd_lock_release(config: &Config, args: LockReleaseArgs) -> Result<()> {
    let path = lock_path(&config.lock_root, &args.name);
    let holder = holder(config, args.holder);
    let engine = lock_engine(config)?;

    if engine.release_lock(&path, &holder)? {
        println!("Released lock {} held by '{}'.", path, holder);
    } else {
        println!("Lock {} was already gone.", path);
    }
    Ok(())
}
