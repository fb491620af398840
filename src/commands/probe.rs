//! Implementation of the `fleetlock probe` command.

use super::process_query;
use crate::cli::ProbeArgs;
use fleetlock::error::Result;
use fleetlock::probe::{PgrepSearch, probe_start_time};

/// Execute `fleetlock probe`.
pub fn cmd_probe(args: ProbeArgs) -> Result<()> {
    let query = process_query(args.pattern, args.process)?;

    match probe_start_time(&PgrepSearch, &query)? {
        Some(started_at) => println!(
            "Earliest matching process started at {}",
            started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("No process matches '{}'.", query.pattern),
    }
    Ok(())
}
