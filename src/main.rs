//! Traffic Ledger CLI
//!
//! Replays a CSV file of ledger operations and prints the final driver
//! states as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv [rules.toml] > drivers.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `TRAFFIC_LEDGER_DB`: SQLite file to persist the ledger in (in memory when unset)

use log::info;
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;
use traffic_ledger::{Ledger, LedgerError, Replay, Result, RulesConfig};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(LedgerError::MissingArgument);
    }

    let rules = match args.get(2) {
        Some(path) => RulesConfig::load_file(path)?,
        None => RulesConfig::default(),
    };

    let input_path = &args[1];
    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let ledger = match env::var_os("TRAFFIC_LEDGER_DB") {
        Some(path) => Ledger::open(path, rules)?,
        None => Ledger::in_memory(rules)?,
    };

    let mut replay = Replay::new(ledger);
    let applied = replay.process_csv(reader)?;
    info!("Applied {} operations from {}", applied, input_path);

    let stdout = io::stdout();
    let handle = stdout.lock();
    replay.write_output(handle)?;

    Ok(())
}
