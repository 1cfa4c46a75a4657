//! # salesetl
//!
//! Command-line entry point. Parses arguments, sets up logging and runs one
//! command against the configured raw and processed stores.
//!
//! ```bash
//! salesetl run sales.csv --raw-dir ./raw --processed-dir ./processed
//! salesetl run sales.csv --spec monthly.json --summary-json
//! salesetl list
//! salesetl check
//! ```
//!
//! Command output goes to stdout, logs to stderr and the log directory.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout, clippy::print_stderr)] // CLI reports go to the terminal

mod cli;

use clap::Parser as _;
use std::process::ExitCode;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    if let Err(err) = salesetl::logging::init() {
        match salesetl::logging::init_fallback() {
            Ok(()) => tracing::warn!("File logging unavailable, using console only: {err:#}"),
            Err(fallback) => eprintln!("Logging unavailable: {err:#}; {fallback:#}"),
        }
    }

    let cli = cli::Cli::parse();
    Ok(cli::run_command(cli)?)
}
