//! simstage entry point.
//!
//! Validate the workspace found through `ROS_PACKAGE_PATH` and stage its
//! assets into `simulation_files/`:
//! ```bash
//! cargo run -p simstage-cli -- --verbose
//! ```

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use simstage_cli::{Cli, Reporter};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let default_directive = if cli.verbose { "simstage=info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), stdout.is_terminal());
    match simstage_cli::run(&cli, &mut reporter) {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(e) => {
            eprintln!("Error: {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}
