//! stalefile - print a cached file, refreshing it when it is stale
//!
//! Checks the file's modification time against a max age, runs the
//! configured refresh command if the file is stale, then copies it to stdout.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stalefile::cli::{run, Cli, RunConfig};

/// Sends log output to stderr so it never mixes with file contents on stdout
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stalefile=warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    setup_logging();

    let cli = Cli::parse();

    let config = match RunConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("stalefile: {}", e);
            return ExitCode::from(2);
        }
    };

    let stdout = io::stdout();
    if let Err(e) = run(&config, &mut stdout.lock()) {
        eprintln!("stalefile: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
