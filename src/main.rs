mod build;
mod cli;
mod config;
mod diagnostics;
mod discover;
mod parser;
mod target;

use std::{io, process::ExitCode};

use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter, e.g. `STRUCTDOC_LOG=debug`.
const LOG_ENV: &str = "STRUCTDOC_LOG";

fn main() -> ExitCode {
    init_tracing();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
