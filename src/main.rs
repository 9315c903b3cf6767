//! skilldex - search, inspect and summarize a skills dataset.

mod cli;
mod error;

use crate::cli::Cli;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // Debug output of the error includes the whole error tree.
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info,skilldex=debug,skilldex_cache=debug,skilldex_storage=debug",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    // Stdout is reserved for JSON output.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
