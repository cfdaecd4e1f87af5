//! pluseval command-line interface
//!
//! Evaluates machine-generated code samples against a benchmark's base and
//! extended test suites and reports pass@k.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/pluseval-cli
//! ```
//!
//! # Commands
//!
//! - `pluseval evaluate --problems <file> --samples <file|dir>` runs every
//!   sample and writes `eval_results.json`
//! - `pluseval failures <results>` lists tasks whose first sample failed
//! - `pluseval diff <a> <b>` compares the failure sets of two runs
//!
//! Set `RUST_LOG=debug` for per-unit logging.

mod args;
mod commands;
mod console;
mod progress;
mod router;
mod signal_handler;

use clap::Parser;
use pluseval_core::EvalError;
use tracing_subscriber::EnvFilter;

pub use args::{Cli, Commands, EvaluateArgs};

/// Exit status after Ctrl+C, as shells report for SIGINT
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let console = console::CliConsole::new(cli.verbose);
    match router::route(cli).await {
        Err(e) => match e.downcast_ref::<EvalError>() {
            Some(EvalError::Cancelled { completed }) => {
                console.interrupted(*completed);
                std::process::exit(EXIT_INTERRUPTED);
            }
            _ => Err(e),
        },
        Ok(()) => Ok(()),
    }
}
