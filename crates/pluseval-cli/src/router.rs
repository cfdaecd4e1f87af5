//! Command routing logic for CLI

use anyhow::Result;

use crate::args::{Cli, Commands};
use crate::commands;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Evaluate(args) => commands::evaluate::run(args, cli.verbose).await,
        Commands::Failures { results, json } => commands::failures::list(&results, json),
        Commands::Diff { first, second } => commands::failures::diff(&first, &second),
    }
}
