//! `pluseval failures` and `pluseval diff`

use std::path::Path;

use anyhow::{Context, Result};
use pluseval_core::EvalResults;
use pluseval_core::report::{diff_failures, failed_tasks};

use crate::console::CliConsole;

fn load(path: &Path) -> Result<EvalResults> {
    EvalResults::load(path).with_context(|| format!("Failed to load results: {}", path.display()))
}

/// Print the tasks whose first sample failed
pub fn list(results: &Path, json: bool) -> Result<()> {
    let failed = failed_tasks(&load(results)?);

    if json {
        println!("{}", serde_json::to_string_pretty(&failed)?);
        return Ok(());
    }

    for task_id in &failed {
        println!("{}", task_id);
    }
    println!("\nTotal: {} failed tasks", failed.len());
    Ok(())
}

/// Print failures present in only one of two runs
pub fn diff(first: &Path, second: &Path) -> Result<()> {
    let diff = diff_failures(&load(first)?, &load(second)?);
    let console = CliConsole::new(true);

    console.task_section(&format!("Failed only in {}", first.display()), &diff.only_first);
    console.task_section(&format!("Failed only in {}", second.display()), &diff.only_second);

    println!(
        "\n{} fixed, {} regressed",
        diff.only_first.len(),
        diff.only_second.len()
    );
    Ok(())
}
