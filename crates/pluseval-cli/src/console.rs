//! Terminal output for evaluation commands

use colored::*;

/// Formatted status lines and task listings
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Progress detail, shown with `--verbose` only
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    /// Report a run stopped by Ctrl+C
    pub fn interrupted(&self, completed: usize) {
        eprintln!(
            "{} {}",
            "✗".red().bold(),
            format!("Interrupted after {} completed unit(s)", completed).red()
        );
        eprintln!(
            "  {}",
            "Finished outcomes are cached; run the same command again to resume".dimmed()
        );
    }

    /// Titled list of task ids, or a placeholder when there are none
    pub fn task_section<'a>(&self, title: &str, task_ids: impl IntoIterator<Item = &'a String>) {
        println!();
        println!("{}", title.bold().underline());
        print!("{}", task_lines(task_ids));
    }
}

fn task_lines<'a>(task_ids: impl IntoIterator<Item = &'a String>) -> String {
    let lines: Vec<String> = task_ids.into_iter().map(|id| format!("  {}\n", id)).collect();
    if lines.is_empty() {
        "  (none)\n".to_string()
    } else {
        lines.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_lines() {
        let ids = vec!["HumanEval/0".to_string(), "HumanEval/12".to_string()];
        assert_eq!(task_lines(&ids), "  HumanEval/0\n  HumanEval/12\n");
        assert_eq!(task_lines(&Vec::new()), "  (none)\n");
    }
}
