//! Evaluation results and reports
//!
//! Persists per-task outcome lists, renders a terminal summary and compares
//! failure sets between runs.

mod failures;
mod results;

pub use failures::{FailureDiff, diff_failures, failed_tasks};
pub use results::{EvalResults, SampleRecord, TaskResults, backup_path, results_path};

use std::collections::BTreeMap;

/// Render a plain-text summary table for terminal output
pub fn summary_table(results: &EvalResults) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n{:=<60}\n", "= Evaluation Results "));
    output.push_str(&format!(
        "Dataset: {} | Hash: {}\n",
        results.dataset,
        results.hash.chars().take(12).collect::<String>()
    ));
    output.push_str(&format!(
        "Timestamp: {}\n",
        results.date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("{:=<60}\n\n", ""));

    if let Some(report) = &results.pass_at_k {
        output.push_str(&format!("PASS@K ({} tasks)\n", report.tasks));
        output.push_str(&format!("{:-<60}\n", ""));
        output.push_str(&format!("{:<10} {:>12} {:>14}\n", "k", "base", "base + extra"));
        output.push_str(&format!("{:-<60}\n", ""));
        for base in &report.base {
            let plus = report
                .plus_at(base.k)
                .map(|v| format!("{:.1}%", v * 100.0))
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "{:<10} {:>12} {:>14}\n",
                format!("pass@{}", base.k),
                base.as_percentage(),
                plus
            ));
        }
        output.push_str(&format!("{:-<60}\n\n", ""));
    }

    output.push_str("OUTCOMES\n");
    output.push_str(&format!("{:-<60}\n", ""));
    output.push_str(&format!("{:<10} {:>12} {:>14}\n", "Status", "base", "base + extra"));
    output.push_str(&format!("{:-<60}\n", ""));

    let (base, plus) = outcome_counts(results);
    for (label, count) in &base {
        output.push_str(&format!(
            "{:<10} {:>12} {:>14}\n",
            label,
            count,
            plus.get(label).copied().unwrap_or(0)
        ));
    }
    for (label, count) in plus.iter().filter(|(label, _)| !base.contains_key(*label)) {
        output.push_str(&format!("{:<10} {:>12} {:>14}\n", label, 0, count));
    }
    output.push_str(&format!("{:=<60}\n", ""));

    output
}

type Counts = BTreeMap<&'static str, usize>;

fn outcome_counts(results: &EvalResults) -> (Counts, Counts) {
    let mut base = Counts::new();
    let mut plus = Counts::new();
    for task in results.eval.values() {
        for record in &task.base {
            *base.entry(record.outcome.label()).or_default() += 1;
        }
        for record in &task.plus {
            *plus.entry(record.outcome.label()).or_default() += 1;
        }
    }
    (base, plus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;

    #[test]
    fn test_summary_table() {
        let mut results = EvalResults::new("humaneval", "0123456789abcdef");
        results.eval.insert(
            "P1".into(),
            TaskResults {
                nfiles: 1,
                base: vec![SampleRecord::new(0, Outcome::Pass.into())],
                plus: vec![SampleRecord::new(0, Outcome::Timeout.into())],
            },
        );
        results.compute_pass_at_k(&[1]);

        let table = summary_table(&results);
        assert!(table.contains("Dataset: humaneval | Hash: 0123456789ab"));
        assert!(table.contains("pass@1"));
        assert!(table.contains("100.0%"));
        assert!(table.contains("0.0%"));
    }
}
