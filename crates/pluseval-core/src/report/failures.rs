//! Failure listing and comparison between runs

use std::collections::BTreeSet;

use serde::Serialize;

use super::EvalResults;

/// Task ids whose first sample failed base or base + extra tests
pub fn failed_tasks(results: &EvalResults) -> BTreeSet<String> {
    results
        .eval
        .iter()
        .filter(|(_, task)| {
            let base_failed = task.base.first().is_some_and(|r| !r.is_pass());
            let plus_failed = task.plus.first().is_some_and(|r| !r.is_pass());
            base_failed || plus_failed
        })
        .map(|(task_id, _)| task_id.clone())
        .collect()
}

/// Failures present in only one of two runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureDiff {
    /// Failed in the first run but not the second
    pub only_first: Vec<String>,
    /// Failed in the second run but not the first
    pub only_second: Vec<String>,
}

/// Compare the failure sets of two runs
pub fn diff_failures(first: &EvalResults, second: &EvalResults) -> FailureDiff {
    let a = failed_tasks(first);
    let b = failed_tasks(second);
    FailureDiff {
        only_first: a.difference(&b).cloned().collect(),
        only_second: b.difference(&a).cloned().collect(),
    }
}
