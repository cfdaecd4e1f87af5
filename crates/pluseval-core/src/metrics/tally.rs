//! Per-task sample counts

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Samples evaluated (`n`) and passing (`c`) for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTally {
    pub task_id: String,
    pub n: usize,
    pub c: usize,
}

impl TaskTally {
    pub fn new(task_id: impl Into<String>, n: usize, c: usize) -> Self {
        Self {
            task_id: task_id.into(),
            n,
            c,
        }
    }

    /// Add one evaluated sample
    pub fn record(&mut self, passed: bool) {
        self.n += 1;
        if passed {
            self.c += 1;
        }
    }
}

/// Fold `(task_id, passed)` pairs into tallies ordered by task id
///
/// The result does not depend on the order of the input.
pub fn tally_by_task<'a, I>(outcomes: I) -> Vec<TaskTally>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let mut tallies: BTreeMap<&str, TaskTally> = BTreeMap::new();
    for (task_id, passed) in outcomes {
        tallies
            .entry(task_id)
            .or_insert_with(|| TaskTally::new(task_id, 0, 0))
            .record(passed);
    }
    tallies.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_is_order_independent() {
        let forward = vec![("a", true), ("b", false), ("a", false), ("a", true)];
        let mut backward = forward.clone();
        backward.reverse();

        let expected = vec![TaskTally::new("a", 3, 2), TaskTally::new("b", 1, 0)];
        assert_eq!(tally_by_task(forward), expected);
        assert_eq!(tally_by_task(backward), expected);
    }
}
