//! Unbiased pass@k estimator

use serde::{Deserialize, Serialize};

use super::TaskTally;

/// Estimate pass@k for one task with `n` samples of which `c` are correct
///
/// `pass@k = 1 - C(n-c, k) / C(n, k)`, evaluated as the product
/// `prod_{i=1..k} (n-c-k+i) / (n-k+i)` so that large `n` never overflows.
/// Returns 1.0 when fewer than `k` samples are incorrect.
pub fn estimate_pass_at_k(n: usize, c: usize, k: usize) -> f64 {
    if n.saturating_sub(c) < k {
        return 1.0;
    }
    1.0 - (1..=k).fold(1.0_f64, |acc, i| {
        acc * (n - c - k + i) as f64 / (n - k + i) as f64
    })
}

/// Mean pass@k over tasks, or `None` when some task has fewer than `k` samples
pub fn mean_pass_at_k(tallies: &[TaskTally], k: usize) -> Option<f64> {
    if k == 0 || tallies.is_empty() || tallies.iter().any(|t| t.n < k) {
        return None;
    }
    let sum: f64 = tallies.iter().map(|t| estimate_pass_at_k(t.n, t.c, k)).sum();
    Some(sum / tallies.len() as f64)
}

/// One reported pass@k value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassAtK {
    pub k: usize,
    pub value: f64,
}

impl PassAtK {
    /// Format as percentage string
    pub fn as_percentage(&self) -> String {
        format!("{:.1}%", self.value * 100.0)
    }
}

/// pass@k for the base and the base+extra test batteries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassAtKReport {
    /// Number of tasks aggregated
    pub tasks: usize,

    /// Results on base tests
    pub base: Vec<PassAtK>,

    /// Results on base + extra tests, absent for base-only runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus: Option<Vec<PassAtK>>,
}

impl PassAtKReport {
    /// Compute the report; a `k` is skipped when any task has fewer samples
    pub fn compute(base: &[TaskTally], plus: Option<&[TaskTally]>, ks: &[usize]) -> Self {
        let over = |tallies: &[TaskTally]| -> Vec<PassAtK> {
            ks.iter()
                .filter_map(|&k| mean_pass_at_k(tallies, k).map(|value| PassAtK { k, value }))
                .collect()
        };

        let skipped: Vec<usize> = ks
            .iter()
            .copied()
            .filter(|&k| mean_pass_at_k(base, k).is_none())
            .collect();
        if !skipped.is_empty() {
            tracing::info!("Skipping pass@k for k = {:?}: not enough samples per task", skipped);
        }

        Self {
            tasks: base.len(),
            base: over(base),
            plus: plus.map(over),
        }
    }

    /// Value for `k` on base tests
    pub fn base_at(&self, k: usize) -> Option<f64> {
        self.base.iter().find(|p| p.k == k).map(|p| p.value)
    }

    /// Value for `k` on base + extra tests
    pub fn plus_at(&self, k: usize) -> Option<f64> {
        self.plus
            .as_ref()?
            .iter()
            .find(|p| p.k == k)
            .map(|p| p.value)
    }
}
