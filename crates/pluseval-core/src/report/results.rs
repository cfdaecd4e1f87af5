//! Persisted evaluation results

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};
use crate::metrics::{PassAtKReport, TaskTally, tally_by_task};
use crate::outcome::{Outcome, OutcomeRecord};

/// Outcome of one sample on one test battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub sample_index: usize,

    pub outcome: Outcome,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_test: Option<Vec<bool>>,
}

impl SampleRecord {
    pub fn new(sample_index: usize, record: OutcomeRecord) -> Self {
        Self {
            sample_index,
            outcome: record.outcome,
            per_test: record.per_test,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.outcome.is_pass()
    }
}

/// Per-task outcome lists, ordered by sample index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResults {
    /// Number of samples evaluated
    pub nfiles: usize,

    /// Outcomes on base tests
    pub base: Vec<SampleRecord>,

    /// Outcomes on base + extra tests (empty for base-only runs)
    #[serde(default)]
    pub plus: Vec<SampleRecord>,
}

impl TaskResults {
    /// Whether the sample at `position` is correct on base + extra tests
    ///
    /// A sample only counts when it passes both the base and the full run.
    pub fn plus_pass(&self, position: usize) -> bool {
        let base = self.base.get(position).is_some_and(SampleRecord::is_pass);
        let plus = self.plus.get(position).is_some_and(SampleRecord::is_pass);
        base && plus
    }
}

/// Contents of an `eval_results.json` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResults {
    /// When the run finished
    pub date: DateTime<Utc>,

    /// Dataset name
    pub dataset: String,

    /// Dataset content hash
    pub hash: String,

    /// Results keyed by task id
    pub eval: BTreeMap<String, TaskResults>,

    /// Aggregated pass@k
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_at_k: Option<PassAtKReport>,
}

impl EvalResults {
    pub fn new(dataset: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            date: Utc::now(),
            dataset: dataset.into(),
            hash: hash.into(),
            eval: BTreeMap::new(),
            pass_at_k: None,
        }
    }

    /// Whether any task carries base + extra results
    pub fn has_plus(&self) -> bool {
        self.eval.values().any(|task| !task.plus.is_empty())
    }

    /// Per-task tallies for base tests
    pub fn base_tallies(&self) -> Vec<TaskTally> {
        tally_by_task(self.eval.iter().flat_map(|(task_id, task)| {
            task.base.iter().map(move |r| (task_id.as_str(), r.is_pass()))
        }))
    }

    /// Per-task tallies for base + extra tests
    pub fn plus_tallies(&self) -> Vec<TaskTally> {
        tally_by_task(self.eval.iter().flat_map(|(task_id, task)| {
            (0..task.plus.len()).map(move |i| (task_id.as_str(), task.plus_pass(i)))
        }))
    }

    /// Compute and store the pass@k report
    pub fn compute_pass_at_k(&mut self, ks: &[usize]) -> PassAtKReport {
        let base = self.base_tallies();
        let plus = self.has_plus().then(|| self.plus_tallies());
        let report = PassAtKReport::compute(&base, plus.as_deref(), ks);
        self.pass_at_k = Some(report.clone());
        report
    }

    /// Load a results file
    pub fn load(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the results, moving an existing file aside first
    ///
    /// Returns the backup path when a previous file was preserved.
    pub fn write(&self, path: impl AsRef<Path>) -> EvalResult<Option<PathBuf>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }

        let backup = if path.exists() {
            let backup = backup_path(path);
            std::fs::rename(path, &backup).map_err(|e| EvalError::io(path, e))?;
            tracing::info!("Backed up previous results to {:?}", backup);
            Some(backup)
        } else {
            None
        };

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| EvalError::io(path, e))?;
        tracing::info!("Saved evaluation results to {:?}", path);
        Ok(backup)
    }
}

/// Where results for a samples file or directory are written
///
/// `samples.jsonl` gives `samples_eval_results.json` beside it; a sample
/// directory gets `eval_results.json` inside it.
pub fn results_path(samples: &Path) -> PathBuf {
    if samples.is_dir() {
        return samples.join("eval_results.json");
    }
    let stem = samples
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "samples".to_string());
    samples.with_file_name(format!("{}_eval_results.json", stem))
}

/// First unused `<path>.bak`, `<path>.bak.bak`, ...
pub fn backup_path(path: &Path) -> PathBuf {
    let mut candidate = path.as_os_str().to_owned();
    loop {
        candidate.push(".bak");
        let backup = PathBuf::from(&candidate);
        if !backup.exists() {
            return backup;
        }
    }
}
