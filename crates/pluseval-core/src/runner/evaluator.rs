//! End-to-end evaluation pipeline
//!
//! Validates samples against the dataset, computes ground truth, schedules
//! every unit and persists the grouped outcomes with their pass@k report.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{EvalConfig, EvalProgress, EvaluationUnit, GroundTruth, Scheduler, UnitOutcome};
use crate::cache::{JsonlCache, OutcomeCache};
use crate::dataset::{Oracle, Problem, Sample, dataset_hash};
use crate::error::{EvalError, EvalResult};
use crate::metrics::PassAtKReport;
use crate::program::TestMode;
use crate::report::{EvalResults, SampleRecord, TaskResults, results_path};
use crate::sandbox::{ProgramRunner, SandboxExecutor};

type SharedProgress = Arc<dyn Fn(EvalProgress) + Send + Sync>;

/// Result of [`Evaluator::evaluate`]
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Grouped outcomes as written to disk
    pub results: EvalResults,

    /// pass@k for the configured k values
    pub report: PassAtKReport,

    /// Location of the results file
    pub results_path: PathBuf,

    /// Loaded from an earlier run instead of executed
    pub reused: bool,
}

/// Runs a batch of samples against a dataset
pub struct Evaluator {
    config: EvalConfig,
    dataset: String,
    runner: Arc<dyn ProgramRunner>,
    progress: Option<SharedProgress>,
}

impl Evaluator {
    /// Create an evaluator executing programs with `config.interpreter`
    pub fn new(config: EvalConfig, dataset: impl Into<String>) -> Self {
        let runner = Arc::new(SandboxExecutor::new(config.interpreter.clone()));
        Self {
            config,
            dataset: dataset.into(),
            runner,
            progress: None,
        }
    }

    /// Replace the program runner
    pub fn with_runner(mut self, runner: Arc<dyn ProgramRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Set progress callback
    pub fn with_progress(mut self, callback: impl Fn(EvalProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate `samples` against `problems`
    ///
    /// Results are written next to `samples_path`. An existing results file
    /// is reused unless `force_rerun` is set.
    pub async fn evaluate(
        &self,
        problems: Vec<Problem>,
        samples: Vec<Sample>,
        samples_path: &Path,
        cancel: &CancellationToken,
    ) -> EvalResult<Evaluation> {
        let hash = dataset_hash(&problems);
        let grouped = group_samples(&problems, samples, self.config.allow_missing_tasks)?;
        let path = results_path(samples_path);

        if path.exists() && !self.config.force_rerun {
            return self.reuse(&path, &hash);
        }

        let problems: Vec<Arc<Problem>> = problems
            .into_iter()
            .filter(|p| grouped.contains_key(&p.task_id))
            .map(Arc::new)
            .collect();
        let sample_count: usize = grouped.values().map(Vec::len).sum();
        tracing::info!(
            dataset = %self.dataset,
            hash = %hash,
            tasks = problems.len(),
            samples = sample_count,
            "Starting evaluation"
        );

        let cache_dir = self.config.effective_cache_dir();
        let mut ground_truth = GroundTruth::new(
            Arc::clone(&self.runner),
            self.config.oracle_limits(),
            self.config.effective_parallel(),
        );
        if !self.config.no_cache {
            ground_truth = ground_truth.with_cache_dir(&cache_dir);
        }
        let oracles = ground_truth.compute(&problems, &hash, cancel).await?;

        let units = self.build_units(&problems, &grouped, oracles)?;

        let mut scheduler = Scheduler::from_config(Arc::clone(&self.runner), &self.config);
        if !self.config.no_cache {
            let cache = JsonlCache::open(outcome_cache_path(&cache_dir, &hash)).await?;
            tracing::debug!(entries = cache.len(), "Opened outcome cache {:?}", cache.path());
            scheduler = scheduler.with_cache(Arc::new(cache));
        }
        if let Some(progress) = &self.progress {
            let progress = Arc::clone(progress);
            scheduler = scheduler.with_progress(Box::new(move |update| progress(update)));
        }

        let outcomes = scheduler.run(units, cancel).await?;

        let mut results = EvalResults::new(&self.dataset, &hash);
        results.eval = group_outcomes(&grouped, outcomes);
        let report = results.compute_pass_at_k(&self.config.k_values);
        results.write(&path)?;

        Ok(Evaluation {
            results,
            report,
            results_path: path,
            reused: false,
        })
    }

    fn reuse(&self, path: &Path, hash: &str) -> EvalResult<Evaluation> {
        tracing::info!("Loading existing results from {:?}", path);
        let mut results = EvalResults::load(path)?;
        if results.hash != hash {
            tracing::warn!(
                expected = %hash,
                found = %results.hash,
                "Existing results were produced for a different dataset; rerun to refresh"
            );
        }
        let report = results.compute_pass_at_k(&self.config.k_values);
        Ok(Evaluation {
            results,
            report,
            results_path: path.to_path_buf(),
            reused: true,
        })
    }

    fn build_units(
        &self,
        problems: &[Arc<Problem>],
        grouped: &BTreeMap<String, Vec<Sample>>,
        mut oracles: HashMap<String, Oracle>,
    ) -> EvalResult<Vec<EvaluationUnit>> {
        let modes: &[TestMode] = if self.config.base_only {
            &[TestMode::Base]
        } else {
            &[TestMode::Base, TestMode::Full]
        };

        let mut units = Vec::new();
        for problem in problems {
            let oracle = oracles
                .remove(&problem.task_id)
                .map(Arc::new)
                .ok_or_else(|| EvalError::Oracle {
                    task_id: problem.task_id.clone(),
                    message: "no expected outputs recorded".to_string(),
                })?;
            let Some(samples) = grouped.get(&problem.task_id) else {
                continue;
            };

            for (index, sample) in samples.iter().enumerate() {
                for &mode in modes {
                    units.push(EvaluationUnit::build(
                        units.len(),
                        problem,
                        &oracle,
                        sample,
                        index,
                        mode,
                        self.config.policy,
                        &self.config,
                    ));
                }
            }
        }

        tracing::debug!(units = units.len(), "Built evaluation units");
        Ok(units)
    }
}

/// Outcome cache for one dataset version
///
/// Task ids are only unique within a dataset, so outcomes from datasets that
/// share ids but differ in tests or expected outputs must never mix.
fn outcome_cache_path(cache_dir: &Path, dataset_hash: &str) -> PathBuf {
    cache_dir.join(format!("{}.outcomes.jsonl", dataset_hash))
}

/// Group samples by task, ordered by their declared index
///
/// Positions within a task become the sample indices used everywhere else.
fn group_samples(
    problems: &[Problem],
    samples: Vec<Sample>,
    allow_missing: bool,
) -> EvalResult<BTreeMap<String, Vec<Sample>>> {
    let mut known = HashSet::with_capacity(problems.len());
    for problem in problems {
        if !known.insert(problem.task_id.as_str()) {
            return Err(EvalError::DuplicateTask(problem.task_id.clone()));
        }
    }

    let mut grouped: BTreeMap<String, Vec<(usize, Sample)>> = BTreeMap::new();
    for sample in samples {
        if !known.contains(sample.task_id.as_str()) {
            return Err(EvalError::UnknownTask(sample.task_id));
        }
        let entry = grouped.entry(sample.task_id.clone()).or_default();
        let order = sample.sample_index.unwrap_or(entry.len());
        entry.push((order, sample));
    }

    let missing: Vec<String> = problems
        .iter()
        .filter(|p| !grouped.contains_key(&p.task_id))
        .map(|p| p.task_id.clone())
        .collect();
    if !missing.is_empty() {
        if !allow_missing {
            return Err(EvalError::MissingSamples(missing));
        }
        tracing::warn!(count = missing.len(), "Skipping tasks without samples");
    }

    Ok(grouped
        .into_iter()
        .map(|(task_id, mut samples)| {
            samples.sort_by_key(|(order, _)| *order);
            let samples = samples
                .into_iter()
                .enumerate()
                .map(|(index, (_, sample))| sample.with_index(index))
                .collect();
            (task_id, samples)
        })
        .collect())
}

fn group_outcomes(
    grouped: &BTreeMap<String, Vec<Sample>>,
    outcomes: Vec<UnitOutcome>,
) -> BTreeMap<String, TaskResults> {
    let mut eval: BTreeMap<String, TaskResults> = grouped
        .iter()
        .map(|(task_id, samples)| {
            (
                task_id.clone(),
                TaskResults {
                    nfiles: samples.len(),
                    ..Default::default()
                },
            )
        })
        .collect();

    for outcome in outcomes {
        let Some(task) = eval.get_mut(&outcome.task_id) else {
            continue;
        };
        let record = SampleRecord::new(outcome.sample_index, outcome.record);
        match outcome.mode {
            TestMode::Base => task.base.push(record),
            TestMode::Full => task.plus.push(record),
        }
    }

    for task in eval.values_mut() {
        task.base.sort_by_key(|r| r.sample_index);
        task.plus.sort_by_key(|r| r.sample_index);
    }
    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Outcome, classify};
    use crate::program::{RunPolicy, TestProgram};
    use crate::error::ExecError;
    use crate::sandbox::{ExecutionLimits, RawExecutionResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Records every input with output "0"; candidates subtracting fail
    #[derive(Default)]
    struct ScriptedRunner {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl ProgramRunner for ScriptedRunner {
        async fn run(
            &self,
            program: &TestProgram,
            _limits: &ExecutionLimits,
            _cancel: &CancellationToken,
        ) -> Result<RawExecutionResult, ExecError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let tag = &program.tag;
            let mut stdout = String::new();
            let mut exit_code = 0;

            if program.policy == RunPolicy::Exhaustive {
                for index in 0..program.test_count() {
                    stdout.push_str(&format!(
                        "{tag} output {{\"index\": {index}, \"value\": \"0\", \"time\": 0.001}}\n"
                    ));
                }
            } else if program.source.contains("a - b") {
                stdout.push_str(&format!("{tag} fail 0\n"));
                exit_code = 1;
            }
            if exit_code == 0 {
                stdout.push_str(&format!("{tag} done\n"));
            }

            Ok(RawExecutionResult {
                exit_code: Some(exit_code),
                stdout,
                ..Default::default()
            })
        }
    }

    fn problems() -> Vec<Problem> {
        vec![
            Problem::new("P1", "add", "def add(a, b):\n", "    return a + b\n")
                .with_base_input(vec![vec![json!(1), json!(2)]])
                .with_plus_input(vec![vec![json!(-1), json!(1)]]),
            Problem::new("P2", "sub", "def sub(a, b):\n", "    return a - b\n")
                .with_base_input(vec![vec![json!(5), json!(5)]]),
        ]
    }

    fn config(dir: &Path) -> EvalConfig {
        EvalConfig::default()
            .with_cache_dir(dir.join("cache"))
            .with_parallel(2)
    }

    #[tokio::test]
    async fn test_evaluate_and_reuse_results() {
        let dir = TempDir::new().unwrap();
        let samples_path = dir.path().join("samples.jsonl");
        let runner = Arc::new(ScriptedRunner::default());

        let samples = vec![
            Sample::new("P1", "    return a + b\n"),
            Sample::new("P1", "    return a - b\n"),
            Sample::new("P2", "    return 0\n"),
        ];
        let evaluator = Evaluator::new(config(dir.path()), "toy").with_runner(runner.clone());

        let cancel = CancellationToken::new();
        let evaluation = evaluator
            .evaluate(problems(), samples.clone(), &samples_path, &cancel)
            .await
            .unwrap();

        assert!(!evaluation.reused);
        assert_eq!(evaluation.results_path, dir.path().join("samples_eval_results.json"));
        let p1 = &evaluation.results.eval["P1"];
        assert_eq!(p1.nfiles, 2);
        assert_eq!(p1.base[0].outcome, Outcome::Pass);
        assert_eq!(p1.base[1].outcome, Outcome::Fail(0));
        assert_eq!(p1.plus.len(), 2);
        assert_eq!(evaluation.report.base_at(1), Some(0.75));
        assert!(evaluation.report.base_at(10).is_none());

        // 2 recorders + 3 samples x 2 modes
        assert_eq!(runner.runs.load(Ordering::SeqCst), 8);

        let again = evaluator
            .evaluate(problems(), samples, &samples_path, &cancel)
            .await
            .unwrap();
        assert!(again.reused);
        assert_eq!(again.results.eval, evaluation.results.eval);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_force_rerun_executes_again_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let samples_path = dir.path().join("samples.jsonl");
        let runner = Arc::new(ScriptedRunner::default());
        let samples = vec![Sample::new("P1", "    return a + b\n"), Sample::new("P2", "    return 0\n")];

        let first = Evaluator::new(config(dir.path()), "toy").with_runner(runner.clone());
        first
            .evaluate(problems(), samples.clone(), &samples_path, &CancellationToken::new())
            .await
            .unwrap();
        let runs = runner.runs.load(Ordering::SeqCst);

        let mut rerun_config = config(dir.path());
        rerun_config.force_rerun = true;
        let rerun = Evaluator::new(rerun_config, "toy").with_runner(runner.clone());
        let evaluation = rerun
            .evaluate(problems(), samples, &samples_path, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!evaluation.reused);
        assert!(dir.path().join("samples_eval_results.json.bak").exists());
        // ground truth is read back from disk; units run again under force_rerun
        assert_eq!(runner.runs.load(Ordering::SeqCst), runs + 4);
    }

    #[tokio::test]
    async fn test_base_only_skips_full_units() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::default());
        let evaluator = Evaluator::new(config(dir.path()).base_only(), "toy").with_runner(runner.clone());

        let evaluation = evaluator
            .evaluate(
                problems(),
                vec![Sample::new("P1", "    return a + b\n"), Sample::new("P2", "    return 0\n")],
                &dir.path().join("samples.jsonl"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(evaluation.results.eval["P1"].plus.is_empty());
        assert!(evaluation.report.plus.is_none());
        assert_eq!(runner.runs.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_outcome_cache_is_scoped_to_dataset() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::default());
        let evaluator = Evaluator::new(config(dir.path()), "toy").with_runner(runner.clone());
        let cancel = CancellationToken::new();

        let v1 = vec![
            Problem::new("P1", "add", "def add(a, b):\n", "    return a + b\n")
                .with_base_input(vec![vec![json!(1), json!(2)]])
                .with_plus_input(vec![vec![json!(1), json!(1)]]),
        ];
        let mut v2 = v1.clone();
        v2[0].plus_input.push(vec![json!(20), json!(1)]);
        let samples = vec![Sample::new("P1", "    return a + b if a < 10 else 0\n")];

        evaluator
            .evaluate(v1.clone(), samples.clone(), &dir.path().join("v1.jsonl"), &cancel)
            .await
            .unwrap();
        // recorder + base + full
        assert_eq!(runner.runs.load(Ordering::SeqCst), 3);

        // same task id and sample, different plus tests: nothing may be reused
        let second = evaluator
            .evaluate(v2.clone(), samples.clone(), &dir.path().join("v2.jsonl"), &cancel)
            .await
            .unwrap();
        assert!(!second.reused);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 6);

        // the first dataset still hits its own cache
        evaluator
            .evaluate(v1.clone(), samples, &dir.path().join("v1-again.jsonl"), &cancel)
            .await
            .unwrap();
        assert_eq!(runner.runs.load(Ordering::SeqCst), 6);

        let cache_dir = dir.path().join("cache");
        assert!(outcome_cache_path(&cache_dir, &dataset_hash(&v1)).exists());
        assert!(outcome_cache_path(&cache_dir, &dataset_hash(&v2)).exists());
        assert!(!cache_dir.join("outcomes.jsonl").exists());
    }

    #[test]
    fn test_group_samples_validation() {
        let unknown = group_samples(&problems(), vec![Sample::new("P9", "")], false).unwrap_err();
        assert!(matches!(unknown, EvalError::UnknownTask(id) if id == "P9"));

        let missing = group_samples(&problems(), vec![Sample::new("P1", "")], false).unwrap_err();
        assert!(matches!(missing, EvalError::MissingSamples(ids) if ids == vec!["P2".to_string()]));

        let grouped = group_samples(&problems(), vec![Sample::new("P1", "")], true).unwrap();
        assert_eq!(grouped.len(), 1);

        let mut duplicated = problems();
        duplicated.push(duplicated[0].clone());
        let duplicate = group_samples(&duplicated, vec![], true).unwrap_err();
        assert!(matches!(duplicate, EvalError::DuplicateTask(id) if id == "P1"));
    }

    #[test]
    fn test_group_samples_orders_by_declared_index() {
        let samples = vec![
            Sample::new("P1", "second").with_index(7),
            Sample::new("P1", "first").with_index(3),
        ];
        let grouped = group_samples(&problems(), samples, true).unwrap();
        let p1 = &grouped["P1"];
        assert_eq!(p1[0].completion, "first");
        assert_eq!(p1[0].sample_index, Some(0));
        assert_eq!(p1[1].sample_index, Some(1));
    }

    fn has_python() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    #[tokio::test]
    async fn test_python_outcomes() {
        if !has_python() {
            eprintln!("python3 not found, skipping");
            return;
        }

        let dir = TempDir::new().unwrap();
        let problem = Problem::new("P1", "add", "def add(a, b):\n", "    return a + b\n")
            .with_base_input(vec![vec![json!(1), json!(2)], vec![json!(3), json!(4)]])
            .with_plus_input(vec![vec![json!(-1), json!(1)]]);
        let samples = vec![
            Sample::new("P1", "    return a + b\n"),
            Sample::new("P1", "    return a - b\n"),
            Sample::new("P1", "    return a +\n"),
            Sample::new("P1", "    while True:\n        pass\n"),
        ];

        let mut config = config(dir.path())
            .with_timeout(Duration::from_secs(2))
            .with_policy(RunPolicy::Exhaustive);
        config.no_cache = true;
        let evaluator = Evaluator::new(config, "toy");

        let evaluation = evaluator
            .evaluate(vec![problem], samples, dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        let p1 = &evaluation.results.eval["P1"];
        assert_eq!(p1.base[0].outcome, Outcome::Pass);
        assert_eq!(p1.base[1].outcome, Outcome::Fail(0));
        assert_eq!(p1.base[1].per_test, Some(vec![false, false]));
        assert!(matches!(p1.base[2].outcome, Outcome::Error(_)));
        assert_eq!(p1.base[3].outcome, Outcome::Timeout);
        assert_eq!(p1.plus[0].outcome, Outcome::Pass);
        assert_eq!(evaluation.results_path, dir.path().join("eval_results.json"));
        assert_eq!(evaluation.report.base_at(1), Some(0.25));
    }

    #[tokio::test]
    async fn test_python_policies_agree() {
        if !has_python() {
            eprintln!("python3 not found, skipping");
            return;
        }

        let problem = || {
            Problem::new("P1", "add", "def add(a, b):\n", "    return a + b\n")
                .with_base_input(vec![vec![json!(1), json!(2)], vec![json!(3), json!(4)]])
                .with_plus_input(vec![vec![json!(-1), json!(1)]])
        };
        let samples = vec![
            Sample::new("P1", "    return a + b\n"),
            Sample::new("P1", "    return a - b\n"),
            Sample::new("P1", "    return a +\n"),
            Sample::new("P1", "    return a + b if a > 1 else 0\n"),
            Sample::new("P1", "    return a + b if a < 3 else 0\n"),
            Sample::new("P1", "    while True:\n        pass\n"),
        ];

        let mut base = Vec::new();
        for policy in [RunPolicy::FailFast, RunPolicy::Exhaustive] {
            let dir = TempDir::new().unwrap();
            let mut config = config(dir.path())
                .with_timeout(Duration::from_secs(2))
                .with_policy(policy);
            config.no_cache = true;
            let evaluation = Evaluator::new(config, "toy")
                .evaluate(vec![problem()], samples.clone(), dir.path(), &CancellationToken::new())
                .await
                .unwrap();
            base.push(evaluation.results.eval["P1"].base.clone());
        }
        let (fail_fast, exhaustive) = (&base[0], &base[1]);

        assert_eq!(fail_fast[0].outcome, Outcome::Pass);
        assert_eq!(fail_fast[1].outcome, Outcome::Fail(0));
        assert!(matches!(fail_fast[2].outcome, Outcome::Error(_)));
        assert_eq!(fail_fast[3].outcome, Outcome::Fail(0));
        assert_eq!(fail_fast[4].outcome, Outcome::Fail(1));
        assert_eq!(fail_fast[5].outcome, Outcome::Timeout);

        assert_eq!(exhaustive[3].per_test, Some(vec![false, true]));
        assert_eq!(exhaustive[4].per_test, Some(vec![true, false]));

        for (ff, ex) in fail_fast.iter().zip(exhaustive) {
            match (&ff.outcome, &ex.outcome) {
                (Outcome::Error(_), Outcome::Error(_)) => {}
                (Outcome::Fail(i), Outcome::Fail(j)) => {
                    assert_eq!(i, j);
                    let first_false = ex
                        .per_test
                        .as_ref()
                        .and_then(|v| v.iter().position(|passed| !passed));
                    assert_eq!(first_false, Some(*i));
                }
                (a, b) => assert_eq!(a, b),
            }
        }
    }

    #[tokio::test]
    async fn test_python_outputs_compare_as_json() {
        if !has_python() {
            eprintln!("python3 not found, skipping");
            return;
        }

        let dir = TempDir::new().unwrap();
        let problem = Problem::new("P1", "pair", "def pair(a, b):\n", "    return (a, {1: b})\n")
            .with_base_input(vec![vec![json!(1), json!(2)]]);
        let samples = vec![
            Sample::new("P1", "    return [a, {\"1\": b}]\n"),
            Sample::new("P1", "    return [b, {1: a}]\n"),
        ];
        let mut config = config(dir.path()).base_only();
        config.no_cache = true;

        let evaluation = Evaluator::new(config, "toy")
            .evaluate(vec![problem], samples, dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        // tuples equal lists and int keys equal their string form
        let base = &evaluation.results.eval["P1"].base;
        assert_eq!(base[0].outcome, Outcome::Pass);
        assert_eq!(base[1].outcome, Outcome::Fail(0));
    }

    #[tokio::test]
    async fn test_python_infinite_loop_times_out_promptly() {
        if !has_python() {
            eprintln!("python3 not found, skipping");
            return;
        }

        let config = EvalConfig::default().with_timeout(Duration::from_secs(1));
        let runner: Arc<dyn ProgramRunner> = Arc::new(SandboxExecutor::new("python3"));
        let cancel = CancellationToken::new();
        let problem = Arc::new(
            Problem::new("P1", "add", "def add(a, b):\n", "    return a + b\n")
                .with_base_input(vec![vec![json!(1), json!(2)]]),
        );
        let mut oracles = GroundTruth::new(Arc::clone(&runner), config.oracle_limits(), 1)
            .compute(std::slice::from_ref(&problem), "loop", &cancel)
            .await
            .unwrap();
        let oracle = Arc::new(oracles.remove("P1").unwrap());

        for policy in [RunPolicy::FailFast, RunPolicy::Exhaustive] {
            let unit = EvaluationUnit::build(
                0,
                &problem,
                &oracle,
                &Sample::new("P1", "    while True:\n        pass\n"),
                0,
                TestMode::Base,
                policy,
                &config,
            );
            let program = unit.program();

            let start = std::time::Instant::now();
            let raw = runner.run(&program, &unit.limits, &cancel).await.unwrap();
            let elapsed = start.elapsed();

            assert_eq!(classify(&program, &raw).outcome, Outcome::Timeout);
            assert!(elapsed >= unit.limits.timeout);
            assert!(
                elapsed < unit.limits.timeout + Duration::from_secs(2),
                "took {elapsed:?} for a {:?} deadline",
                unit.limits.timeout
            );
        }
    }
}
