//! Ground-truth computation
//!
//! Expected outputs come from running each problem's canonical solution
//! through the same sandbox as the candidates. The result for a dataset is
//! cached on disk under its content hash.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::dataset::{Oracle, Problem};
use crate::error::{EvalError, EvalResult};
use crate::program::{parse_recording, recorder_program};
use crate::sandbox::{ExecutionLimits, ProgramRunner};

/// Computes and caches oracles for a dataset
pub struct GroundTruth {
    runner: Arc<dyn ProgramRunner>,
    limits: ExecutionLimits,
    cache_dir: Option<PathBuf>,
    workers: usize,
}

impl GroundTruth {
    pub fn new(runner: Arc<dyn ProgramRunner>, limits: ExecutionLimits, workers: usize) -> Self {
        Self {
            runner,
            limits,
            cache_dir: None,
            workers: workers.max(1),
        }
    }

    /// Persist oracles under `dir`
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    fn cache_path(&self, dataset_hash: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.oracle.json", dataset_hash)))
    }

    /// Oracles for every problem, keyed by task id
    pub async fn compute(
        &self,
        problems: &[Arc<Problem>],
        dataset_hash: &str,
        cancel: &CancellationToken,
    ) -> EvalResult<HashMap<String, Oracle>> {
        let cache_path = self.cache_path(dataset_hash);
        if let Some(path) = &cache_path {
            if let Some(oracles) = load_cached(path, problems).await {
                tracing::info!("Loaded ground truth from {:?}", path);
                return Ok(oracles);
            }
        }

        tracing::info!("Computing ground truth for {} problems", problems.len());
        let start = std::time::Instant::now();

        let oracles: HashMap<String, Oracle> = stream::iter(problems.iter().cloned())
            .map(|problem| async move {
                let oracle = self.record(&problem, cancel).await?;
                Ok::<_, EvalError>((problem.task_id.clone(), oracle))
            })
            .buffer_unordered(self.workers)
            .try_collect()
            .await?;

        tracing::info!(
            "Computed ground truth in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        if let Some(path) = &cache_path {
            save_cached(path, &oracles).await?;
        }
        Ok(oracles)
    }

    async fn record(&self, problem: &Problem, cancel: &CancellationToken) -> EvalResult<Oracle> {
        let program = recorder_program(problem);
        let raw = self.runner.run(&program, &self.limits, cancel).await?;

        let failure = |message: String| EvalError::Oracle {
            task_id: problem.task_id.clone(),
            message,
        };

        if raw.cancelled {
            return Err(EvalError::Cancelled { completed: 0 });
        }
        if raw.timed_out {
            return Err(failure(format!(
                "canonical solution exceeded {:?}",
                self.limits.timeout
            )));
        }

        parse_recording(problem, &program.tag, &raw.stdout).map_err(|message| {
            match raw.last_stderr_line() {
                Some(line) => failure(format!("{} ({})", message, line)),
                None => failure(message),
            }
        })
    }
}

async fn load_cached(path: &Path, problems: &[Arc<Problem>]) -> Option<HashMap<String, Oracle>> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    let oracles: HashMap<String, Oracle> = match serde_json::from_str(&content) {
        Ok(oracles) => oracles,
        Err(e) => {
            tracing::warn!("Ignoring unreadable ground-truth cache {:?}: {}", path, e);
            return None;
        }
    };

    let complete = problems.iter().all(|p| {
        oracles.get(&p.task_id).is_some_and(|o| {
            o.base.len() == p.base_input.len() && o.plus.len() == p.plus_input.len()
        })
    });
    complete.then_some(oracles)
}

async fn save_cached(path: &Path, oracles: &HashMap<String, Oracle>) -> EvalResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EvalError::io(parent, e))?;
    }
    let json = serde_json::to_string(oracles)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| EvalError::io(path, e))?;
    tracing::debug!("Saved ground truth to {:?}", path);
    Ok(())
}
