//! Parallel scheduler
//!
//! Runs evaluation units on a bounded pool. Each unit gets its own tokio
//! task holding a semaphore permit while it executes, so one misbehaving
//! unit can neither block nor take down the others.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{EvalConfig, EvalProgress, EvaluationUnit, ProgressCallback};
use crate::cache::{CacheKey, OutcomeCache};
use crate::error::{EvalError, EvalResult};
use crate::outcome::{Outcome, OutcomeRecord, classify};
use crate::program::TestMode;
use crate::sandbox::ProgramRunner;

/// Outcome of one unit as returned by [`Scheduler::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub unit_id: usize,
    pub task_id: String,
    pub sample_index: usize,
    pub mode: TestMode,
    pub record: OutcomeRecord,
    /// Answered from the cache without executing
    pub cached: bool,
}

/// What the collector needs to know about a unit once it is in flight
struct UnitMeta {
    id: usize,
    task_id: String,
    sample_index: usize,
    mode: TestMode,
    key: CacheKey,
    label: String,
}

impl UnitMeta {
    fn of(unit: &EvaluationUnit) -> Self {
        Self {
            id: unit.id,
            task_id: unit.task_id.clone(),
            sample_index: unit.sample_index,
            mode: unit.mode,
            key: unit.key.clone(),
            label: unit.label(),
        }
    }

    fn finish(self, record: OutcomeRecord, cached: bool) -> UnitOutcome {
        UnitOutcome {
            unit_id: self.id,
            task_id: self.task_id,
            sample_index: self.sample_index,
            mode: self.mode,
            record,
            cached,
        }
    }
}

/// Bounded, cache-aware worker pool over evaluation units
pub struct Scheduler {
    runner: Arc<dyn ProgramRunner>,
    cache: Option<Arc<dyn OutcomeCache>>,
    workers: usize,
    max_retries: u32,
    retry_backoff: Duration,
    force_rerun: bool,
    stall_interval: Duration,
    progress: Option<ProgressCallback>,
}

impl Scheduler {
    /// Create a scheduler with `workers` concurrent units
    pub fn new(runner: Arc<dyn ProgramRunner>, workers: usize) -> Self {
        Self {
            runner,
            cache: None,
            workers: workers.max(1),
            max_retries: 2,
            retry_backoff: Duration::from_millis(200),
            force_rerun: false,
            stall_interval: Duration::from_secs(10),
            progress: None,
        }
    }

    /// Create a scheduler with the pool settings of `config`
    pub fn from_config(runner: Arc<dyn ProgramRunner>, config: &EvalConfig) -> Self {
        Self::new(runner, config.effective_parallel())
            .with_retries(config.max_retries, config.retry_backoff)
            .force_rerun(config.force_rerun)
            .with_stall_interval(config.stall_interval)
    }

    /// Consult and fill `cache`
    pub fn with_cache(mut self, cache: Arc<dyn OutcomeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set retry budget for infrastructure failures
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// Skip cache lookups (results are still written)
    pub fn force_rerun(mut self, force: bool) -> Self {
        self.force_rerun = force;
        self
    }

    /// Set the stall watchdog interval
    pub fn with_stall_interval(mut self, interval: Duration) -> Self {
        self.stall_interval = interval.max(Duration::from_millis(10));
        self
    }

    /// Set progress callback
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Run every unit and return their outcomes ordered by unit id
    ///
    /// On cancellation no further units start, running ones are killed and
    /// `EvalError::Cancelled` reports how many units had completed.
    pub async fn run(
        &self,
        units: Vec<EvaluationUnit>,
        cancel: &CancellationToken,
    ) -> EvalResult<Vec<UnitOutcome>> {
        let total = units.len();
        let mut finished: Vec<UnitOutcome> = Vec::with_capacity(total);
        let mut cached = 0usize;
        let mut pending = Vec::with_capacity(total);

        for unit in units {
            if let (false, Some(cache)) = (self.force_rerun, &self.cache) {
                if let Some(record) = cache.get(&unit.key).await? {
                    cached += 1;
                    let meta = UnitMeta::of(&unit);
                    self.emit(finished.len() + 1, total, cached, &meta.label, &record.outcome);
                    finished.push(meta.finish(record, true));
                    continue;
                }
            }
            pending.push(unit);
        }

        if cached > 0 {
            tracing::info!(cached, total, "Reusing cached outcomes");
        }
        tracing::debug!(pending = pending.len(), workers = self.workers, "Dispatching units");

        let run_cancel = cancel.child_token();
        let _stop_on_drop = run_cancel.clone().drop_guard();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let in_flight: Arc<DashMap<usize, String>> = Arc::new(DashMap::new());
        let mut tasks = FuturesUnordered::new();

        for unit in pending {
            let meta = UnitMeta::of(&unit);
            in_flight.insert(meta.id, meta.label.clone());

            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&semaphore);
            let cancel = run_cancel.clone();
            let max_retries = self.max_retries;
            let backoff = self.retry_backoff;

            let handle = tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return None;
                };

                let attempt = run_unit(runner.as_ref(), &unit, max_retries, backoff, &cancel);
                match AssertUnwindSafe(attempt).catch_unwind().await {
                    Ok(record) => record,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(unit = %unit.label(), "Unit panicked: {}", message);
                        Some(Outcome::Error(format!("evaluation panicked: {}", message)).into())
                    }
                }
            });
            tasks.push(async move { (meta, handle.await) });
        }

        let mut watchdog = tokio::time::interval(self.stall_interval);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        watchdog.tick().await;
        let mut last_completion = Instant::now();

        loop {
            tokio::select! {
                next = tasks.next() => {
                    let Some((meta, joined)) = next else {
                        break;
                    };
                    in_flight.remove(&meta.id);

                    let record = match joined {
                        Ok(Some(record)) => record,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::error!(unit = %meta.label, "Unit task failed: {}", e);
                            Outcome::Error(format!("evaluation task failed: {}", e)).into()
                        }
                    };
                    last_completion = Instant::now();

                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(meta.key.clone(), record.clone()).await {
                            run_cancel.cancel();
                            return Err(e);
                        }
                    }

                    self.emit(finished.len() + 1, total, cached, &meta.label, &record.outcome);
                    finished.push(meta.finish(record, false));
                }
                _ = watchdog.tick() => {
                    let idle = last_completion.elapsed();
                    if idle >= self.stall_interval && !in_flight.is_empty() {
                        let stuck: Vec<String> = in_flight
                            .iter()
                            .take(8)
                            .map(|entry| entry.value().clone())
                            .collect();
                        tracing::warn!(
                            pending = in_flight.len(),
                            idle_secs = idle.as_secs(),
                            "No unit finished recently; still running: {}",
                            stuck.join(", ")
                        );
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(EvalError::Cancelled {
                completed: finished.len(),
            });
        }

        finished.sort_by_key(|outcome| outcome.unit_id);
        Ok(finished)
    }

    fn emit(&self, completed: usize, total: usize, cached: usize, unit: &str, outcome: &Outcome) {
        if let Some(callback) = &self.progress {
            callback(EvalProgress {
                completed,
                total,
                cached,
                unit: unit.to_string(),
                outcome: outcome.clone(),
            });
        }
    }
}

/// Execute one unit, retrying infrastructure failures
///
/// The program is assembled here, under the worker's permit, and dropped
/// when the unit finishes. Returns `None` when the unit was cancelled.
async fn run_unit(
    runner: &dyn ProgramRunner,
    unit: &EvaluationUnit,
    max_retries: u32,
    backoff: Duration,
    cancel: &CancellationToken,
) -> Option<OutcomeRecord> {
    if cancel.is_cancelled() {
        return None;
    }
    let program = unit.program();

    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        match runner.run(&program, &unit.limits, cancel).await {
            Ok(raw) if raw.cancelled => return None,
            Ok(raw) => {
                let record = classify(&program, &raw);
                tracing::debug!(
                    unit = %unit.label(),
                    outcome = %record.outcome,
                    elapsed_ms = raw.elapsed.as_millis() as u64,
                    "Unit finished"
                );
                return Some(record);
            }
            Err(e) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(unit = %unit.label(), attempt, error = %e, "Infrastructure failure, retrying");
                tokio::select! {
                    _ = tokio::time::sleep(backoff * attempt) => {}
                    _ = cancel.cancelled() => return None,
                }
            }
            Err(e) => {
                tracing::error!(unit = %unit.label(), error = %e, "Infrastructure failure, giving up");
                return Some(
                    Outcome::Error(format!(
                        "infrastructure failure after {} attempt(s): {}",
                        attempt + 1,
                        e
                    ))
                    .into(),
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
