//! Sandboxed evaluation engine for code-generation benchmarks
//!
//! This crate executes machine-generated completions against base and
//! extended test batteries and aggregates the outcomes into unbiased
//! pass@k statistics.
//!
//! # Features
//!
//! - **Test Program Assembly**: Builds a self-contained Python program from a
//!   problem, a candidate completion and its test inputs
//! - **Sandbox Execution**: One process group per program with wall-clock,
//!   memory and output limits
//! - **Outcome Classification**: Pass, Fail, Error, Timeout and Crash
//! - **Parallel Scheduling**: Bounded worker pool with a resumable result cache
//! - **pass@k Estimation**: Numerically stable unbiased estimator
//!
//! # Example
//!
//! ```rust,ignore
//! use std::path::Path;
//! use pluseval_core::{DatasetLoader, EvalConfig, Evaluator};
//! use tokio_util::sync::CancellationToken;
//!
//! let problems = DatasetLoader::load_problems("humaneval_plus.jsonl")?;
//! let samples = DatasetLoader::load_samples("samples.jsonl")?;
//! let evaluator = Evaluator::new(EvalConfig::default(), "humaneval");
//! let evaluation = evaluator
//!     .evaluate(problems, samples, Path::new("samples.jsonl"), &CancellationToken::new())
//!     .await?;
//! println!("{:?}", evaluation.report);
//! ```

pub mod cache;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod program;
pub mod report;
pub mod runner;
pub mod sandbox;

// Re-exports for convenience
pub use cache::{CacheKey, JsonlCache, MemoryCache, OutcomeCache};
pub use dataset::{DatasetLoader, Oracle, Problem, Sample};
pub use error::{EvalError, EvalResult, ExecError};
pub use metrics::{PassAtKReport, TaskTally, estimate_pass_at_k};
pub use outcome::{Outcome, OutcomeRecord, classify};
pub use program::{RunPolicy, TestMode, TestProgram, assemble};
pub use report::{EvalResults, diff_failures, failed_tasks};
pub use runner::{EvalConfig, Evaluation, EvaluationUnit, Evaluator, GroundTruth, Scheduler};
pub use sandbox::{ExecutionLimits, ProgramRunner, RawExecutionResult, SandboxExecutor};
