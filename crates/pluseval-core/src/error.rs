//! Error types for the evaluation engine
//!
//! Two layers are kept apart: [`ExecError`] is an infrastructure failure
//! (the unit could not be run at all) and is the only error the scheduler
//! retries. [`EvalError`] covers everything that can abort a pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Infrastructure failure while trying to execute one program
#[derive(Debug, Error)]
pub enum ExecError {
    /// Per-unit working directory could not be created
    #[error("Failed to create sandbox workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// Program text could not be written into the workspace
    #[error("Failed to write program to {path}: {source}")]
    WriteProgram {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Interpreter process could not be spawned
    #[error("Failed to spawn interpreter `{interpreter}`: {source}")]
    SpawnFailed {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed
    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors that abort an evaluation pipeline
#[derive(Debug, Error)]
pub enum EvalError {
    /// I/O error with the path that caused it
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sample references a task the dataset does not contain
    #[error("Sample references unknown task: {0}")]
    UnknownTask(String),

    /// Dataset contains tasks for which no sample was supplied
    #[error("No samples supplied for {} task(s), first: {}", .0.len(), .0.first().map(String::as_str).unwrap_or("?"))]
    MissingSamples(Vec<String>),

    /// Two problems share a task id
    #[error("Duplicate task id in dataset: {0}")]
    DuplicateTask(String),

    /// Canonical solution could not produce expected outputs
    #[error("Ground truth failed for {task_id}: {message}")]
    Oracle { task_id: String, message: String },

    /// Infrastructure failure outside the scheduler's retry loop
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Run was cancelled externally
    #[error("Evaluation cancelled after {completed} completed unit(s)")]
    Cancelled { completed: usize },
}

impl EvalError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error came from external cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EvalError::Cancelled { .. })
    }
}
