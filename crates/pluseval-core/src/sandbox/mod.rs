//! Isolated execution of assembled programs
//!
//! Each program runs in its own temporary directory and process group under
//! a wall-clock deadline and best-effort resource limits. The executor
//! reports what happened; it never interprets the result and never retries.

mod capture;
mod executor;
mod limits;
mod workspace;

pub use capture::{Captured, drain_bounded};
pub use executor::SandboxExecutor;
pub use workspace::Workspace;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ExecError;
use crate::program::TestProgram;

/// Default memory ceiling (4 GiB)
pub const DEFAULT_MEMORY_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Default bytes retained per output stream
pub const DEFAULT_OUTPUT_BYTES: usize = 1024 * 1024;

/// Limits applied to one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Hard wall-clock deadline
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Address-space ceiling in bytes
    pub memory_bytes: Option<u64>,

    /// Largest file the program may create
    pub file_size_bytes: Option<u64>,

    /// Bytes retained per output stream (head + tail)
    pub max_output_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            memory_bytes: Some(DEFAULT_MEMORY_BYTES),
            file_size_bytes: Some(64 * 1024 * 1024),
            max_output_bytes: DEFAULT_OUTPUT_BYTES,
        }
    }
}

impl ExecutionLimits {
    /// Limits with the given deadline and default ceilings
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Set the memory ceiling
    pub fn with_memory(mut self, bytes: Option<u64>) -> Self {
        self.memory_bytes = bytes;
        self
    }

    /// Set the retained output size
    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// CPU-seconds ceiling: one second past the wall-clock deadline
    pub fn cpu_seconds(&self) -> u64 {
        self.timeout.as_secs() + u64::from(self.timeout.subsec_nanos() > 0) + 1
    }
}

/// What the executor observed about one program run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExecutionResult {
    /// Exit status when the process exited normally
    pub exit_code: Option<i32>,

    /// Terminating signal number
    pub signal: Option<i32>,

    /// Captured standard output (bounded)
    pub stdout: String,

    /// Captured standard error (bounded)
    pub stderr: String,

    /// Wall-clock time from spawn to reap
    pub elapsed: Duration,

    /// Killed for exceeding the deadline
    pub timed_out: bool,

    /// Killed by external cancellation
    pub cancelled: bool,

    /// Some output was dropped
    pub truncated: bool,
}

impl RawExecutionResult {
    /// Symbolic name of the terminating signal, e.g. `SIGSEGV`
    pub fn signal_name(&self) -> Option<String> {
        self.signal.map(signal_name)
    }

    /// Last non-empty line of stderr
    pub fn last_stderr_line(&self) -> Option<&str> {
        self.stderr.lines().rev().map(str::trim).find(|l| !l.is_empty())
    }
}

#[cfg(unix)]
pub(crate) fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| format!("signal {}", signal))
}

#[cfg(not(unix))]
pub(crate) fn signal_name(signal: i32) -> String {
    format!("signal {}", signal)
}

#[cfg(unix)]
pub(crate) const SIGXCPU: i32 = libc::SIGXCPU;

#[cfg(not(unix))]
pub(crate) const SIGXCPU: i32 = 24;

/// Runs a test program and reports the raw result
///
/// Implementations must not retry and must return promptly once `cancel`
/// fires. An `Err` means the program could not be run at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgramRunner: Send + Sync {
    async fn run(
        &self,
        program: &TestProgram,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecutionResult, ExecError>;
}
