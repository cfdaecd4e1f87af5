//! Interpreter-backed program executor

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::capture::{Captured, drain_bounded};
use super::limits::{apply_unix_limits, kill_process_group};
use super::{ExecutionLimits, ProgramRunner, RawExecutionResult, Workspace};
use crate::error::ExecError;
use crate::program::TestProgram;

/// How long output readers may run after the child is reaped
const READER_GRACE: Duration = Duration::from_millis(500);

const PROGRAM_FILE: &str = "main.py";

/// Runs programs with an external interpreter, one process group each
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    interpreter: String,
}

impl Default for SandboxExecutor {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl SandboxExecutor {
    /// Create an executor for the given interpreter command
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Interpreter command
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run arbitrary source text under the given limits
    pub async fn execute(
        &self,
        source: &str,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecutionResult, ExecError> {
        let workspace = Workspace::new()?;
        let program_path = workspace.write(PROGRAM_FILE, source).await?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&program_path)
            .current_dir(workspace.root())
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        apply_unix_limits(&mut cmd, limits);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ExecError::SpawnFailed {
            interpreter: self.interpreter.clone(),
            source,
        })?;
        let pid = child.id();

        let max_output = limits.max_output_bytes;
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(drain_bounded(out, max_output)));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(drain_bounded(err, max_output)));

        let deadline = tokio::time::sleep(limits.timeout);
        tokio::pin!(deadline);

        let (status, timed_out, cancelled) = tokio::select! {
            status = child.wait() => (Some(status.map_err(ExecError::Wait)?), false, false),
            _ = &mut deadline => (None, true, false),
            _ = cancel.cancelled() => (None, false, true),
        };

        // Only an unreaped leader pins the group id; once the child has been
        // waited on, its pid may already belong to another unit's group.
        // Stragglers of a normal exit stay bounded by the inherited RLIMIT_CPU.
        let status = match status {
            Some(status) => status,
            None => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                let _ = child.start_kill();
                child.wait().await.map_err(ExecError::Wait)?
            }
        };
        let elapsed = start.elapsed();

        let stdout = collect(stdout_task).await;
        let stderr = collect(stderr_task).await;

        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        tracing::trace!(
            exit_code = ?status.code(),
            ?signal,
            timed_out,
            cancelled,
            elapsed_ms = elapsed.as_millis() as u64,
            "Program finished"
        );

        Ok(RawExecutionResult {
            exit_code: if timed_out || cancelled { None } else { status.code() },
            signal: if timed_out || cancelled { None } else { signal },
            stdout: stdout.text,
            stderr: stderr.text,
            elapsed,
            timed_out,
            cancelled,
            truncated: stdout.truncated || stderr.truncated,
        })
    }
}

async fn collect(task: Option<JoinHandle<Captured>>) -> Captured {
    let Some(mut task) = task else {
        return Captured::default();
    };
    match timeout(READER_GRACE, &mut task).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(e)) => {
            tracing::debug!("Output reader failed: {}", e);
            Captured::default()
        }
        Err(_) => {
            // A process outside the group still holds the pipe
            task.abort();
            Captured {
                text: String::new(),
                truncated: true,
            }
        }
    }
}

#[async_trait]
impl ProgramRunner for SandboxExecutor {
    async fn run(
        &self,
        program: &TestProgram,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecutionResult, ExecError> {
        self.execute(&program.source, limits, cancel).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell() -> SandboxExecutor {
        SandboxExecutor::new("sh")
    }

    fn limits(timeout: Duration) -> ExecutionLimits {
        ExecutionLimits::with_timeout(timeout).with_memory(None)
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let result = shell()
            .execute(
                "echo hello; echo oops >&2; exit 3\n",
                &limits(Duration::from_secs(10)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "oops\n");
        assert!(!result.timed_out);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_deadline_kills_process_group() {
        let start = Instant::now();
        let result = shell()
            .execute(
                "sleep 30 & sleep 30\n",
                &limits(Duration::from_millis(300)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(result.timed_out);
        assert!(result.exit_code.is_none());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_normal_exit_does_not_signal_the_group() {
        let result = shell()
            .execute(
                "sleep 5 >/dev/null 2>&1 &\necho $!\n",
                &limits(Duration::from_secs(10)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.exit_code, Some(0));

        let pid = nix::unistd::Pid::from_raw(result.stdout.trim().parse().unwrap());
        assert!(nix::sys::signal::kill(pid, None).is_ok());
        let _ = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGKILL);
    }

    #[tokio::test]
    async fn test_cancellation_stops_child() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = shell()
            .execute("sleep 30\n", &limits(Duration::from_secs(30)), &cancel)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_signal_is_reported() {
        let result = shell()
            .execute(
                "kill -SEGV $$\n",
                &limits(Duration::from_secs(10)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.signal, Some(libc::SIGSEGV));
        assert_eq!(result.signal_name().as_deref(), Some("SIGSEGV"));
    }

    #[tokio::test]
    async fn test_output_is_bounded() {
        let result = shell()
            .execute(
                "i=0; while [ $i -lt 2000 ]; do echo 0123456789; i=$((i+1)); done\n",
                &limits(Duration::from_secs(10)).with_output_limit(256),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(result.truncated);
        assert!(result.stdout.len() < 512);
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let err = SandboxExecutor::new("definitely-not-an-interpreter-xyz")
            .execute("", &limits(Duration::from_secs(1)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::SpawnFailed { .. }));
    }
}
