//! Platform-specific process setup

use tokio::process::Command;

use super::ExecutionLimits;

/// Put the child in its own process group and apply rlimits
///
/// A limit the platform refuses (e.g. `RLIMIT_AS` on macOS) is skipped and
/// enforcement falls back to the wall-clock deadline.
#[cfg(unix)]
pub(super) fn apply_unix_limits(cmd: &mut Command, limits: &ExecutionLimits) {
    cmd.process_group(0);

    let memory = limits.memory_bytes;
    let file_size = limits.file_size_bytes;
    let cpu = limits.cpu_seconds();

    // SAFETY: pre_exec runs between fork() and exec() in the child process.
    // The closure only calls setrlimit, which is async-signal-safe, and only
    // captures Copy values. Failures are ignored so no allocation happens.
    unsafe {
        cmd.pre_exec(move || {
            let set = |resource, value: u64| {
                let limit = libc::rlimit {
                    rlim_cur: value as libc::rlim_t,
                    rlim_max: value as libc::rlim_t,
                };
                libc::setrlimit(resource, &limit);
            };

            if let Some(bytes) = memory {
                set(libc::RLIMIT_AS, bytes);
            }
            if let Some(bytes) = file_size {
                set(libc::RLIMIT_FSIZE, bytes);
            }
            set(libc::RLIMIT_CPU, cpu);
            set(libc::RLIMIT_CORE, 0);

            Ok(())
        });
    }
}

/// Timeout-only enforcement on non-Unix platforms
#[cfg(not(unix))]
pub(super) fn apply_unix_limits(_cmd: &mut Command, _limits: &ExecutionLimits) {}

/// Kill every process in the child's group
#[cfg(unix)]
pub(super) fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!("killpg({}) failed: {}", pid, e),
    }
}

#[cfg(not(unix))]
pub(super) fn kill_process_group(_pid: u32) {}
