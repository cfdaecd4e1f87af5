//! Ctrl+C handling
//!
//! The first SIGINT cancels the run so results finished so far stay in the
//! outcome cache; a second one exits immediately.

use futures::stream::StreamExt;
use signal_hook::consts::SIGINT;
use signal_hook_tokio::{Handle, Signals};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Signal handler that turns Ctrl+C into cancellation
pub struct SignalHandler {
    cancel: CancellationToken,
    handle: Option<Handle>,
    task_handle: Option<JoinHandle<()>>,
}

impl SignalHandler {
    /// Create a handler that cancels `cancel` on Ctrl+C
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            handle: None,
            task_handle: None,
        }
    }

    /// Start signal handling
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.task_handle.is_some() {
            return Ok(()); // Already started
        }

        let mut signals = Signals::new([SIGINT])?;
        self.handle = Some(signals.handle());
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                if signal != SIGINT {
                    continue;
                }
                if cancel.is_cancelled() {
                    eprintln!("\nForced exit");
                    std::process::exit(crate::EXIT_INTERRUPTED);
                }
                eprintln!("\nInterrupting evaluation (Ctrl+C again to force)...");
                tracing::info!("Cancellation requested by SIGINT");
                cancel.cancel();
            }
        });

        self.task_handle = Some(task);
        Ok(())
    }

    /// Stop signal handling
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        if let Some(task) = self.task_handle.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task_handle.is_some()
    }
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_handler_start_stop() {
        let mut handler = SignalHandler::new(CancellationToken::new());
        assert!(!handler.is_active());

        handler.start().unwrap();
        assert!(handler.is_active());

        handler.stop();
        assert!(!handler.is_active());
    }

    #[tokio::test]
    async fn test_sigint_cancels_token() {
        let cancel = CancellationToken::new();
        let mut handler = SignalHandler::new(cancel.clone());
        handler.start().unwrap();

        signal_hook::low_level::raise(SIGINT).unwrap();
        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .expect("SIGINT should cancel the run");
    }
}
