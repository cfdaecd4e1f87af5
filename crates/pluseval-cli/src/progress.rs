//! Progress bar for evaluation runs

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use pluseval_core::runner::EvalProgress;

/// Terminal progress bar fed by the scheduler's progress callback
pub struct EvalProgressBar {
    bar: ProgressBar,
}

impl EvalProgressBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.blue} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress template")
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Callback that advances this bar
    pub fn callback(&self) -> impl Fn(EvalProgress) + Send + Sync + 'static {
        let bar = self.bar.clone();
        move |progress: EvalProgress| {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.completed as u64);
            if progress.cached > 0 {
                bar.set_message(format!(
                    "{} {} ({} cached)",
                    progress.unit,
                    progress.outcome.label(),
                    progress.cached
                ));
            } else {
                bar.set_message(format!("{} {}", progress.unit, progress.outcome.label()));
            }
        }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl Default for EvalProgressBar {
    fn default() -> Self {
        Self::new()
    }
}
