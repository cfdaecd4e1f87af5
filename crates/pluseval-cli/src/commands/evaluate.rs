//! `pluseval evaluate`

use anyhow::{Context, Result};
use pluseval_core::report::summary_table;
use pluseval_core::{DatasetLoader, Evaluator};
use tokio_util::sync::CancellationToken;

use crate::args::EvaluateArgs;
use crate::console::CliConsole;
use crate::progress::EvalProgressBar;
use crate::signal_handler::SignalHandler;

/// Evaluate every sample and print the pass@k summary
pub async fn run(args: EvaluateArgs, verbose: bool) -> Result<()> {
    let console = CliConsole::new(verbose);
    let config = args.to_config()?;

    let problems = DatasetLoader::load_problems(&args.problems)?;
    let samples = DatasetLoader::load_samples(&args.samples)?;
    console.info(&format!(
        "Loaded {} problems and {} samples",
        problems.len(),
        samples.len()
    ));
    console.info(&format!(
        "Running {} programs at a time, policy {}",
        config.effective_parallel(),
        config.policy.as_str()
    ));

    let cancel = CancellationToken::new();
    let mut signals = SignalHandler::new(cancel.clone());
    signals.start().context("Failed to install Ctrl+C handler")?;

    let progress = EvalProgressBar::new();
    let evaluator = Evaluator::new(config, &args.dataset).with_progress(progress.callback());
    let result = evaluator
        .evaluate(problems, samples, &args.samples, &cancel)
        .await;
    signals.stop();

    let evaluation = match result {
        Ok(evaluation) => {
            progress.finish("done");
            evaluation
        }
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };

    if evaluation.reused {
        console.warn(&format!(
            "Reusing results from {}; pass --force to evaluate again",
            evaluation.results_path.display()
        ));
    }

    println!("{}", summary_table(&evaluation.results));
    console.success(&format!(
        "Results written to {}",
        evaluation.results_path.display()
    ));
    Ok(())
}
