//! CLI argument definitions using clap
//!
//! - pluseval evaluate --problems P --samples S   # run and report pass@k
//! - pluseval failures RESULTS                     # failed task ids
//! - pluseval diff A B                             # failure set difference

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pluseval_core::{EvalConfig, RunPolicy};

#[derive(Parser)]
#[command(name = "pluseval")]
#[command(about = "Evaluate code-generation samples against base and extended test suites")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every sample and report pass@k
    Evaluate(EvaluateArgs),

    /// List tasks whose first sample failed
    Failures {
        /// Results file written by `evaluate`
        results: PathBuf,

        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Compare the failed tasks of two runs
    Diff {
        /// Earlier results file
        first: PathBuf,

        /// Later results file
        second: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Problems file (.json, .jsonl or .yaml)
    #[arg(long)]
    pub problems: PathBuf,

    /// Samples file (.jsonl) or directory of <task>/<n>.py files
    #[arg(long)]
    pub samples: PathBuf,

    /// Dataset name recorded in the results
    #[arg(long, default_value = "humaneval")]
    pub dataset: String,

    /// Configuration file (YAML or JSON); flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of programs run concurrently
    #[arg(long, short = 'j')]
    pub parallel: Option<usize>,

    /// Minimum time limit per program, in seconds
    #[arg(long)]
    pub min_time_limit: Option<f64>,

    /// Skip the extended tests
    #[arg(long)]
    pub base_only: bool,

    /// Run every test instead of stopping at the first failure
    #[arg(long)]
    pub exhaustive: bool,

    /// Ignore existing results and cached outcomes
    #[arg(long)]
    pub force: bool,

    /// Do not read or write the outcome cache
    #[arg(long)]
    pub no_cache: bool,

    /// Directory for cached outcomes and ground truth
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Interpreter used to run programs
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Allow tasks without samples
    #[arg(long)]
    pub allow_missing: bool,

    /// Comma-separated k values to report
    #[arg(long, value_delimiter = ',')]
    pub k: Option<Vec<usize>>,
}

impl EvaluateArgs {
    /// Build the run configuration: config file first, then flags
    pub fn to_config(&self) -> Result<EvalConfig> {
        let mut config = match &self.config {
            Some(path) => EvalConfig::from_file(path)?,
            None => EvalConfig::default(),
        };

        if let Some(parallel) = self.parallel {
            config = config.with_parallel(parallel);
        }
        if let Some(secs) = self.min_time_limit {
            let timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid --min-time-limit: {}", secs))?;
            config = config.with_timeout(timeout);
        }
        if self.base_only {
            config = config.base_only();
        }
        if self.exhaustive {
            config = config.with_policy(RunPolicy::Exhaustive);
        }
        if self.force {
            config = config.force_rerun();
        }
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if let Some(interpreter) = &self.interpreter {
            config = config.with_interpreter(interpreter);
        }
        if let Some(k) = &self.k {
            config.k_values = k.clone();
        }
        config.no_cache |= self.no_cache;
        config.allow_missing_tasks |= self.allow_missing;

        Ok(config)
    }
}
