//! Evaluation runner
//!
//! Turns problems and samples into evaluation units, runs them on a bounded
//! worker pool and collects their outcomes.

mod config;
mod evaluator;
mod groundtruth;
mod progress;
mod scheduler;
mod unit;

pub use config::EvalConfig;
pub use evaluator::{Evaluation, Evaluator};
pub use groundtruth::GroundTruth;
pub use progress::{EvalProgress, ProgressCallback};
pub use scheduler::{Scheduler, UnitOutcome};
pub use unit::EvaluationUnit;
