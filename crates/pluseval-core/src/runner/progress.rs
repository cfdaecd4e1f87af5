//! Progress reporting

use crate::outcome::Outcome;

/// Callback for progress updates during evaluation
pub type ProgressCallback = Box<dyn Fn(EvalProgress) + Send + Sync>;

/// Progress update, emitted once per finished unit
#[derive(Debug, Clone)]
pub struct EvalProgress {
    /// Units finished so far, including cached ones
    pub completed: usize,
    /// Total number of units
    pub total: usize,
    /// Units answered from the cache
    pub cached: usize,
    /// Label of the unit that just finished
    pub unit: String,
    /// Its outcome
    pub outcome: Outcome,
}
