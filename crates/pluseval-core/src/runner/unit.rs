//! Evaluation units

use std::sync::Arc;

use crate::cache::CacheKey;
use crate::dataset::{Oracle, Problem, Sample};
use crate::program::{RunPolicy, TestMode, TestProgram, assemble};
use crate::sandbox::ExecutionLimits;

use super::EvalConfig;

/// One (problem, sample, mode, policy) combination
///
/// A unit shares its problem and oracle with every other unit of the same
/// task and only carries the candidate source. The test program, which
/// embeds every input and expected output, is assembled by [`program`]
/// once a worker picks the unit up.
///
/// [`program`]: EvaluationUnit::program
#[derive(Debug, Clone)]
pub struct EvaluationUnit {
    /// Position in the submitted batch
    pub id: usize,

    pub task_id: String,

    pub sample_index: usize,

    pub mode: TestMode,

    pub policy: RunPolicy,

    /// Candidate program source (prompt + completion, or full solution)
    pub source: String,

    pub problem: Arc<Problem>,

    pub oracle: Arc<Oracle>,

    pub limits: ExecutionLimits,

    pub key: CacheKey,
}

impl EvaluationUnit {
    /// Derive the unit's source, limits and cache key
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        id: usize,
        problem: &Arc<Problem>,
        oracle: &Arc<Oracle>,
        sample: &Sample,
        sample_index: usize,
        mode: TestMode,
        policy: RunPolicy,
        config: &EvalConfig,
    ) -> Self {
        let source = sample.program_source(problem);
        let limits = config.limits_for(oracle.reference_secs(mode));
        let key = CacheKey::new(&problem.task_id, &source, mode, policy);

        Self {
            id,
            task_id: problem.task_id.clone(),
            sample_index,
            mode,
            policy,
            source,
            problem: Arc::clone(problem),
            oracle: Arc::clone(oracle),
            limits,
            key,
        }
    }

    /// Assemble the executable test program
    pub fn program(&self) -> TestProgram {
        assemble(&self.problem, &self.source, &self.oracle, self.mode, self.policy)
    }

    /// Label used in logs, e.g. `HumanEval/0#3 (full)`
    pub fn label(&self) -> String {
        format!("{}#{} ({})", self.task_id, self.sample_index, self.mode.as_str())
    }
}
