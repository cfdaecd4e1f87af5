//! Core dataset records
//!
//! Defines benchmark problems, candidate samples and the ground-truth
//! outputs computed from canonical solutions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::program::TestMode;

/// A benchmark problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Unique identifier for the task
    pub task_id: String,

    /// Name of the function the tests call
    pub entry_point: String,

    /// Signature and docstring
    pub prompt: String,

    /// Reference implementation body
    pub canonical_solution: String,

    /// Original test inputs, one positional-argument list per test
    #[serde(default)]
    pub base_input: Vec<Vec<Value>>,

    /// Supplementary test inputs
    #[serde(default)]
    pub plus_input: Vec<Vec<Value>>,

    /// Absolute tolerance for float comparisons (0 = default tolerance)
    #[serde(default)]
    pub atol: f64,
}

impl Problem {
    /// Create a new problem without test inputs
    pub fn new(
        task_id: impl Into<String>,
        entry_point: impl Into<String>,
        prompt: impl Into<String>,
        canonical_solution: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            entry_point: entry_point.into(),
            prompt: prompt.into(),
            canonical_solution: canonical_solution.into(),
            base_input: Vec::new(),
            plus_input: Vec::new(),
            atol: 0.0,
        }
    }

    /// Set base inputs
    pub fn with_base_input(mut self, inputs: Vec<Vec<Value>>) -> Self {
        self.base_input = inputs;
        self
    }

    /// Set plus inputs
    pub fn with_plus_input(mut self, inputs: Vec<Vec<Value>>) -> Self {
        self.plus_input = inputs;
        self
    }

    /// Set float tolerance
    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Inputs a unit of the given mode runs, base tests first
    pub fn inputs_for(&self, mode: TestMode) -> impl Iterator<Item = &Vec<Value>> {
        let plus: &[Vec<Value>] = match mode {
            TestMode::Base => &[],
            TestMode::Full => &self.plus_input,
        };
        self.base_input.iter().chain(plus.iter())
    }

    /// Reference program: prompt followed by the canonical body
    pub fn reference_source(&self) -> String {
        format!("{}{}", self.prompt, self.canonical_solution)
    }
}

/// A candidate completion for one task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Task this sample answers
    pub task_id: String,

    /// Completion appended to the prompt
    #[serde(default)]
    pub completion: String,

    /// Full program replacing prompt + completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,

    /// Position among the samples of the same task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_index: Option<usize>,

    /// Where the sample came from, for diagnostics
    #[serde(default, rename = "_identifier", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl Sample {
    /// Create a sample from a completion
    pub fn new(task_id: impl Into<String>, completion: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            completion: completion.into(),
            ..Default::default()
        }
    }

    /// Create a sample from a complete program
    pub fn from_solution(task_id: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            solution: Some(solution.into()),
            ..Default::default()
        }
    }

    /// Set the sample index
    pub fn with_index(mut self, index: usize) -> Self {
        self.sample_index = Some(index);
        self
    }

    /// Source text defining the entry point for this sample
    pub fn program_source(&self, problem: &Problem) -> String {
        match &self.solution {
            Some(solution) => solution.clone(),
            None => format!("{}{}", problem.prompt, self.completion),
        }
    }

    /// Human-readable label used in logs
    pub fn label(&self) -> String {
        match (&self.identifier, self.sample_index) {
            (Some(id), _) => id.clone(),
            (None, Some(index)) => format!("{}#{}", self.task_id, index),
            (None, None) => self.task_id.clone(),
        }
    }
}

/// Expected outputs and reference timings for one problem
///
/// Outputs are kept as JSON text of the normalised return value so that
/// values JSON cannot carry losslessly (NaN, infinities) survive the round
/// trip between the recorder and the test harness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Oracle {
    /// Expected outputs for base inputs
    pub base: Vec<String>,

    /// Expected outputs for plus inputs
    pub plus: Vec<String>,

    /// Reference seconds per base test
    #[serde(default)]
    pub base_time: Vec<f64>,

    /// Reference seconds per plus test
    #[serde(default)]
    pub plus_time: Vec<f64>,
}

impl Oracle {
    /// Build an oracle from known expected values (no timing information)
    pub fn from_values(base: &[Value], plus: &[Value]) -> Self {
        let encode = |values: &[Value]| values.iter().map(Value::to_string).collect::<Vec<_>>();
        Self {
            base: encode(base),
            plus: encode(plus),
            base_time: vec![0.0; base.len()],
            plus_time: vec![0.0; plus.len()],
        }
    }

    /// Expected outputs for a mode, base first
    pub fn expected_for(&self, mode: TestMode) -> impl Iterator<Item = &String> {
        let plus: &[String] = match mode {
            TestMode::Base => &[],
            TestMode::Full => &self.plus,
        };
        self.base.iter().chain(plus.iter())
    }

    /// Sum of reference times for a mode
    pub fn reference_secs(&self, mode: TestMode) -> f64 {
        let base: f64 = self.base_time.iter().sum();
        match mode {
            TestMode::Base => base,
            TestMode::Full => base + self.plus_time.iter().sum::<f64>(),
        }
    }
}
