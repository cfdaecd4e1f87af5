//! Outcome taxonomy for evaluated programs

mod classifier;

pub use classifier::classify;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of running one evaluation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// Every selected test passed
    Pass,
    /// The test at this index produced a wrong answer
    Fail(usize),
    /// The program raised, failed to parse, or misbehaved
    Error(String),
    /// The deadline was exceeded
    Timeout,
    /// The process was killed by a signal or ran out of memory
    Crash(String),
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }

    /// Short status label
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail(_) => "fail",
            Outcome::Error(_) => "error",
            Outcome::Timeout => "timeout",
            Outcome::Crash(_) => "crash",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail(index) => write!(f, "fail (test {})", index),
            Outcome::Error(message) => write!(f, "error: {}", message),
            Outcome::Timeout => write!(f, "timeout"),
            Outcome::Crash(reason) => write!(f, "crash: {}", reason),
        }
    }
}

/// Outcome plus the per-test vector exhaustive runs produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub outcome: Outcome,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_test: Option<Vec<bool>>,
}

impl OutcomeRecord {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            per_test: None,
        }
    }

    pub fn with_per_test(outcome: Outcome, per_test: Vec<bool>) -> Self {
        Self {
            outcome,
            per_test: Some(per_test),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.outcome.is_pass()
    }
}

impl From<Outcome> for OutcomeRecord {
    fn from(outcome: Outcome) -> Self {
        Self::new(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serde_shape() {
        let json = serde_json::to_string(&Outcome::Fail(2)).unwrap();
        assert_eq!(json, r#"{"status":"fail","detail":2}"#);

        let pass: Outcome = serde_json::from_str(r#"{"status":"pass"}"#).unwrap();
        assert_eq!(pass, Outcome::Pass);
    }

    #[test]
    fn test_record_omits_missing_vector() {
        let json = serde_json::to_string(&OutcomeRecord::new(Outcome::Timeout)).unwrap();
        assert!(!json.contains("per_test"));

        let record = OutcomeRecord::with_per_test(Outcome::Fail(0), vec![false, true]);
        let back: OutcomeRecord = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(back, record);
    }
}
