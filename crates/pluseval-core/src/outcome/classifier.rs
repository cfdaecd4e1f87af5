//! Maps raw execution results to outcomes
//!
//! Classification is pure and total: every combination of exit status,
//! signal and harness markers yields exactly one outcome.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{Outcome, OutcomeRecord};
use crate::program::{RunPolicy, TestProgram};
use crate::sandbox::{RawExecutionResult, SIGXCPU};

static MEMORY_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:\w+\.)*MemoryError\b").expect("valid regex"));

/// Payload of an `error` marker
#[derive(Debug, Deserialize)]
struct RaisedError {
    #[serde(default)]
    test: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Markers found in one program's stdout
#[derive(Debug, Default)]
struct Observed<'a> {
    fail: Option<&'a str>,
    results: Option<&'a str>,
    error: Option<&'a str>,
    done: bool,
}

/// Classify a raw result produced by running `program`
pub fn classify(program: &TestProgram, raw: &RawExecutionResult) -> OutcomeRecord {
    if raw.cancelled {
        return Outcome::Error("evaluation cancelled".to_string()).into();
    }
    if raw.timed_out {
        return Outcome::Timeout.into();
    }

    let mut observed = Observed::default();
    for marker in program.markers(&raw.stdout) {
        match marker.kind {
            "fail" => observed.fail = observed.fail.or(Some(marker.payload)),
            "results" => observed.results = Some(marker.payload),
            "error" => observed.error = observed.error.or(Some(marker.payload)),
            "done" => observed.done = true,
            _ => {}
        }
    }

    if let Some(payload) = observed.error {
        return classify_raised(payload).into();
    }

    if let Some(index) = observed
        .fail
        .and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|i| *i < program.test_count())
    {
        return Outcome::Fail(index).into();
    }

    if raw.exit_code == Some(0) && observed.done {
        return match program.policy {
            RunPolicy::FailFast => Outcome::Pass.into(),
            RunPolicy::Exhaustive => classify_vector(program, observed.results),
        };
    }

    if let Some(signal) = raw.signal {
        if signal == SIGXCPU {
            return Outcome::Timeout.into();
        }
        return Outcome::Crash(signal_label(raw)).into();
    }

    match raw.exit_code {
        Some(0) => Outcome::Error("program exited before completing all tests".to_string()).into(),
        Some(code) => {
            if MEMORY_ERROR.is_match(&raw.stderr) {
                return Outcome::Crash("MemoryError".to_string()).into();
            }
            let message = raw
                .last_stderr_line()
                .map(str::to_string)
                .unwrap_or_else(|| format!("exit status {}", code));
            Outcome::Error(message).into()
        }
        None => Outcome::Crash("terminated without exit status".to_string()).into(),
    }
}

fn classify_raised(payload: &str) -> Outcome {
    match serde_json::from_str::<RaisedError>(payload) {
        Ok(raised) if raised.kind == "MemoryError" => Outcome::Crash("MemoryError".to_string()),
        Ok(raised) => Outcome::Error(format!(
            "{}: {}: {}",
            raised.test, raised.kind, raised.message
        )),
        Err(_) => Outcome::Error(format!("unparseable error report: {}", payload)),
    }
}

fn classify_vector(program: &TestProgram, results: Option<&str>) -> OutcomeRecord {
    let Some(payload) = results else {
        return Outcome::Error("missing per-test results".to_string()).into();
    };
    let vector: Vec<bool> = match serde_json::from_str(payload) {
        Ok(vector) => vector,
        Err(e) => return Outcome::Error(format!("malformed per-test results: {}", e)).into(),
    };
    if vector.len() != program.test_count() {
        return Outcome::Error(format!(
            "expected {} results, got {}",
            program.test_count(),
            vector.len()
        ))
        .into();
    }

    let outcome = match vector.iter().position(|passed| !passed) {
        Some(index) => Outcome::Fail(index),
        None => Outcome::Pass,
    };
    OutcomeRecord::with_per_test(outcome, vector)
}

fn signal_label(raw: &RawExecutionResult) -> String {
    raw.signal_name().unwrap_or_else(|| "unknown signal".to_string())
}
