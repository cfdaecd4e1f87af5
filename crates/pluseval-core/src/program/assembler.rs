//! Builds test programs from problems and candidate sources

use super::harness::{HarnessParams, render_tests};
use super::{RunPolicy, TestMode, TestProgram, marker_tag, test_ids};
use crate::dataset::{Oracle, Problem};

/// Assemble a runnable test program
///
/// `candidate` is the full program text that defines the entry point
/// (normally `prompt + completion`). The candidate comes first so that its
/// `from __future__` imports remain legal; the harness block follows and
/// runs the selected tests in order, base tests first. A syntactically
/// invalid candidate still yields a program, which then fails at run time.
pub fn assemble(
    problem: &Problem,
    candidate: &str,
    oracle: &Oracle,
    mode: TestMode,
    policy: RunPolicy,
) -> TestProgram {
    let plus_count = match mode {
        TestMode::Base => 0,
        TestMode::Full => problem.plus_input.len(),
    };
    let tests = test_ids(problem.base_input.len(), plus_count);

    let ids: Vec<String> = tests.iter().map(ToString::to_string).collect();
    let inputs: Vec<_> = problem.inputs_for(mode).collect();
    let expected: Vec<_> = oracle.expected_for(mode).collect();

    let tag = marker_tag(&[
        &problem.task_id,
        candidate,
        mode.as_str(),
        policy.as_str(),
    ]);

    // Vec<String> and Vec<&Value> always serialize
    let params = HarnessParams {
        tag: &tag,
        entry_point: &problem.entry_point,
        ids_json: serde_json::to_string(&ids).unwrap_or_else(|_| "[]".into()),
        inputs_json: serde_json::to_string(&inputs).unwrap_or_else(|_| "[]".into()),
        expected_json: serde_json::to_string(&expected).unwrap_or_else(|_| "[]".into()),
        atol: problem.atol,
        exhaustive: policy == RunPolicy::Exhaustive,
    };

    let mut source = String::with_capacity(candidate.len() + 4096);
    source.push_str(candidate);
    if !candidate.ends_with('\n') {
        source.push('\n');
    }
    source.push_str(&render_tests(&params));

    TestProgram {
        source,
        tests,
        tag,
        mode,
        policy,
    }
}
