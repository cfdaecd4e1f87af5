//! Recorder programs for computing expected outputs

use serde::Deserialize;

use super::harness::render_recorder;
use super::{RunPolicy, TestMode, TestProgram, marker_tag, parse_markers, test_ids};
use crate::dataset::{Oracle, Problem};

#[derive(Debug, Deserialize)]
struct Recorded {
    index: usize,
    value: String,
    time: f64,
}

/// Program that runs the canonical solution over every input of a problem
pub fn recorder_program(problem: &Problem) -> TestProgram {
    let reference = problem.reference_source();
    let inputs: Vec<_> = problem.inputs_for(TestMode::Full).collect();
    let inputs_json = serde_json::to_string(&inputs).unwrap_or_else(|_| "[]".into());
    let tag = marker_tag(&[&problem.task_id, &reference, "record"]);

    let mut source = reference;
    if !source.ends_with('\n') {
        source.push('\n');
    }
    source.push_str(&render_recorder(&tag, &problem.entry_point, &inputs_json));

    TestProgram {
        source,
        tests: test_ids(problem.base_input.len(), problem.plus_input.len()),
        tag,
        mode: TestMode::Full,
        policy: RunPolicy::Exhaustive,
    }
}

/// Turn a recorder's stdout into an [`Oracle`]
///
/// Fails with a description when an output is missing, malformed or the
/// recorder did not reach its final marker.
pub fn parse_recording(problem: &Problem, tag: &str, stdout: &str) -> Result<Oracle, String> {
    let total = problem.base_input.len() + problem.plus_input.len();
    let mut values: Vec<Option<(String, f64)>> = vec![None; total];
    let mut done = false;

    for marker in parse_markers(stdout, tag) {
        match marker.kind {
            "output" => {
                let recorded: Recorded = serde_json::from_str(marker.payload)
                    .map_err(|e| format!("malformed output record: {}", e))?;
                let slot = values
                    .get_mut(recorded.index)
                    .ok_or_else(|| format!("output index {} out of range", recorded.index))?;
                *slot = Some((recorded.value, recorded.time.max(0.0)));
            }
            "done" => done = true,
            "error" => return Err(format!("canonical solution raised: {}", marker.payload)),
            _ => {}
        }
    }

    if !done {
        return Err("recorder exited before finishing".to_string());
    }

    let mut oracle = Oracle::default();
    for (index, value) in values.into_iter().enumerate() {
        let (output, time) = value.ok_or_else(|| format!("no output recorded for input {}", index))?;
        if index < problem.base_input.len() {
            oracle.base.push(output);
            oracle.base_time.push(time);
        } else {
            oracle.plus.push(output);
            oracle.plus_time.push(time);
        }
    }

    Ok(oracle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn problem() -> Problem {
        Problem::new("P1", "add", "def add(a, b):\n", "    return a + b")
            .with_base_input(vec![vec![json!(1), json!(2)]])
            .with_plus_input(vec![vec![json!(0.5), json!(0.25)]])
    }

    #[test]
    fn test_recorder_program_layout() {
        let program = recorder_program(&problem());
        assert!(program.source.starts_with("def add(a, b):\n    return a + b\n"));
        assert_eq!(program.test_count(), 2);
        assert!(program.source.contains("_pe_record()"));
    }

    #[test]
    fn test_parse_recording() {
        let p = problem();
        let tag = "@@pluseval-aaaaaaaaaaaa";
        let stdout = format!(
            "{tag} output {{\"index\": 1, \"value\": \"0.75\", \"time\": 0.002}}\n\
             {tag} output {{\"index\": 0, \"value\": \"3\", \"time\": 0.001}}\n\
             {tag} done\n"
        );
        let oracle = parse_recording(&p, tag, &stdout).unwrap();
        assert_eq!(oracle.base, vec!["3"]);
        assert_eq!(oracle.plus, vec!["0.75"]);
        assert!((oracle.reference_secs(TestMode::Full) - 0.003).abs() < 1e-9);
    }

    #[test]
    fn test_parse_recording_requires_every_output() {
        let p = problem();
        let tag = "@@pluseval-aaaaaaaaaaaa";
        let stdout = format!("{tag} output {{\"index\": 0, \"value\": \"3\", \"time\": 0.0}}\n{tag} done\n");
        let err = parse_recording(&p, tag, &stdout).unwrap_err();
        assert!(err.contains("input 1"));

        let unfinished = format!("{tag} output {{\"index\": 0, \"value\": \"3\", \"time\": 0.0}}\n");
        assert!(parse_recording(&p, tag, &unfinished).is_err());
    }
}
