//! Dataset and sample loading
//!
//! Problems load from JSON, JSONL or YAML files. Samples load either from a
//! JSONL file or from a directory laid out as `<task_dir>/<index>.py`, where
//! the task directory name is the task id with `/` replaced by `_`.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use super::{Problem, Sample};

/// Loader for problems and samples
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load problems from a file, format chosen by extension
    pub fn load_problems(path: impl AsRef<Path>) -> Result<Vec<Problem>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file: {:?}", path))?;

        let format = path.extension().and_then(|e| e.to_str()).unwrap_or("jsonl");
        let problems = parse_problems(&content, format)
            .with_context(|| format!("Failed to parse dataset: {:?}", path))?;

        tracing::debug!("Loaded {} problems from {:?}", problems.len(), path);
        Ok(problems)
    }

    /// Load samples from a JSONL file or a sample directory
    pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::load_sample_dir(path);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read samples file: {:?}", path))?;
        let samples = parse_samples_jsonl(&content, &path.display().to_string())?;

        tracing::debug!("Loaded {} samples from {:?}", samples.len(), path);
        Ok(samples)
    }

    fn load_sample_dir(dir: &Path) -> Result<Vec<Sample>> {
        let mut files: Vec<(String, usize, std::path::PathBuf)> = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(2)
            .max_depth(2)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "py") {
                continue;
            }

            let Some(task_dir) = path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str())
            else {
                continue;
            };
            let index = match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<usize>) {
                Some(Ok(index)) => index,
                _ => {
                    tracing::warn!("Skipping sample with non-numeric name: {:?}", path);
                    continue;
                }
            };

            files.push((task_dir.replace('_', "/"), index, path.to_path_buf()));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut samples = Vec::with_capacity(files.len());
        for (task_id, index, path) in files {
            let solution = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read sample: {:?}", path))?;
            let mut sample = Sample::from_solution(task_id, solution).with_index(index);
            sample.identifier = Some(path.display().to_string());
            samples.push(sample);
        }

        tracing::debug!("Loaded {} samples from directory {:?}", samples.len(), dir);
        Ok(samples)
    }
}

/// Parse problems from text in the given format (`json`, `jsonl`, `yaml`)
///
/// A JSON document may be either an array of problems or an object keyed by
/// task id.
pub fn parse_problems(content: &str, format: &str) -> Result<Vec<Problem>> {
    let problems: Vec<Problem> = match format {
        "yaml" | "yml" => serde_yaml::from_str(content)?,
        "json" => {
            let value: serde_json::Value = serde_json::from_str(content)?;
            match value {
                serde_json::Value::Object(map) => map
                    .into_iter()
                    .map(|(_, v)| serde_json::from_value(v))
                    .collect::<Result<_, _>>()?,
                other => serde_json::from_value(other)?,
            }
        }
        _ => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| format!("Invalid problem on line {}", n + 1))
            })
            .collect::<Result<_>>()?,
    };

    let mut seen = HashSet::new();
    for problem in &problems {
        if !seen.insert(problem.task_id.as_str()) {
            bail!("Duplicate task id in dataset: {}", problem.task_id);
        }
    }

    Ok(problems)
}

/// Parse JSONL samples, tagging each with `<source>:<line>`
pub fn parse_samples_jsonl(content: &str, source: &str) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut sample: Sample = serde_json::from_str(line)
            .with_context(|| format!("Invalid sample at {}:{}", source, n + 1))?;
        if sample.identifier.is_none() {
            sample.identifier = Some(format!("{}:{}", source, n + 1));
        }
        samples.push(sample);
    }

    Ok(samples)
}
