//! Evaluation configuration
//!
//! Every tunable of a run with its default. Loadable from YAML or JSON;
//! command-line flags are applied on top with the `with_*` builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::program::RunPolicy;
use crate::sandbox::{DEFAULT_MEMORY_BYTES, DEFAULT_OUTPUT_BYTES, ExecutionLimits};

/// Configuration for evaluation runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Minimum wall-clock limit per unit
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Multiplier applied to the reference solution's runtime
    #[serde(default = "default_time_factor")]
    pub time_factor: f64,

    /// Wall-clock limit for ground-truth computation per problem
    #[serde(default = "default_oracle_timeout", with = "humantime_serde")]
    pub oracle_timeout: Duration,

    /// Concurrent units (None = half the available cores)
    #[serde(default)]
    pub parallel: Option<usize>,

    /// Retries after an infrastructure failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries, multiplied by the attempt number
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,

    /// Address-space ceiling per program (None = unlimited)
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: Option<u64>,

    /// Bytes retained per output stream
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,

    /// Interpreter used to run programs
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Only run base tests
    #[serde(default)]
    pub base_only: bool,

    /// Fail-fast or exhaustive
    #[serde(default)]
    pub policy: RunPolicy,

    /// Ignore existing results and cache entries
    #[serde(default)]
    pub force_rerun: bool,

    /// Directory for the outcome cache and ground-truth files
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Disable the persistent outcome cache
    #[serde(default)]
    pub no_cache: bool,

    /// Interval after which a run with no completions is reported as stalled
    #[serde(default = "default_stall_interval", with = "humantime_serde")]
    pub stall_interval: Duration,

    /// k values to report
    #[serde(default = "default_k_values")]
    pub k_values: Vec<usize>,

    /// Allow problems without samples
    #[serde(default)]
    pub allow_missing_tasks: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_time_factor() -> f64 {
    4.0
}

fn default_oracle_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(200)
}

fn default_memory_limit() -> Option<u64> {
    Some(DEFAULT_MEMORY_BYTES)
}

fn default_max_output() -> usize {
    DEFAULT_OUTPUT_BYTES
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_stall_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_k_values() -> Vec<usize> {
    vec![1, 10, 100]
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            time_factor: default_time_factor(),
            oracle_timeout: default_oracle_timeout(),
            parallel: None,
            max_retries: default_max_retries(),
            retry_backoff: default_retry_backoff(),
            memory_limit_bytes: default_memory_limit(),
            max_output_bytes: default_max_output(),
            interpreter: default_interpreter(),
            base_only: false,
            policy: RunPolicy::default(),
            force_rerun: false,
            cache_dir: None,
            no_cache: false,
            stall_interval: default_stall_interval(),
            k_values: default_k_values(),
            allow_missing_tasks: false,
        }
    }
}

impl EvalConfig {
    /// Load a config file; `.yaml`/`.yml` is YAML, anything else JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = if path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml") {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {:?}", path))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {:?}", path))?
        };

        Ok(config)
    }

    /// Set minimum timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set worker count
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = Some(parallel.max(1));
        self
    }

    /// Set run policy
    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Only run base tests
    pub fn base_only(mut self) -> Self {
        self.base_only = true;
        self
    }

    /// Re-execute everything
    pub fn force_rerun(mut self) -> Self {
        self.force_rerun = true;
        self
    }

    /// Set cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set interpreter
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Effective worker count
    pub fn effective_parallel(&self) -> usize {
        self.parallel.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        })
    }

    /// Effective cache directory (`$XDG_CACHE_HOME/pluseval` by default)
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("pluseval")
        })
    }

    /// Wall-clock limit for a unit whose reference run took `reference_secs`
    pub fn unit_timeout(&self, reference_secs: f64) -> Duration {
        let scaled = reference_secs * self.time_factor;
        if scaled.is_finite() && scaled > self.timeout.as_secs_f64() {
            Duration::from_secs_f64(scaled)
        } else {
            self.timeout
        }
    }

    /// Execution limits for a unit
    pub fn limits_for(&self, reference_secs: f64) -> ExecutionLimits {
        ExecutionLimits::with_timeout(self.unit_timeout(reference_secs))
            .with_memory(self.memory_limit_bytes)
            .with_output_limit(self.max_output_bytes)
    }

    /// Execution limits for ground-truth recorders
    pub fn oracle_limits(&self) -> ExecutionLimits {
        ExecutionLimits::with_timeout(self.oracle_timeout)
            .with_memory(self.memory_limit_bytes)
            .with_output_limit(256 * 1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EvalConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.k_values, vec![1, 10, 100]);
        assert_eq!(config.policy, RunPolicy::FailFast);
        assert!(config.effective_parallel() >= 1);
    }

    #[test]
    fn test_config_builder() {
        let config = EvalConfig::default()
            .with_timeout(Duration::from_secs(3))
            .with_parallel(0)
            .with_policy(RunPolicy::Exhaustive)
            .base_only();

        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.effective_parallel(), 1);
        assert_eq!(config.policy, RunPolicy::Exhaustive);
        assert!(config.base_only);
    }

    #[test]
    fn test_unit_timeout_scales_with_reference() {
        let config = EvalConfig::default();
        assert_eq!(config.unit_timeout(0.5), Duration::from_secs(10));
        assert_eq!(config.unit_timeout(5.0), Duration::from_secs(20));
        assert_eq!(config.unit_timeout(f64::NAN), Duration::from_secs(10));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.yaml");
        std::fs::write(
            &path,
            "timeout: 3s\nparallel: 4\npolicy: exhaustive\nk_values: [1, 5]\n",
        )
        .unwrap();

        let config = EvalConfig::from_file(&path).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.effective_parallel(), 4);
        assert_eq!(config.policy, RunPolicy::Exhaustive);
        assert_eq!(config.k_values, vec![1, 5]);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.json");
        std::fs::write(&path, r#"{"base_only": true, "memory_limit_bytes": null}"#).unwrap();

        let config = EvalConfig::from_file(&path).unwrap();
        assert!(config.base_only);
        assert!(config.memory_limit_bytes.is_none());
    }
}
