//! Test program assembly
//!
//! Turns a problem, a candidate program text and its expected outputs into a
//! single self-contained Python program. Assembly is pure string building;
//! nothing here executes code.

mod assembler;
mod harness;
mod oracle;

pub use assembler::assemble;
pub use oracle::{parse_recording, recorder_program};

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which test batteries a unit runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMode {
    /// Original tests only
    Base,
    /// Original tests followed by the supplementary ones
    Full,
}

impl TestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestMode::Base => "base",
            TestMode::Full => "full",
        }
    }
}

/// How a program reacts to a failed comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPolicy {
    /// Stop at the first mismatch
    #[default]
    FailFast,
    /// Run every test and report a boolean per test
    Exhaustive,
}

impl RunPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPolicy::FailFast => "fail_fast",
            RunPolicy::Exhaustive => "exhaustive",
        }
    }
}

/// Test battery a test belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    Base,
    Plus,
}

/// Stable identifier of one test: `base/<i>` or `plus/<i>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestId {
    pub suite: Suite,
    pub index: usize,
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suite {
            Suite::Base => write!(f, "base/{}", self.index),
            Suite::Plus => write!(f, "plus/{}", self.index),
        }
    }
}

/// An assembled, runnable test program
#[derive(Debug, Clone)]
pub struct TestProgram {
    /// Complete Python source
    pub source: String,

    /// Test identifiers in execution order, base tests first
    pub tests: Vec<TestId>,

    /// Prefix of every structured line the harness writes
    pub tag: String,

    /// Battery selection the program was assembled for
    pub mode: TestMode,

    /// Comparison policy the program was assembled for
    pub policy: RunPolicy,
}

impl TestProgram {
    /// Number of tests the program runs
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Structured lines on stdout carrying this program's tag
    pub fn markers<'a>(&'a self, stdout: &'a str) -> impl Iterator<Item = Marker<'a>> + 'a {
        parse_markers(stdout, &self.tag)
    }
}

/// One structured line written by the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    pub kind: &'a str,
    pub payload: &'a str,
}

pub(crate) fn parse_markers<'a>(stdout: &'a str, tag: &'a str) -> impl Iterator<Item = Marker<'a>> + 'a {
    stdout.lines().filter_map(move |line| {
        let rest = line.strip_prefix(tag)?.strip_prefix(' ')?;
        let (kind, payload) = rest.split_once(' ').unwrap_or((rest, ""));
        Some(Marker { kind, payload })
    })
}

/// Per-program marker tag: `@@pluseval-` plus 12 hex digits of a content hash
pub(crate) fn marker_tag(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("@@pluseval-{}", &digest[..12])
}

pub(crate) fn test_ids(base: usize, plus: usize) -> Vec<TestId> {
    (0..base)
        .map(|index| TestId {
            suite: Suite::Base,
            index,
        })
        .chain((0..plus).map(|index| TestId {
            suite: Suite::Plus,
            index,
        }))
        .collect()
}
