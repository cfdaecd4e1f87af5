//! Durable outcome cache
//!
//! Outcomes are keyed by a content hash of the evaluation unit, so an
//! interrupted run resumes without re-executing completed units. Entries are
//! never invalidated automatically.

mod jsonl;
mod memory;

pub use jsonl::JsonlCache;
pub use memory::MemoryCache;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EvalResult;
use crate::outcome::OutcomeRecord;
use crate::program::{RunPolicy, TestMode};

/// Content hash identifying one evaluation unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key from the unit's task, program text, mode and policy
    pub fn new(task_id: &str, sample_source: &str, mode: TestMode, policy: RunPolicy) -> Self {
        let mut hasher = Sha256::new();
        for part in [task_id, sample_source, mode.as_str(), policy.as_str()] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// Key-value store for unit outcomes
#[async_trait]
pub trait OutcomeCache: Send + Sync {
    /// Look up a previously stored outcome
    async fn get(&self, key: &CacheKey) -> EvalResult<Option<OutcomeRecord>>;

    /// Persist an outcome; a later write for the same key wins
    async fn put(&self, key: CacheKey, record: OutcomeRecord) -> EvalResult<()>;

    /// Number of stored entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
