//! In-memory cache

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CacheKey, OutcomeCache};
use crate::error::EvalResult;
use crate::outcome::OutcomeRecord;

/// Process-local cache, lost when the run ends
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, OutcomeRecord>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> EvalResult<Option<OutcomeRecord>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: CacheKey, record: OutcomeRecord) -> EvalResult<()> {
        self.entries.insert(key, record);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
