//! Append-only JSONL cache file
//!
//! Each line is one `{"key": ..., "record": ...}` object. A torn final line
//! left by a killed process is skipped on load.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{CacheKey, OutcomeCache};
use crate::error::{EvalError, EvalResult};
use crate::outcome::OutcomeRecord;

#[derive(Debug, Serialize, Deserialize)]
struct Line {
    key: CacheKey,
    record: OutcomeRecord,
}

/// Cache persisted as one JSON object per line
#[derive(Debug)]
pub struct JsonlCache {
    path: PathBuf,
    index: DashMap<CacheKey, OutcomeRecord>,
    file: Mutex<File>,
}

impl JsonlCache {
    /// Open or create the cache file and load its entries
    pub async fn open(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| EvalError::io(parent, e))?;
        }

        let index = DashMap::new();
        let mut needs_newline = false;
        match fs::read_to_string(&path).await {
            Ok(content) => {
                let mut skipped = 0usize;
                for line in content.lines().filter(|l| !l.trim().is_empty()) {
                    match serde_json::from_str::<Line>(line) {
                        Ok(entry) => {
                            index.insert(entry.key, entry.record);
                        }
                        Err(_) => skipped += 1,
                    }
                }
                if skipped > 0 {
                    tracing::warn!("Skipped {} unreadable cache line(s) in {:?}", skipped, path);
                }
                needs_newline = !content.is_empty() && !content.ends_with('\n');
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(EvalError::io(&path, e)),
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| EvalError::io(&path, e))?;
        if needs_newline {
            file.write_all(b"\n")
                .await
                .map_err(|e| EvalError::io(&path, e))?;
        }

        tracing::debug!("Opened cache {:?} with {} entries", path, index.len());

        Ok(Self {
            path,
            index,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutcomeCache for JsonlCache {
    async fn get(&self, key: &CacheKey) -> EvalResult<Option<OutcomeRecord>> {
        Ok(self.index.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: CacheKey, record: OutcomeRecord) -> EvalResult<()> {
        let mut line = serde_json::to_string(&Line {
            key: key.clone(),
            record: record.clone(),
        })?;
        line.push('\n');

        {
            let mut file = self.file.lock().await;
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| EvalError::io(&self.path, e))?;
            file.flush()
                .await
                .map_err(|e| EvalError::io(&self.path, e))?;
        }

        self.index.insert(key, record);
        Ok(())
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use crate::program::{RunPolicy, TestMode};
    use tempfile::TempDir;

    fn key(task: &str) -> CacheKey {
        CacheKey::new(task, "src", TestMode::Full, RunPolicy::Exhaustive)
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.jsonl");

        {
            let cache = JsonlCache::open(&path).await.unwrap();
            cache.put(key("a"), Outcome::Pass.into()).await.unwrap();
            cache
                .put(
                    key("b"),
                    OutcomeRecord::with_per_test(Outcome::Fail(1), vec![true, false]),
                )
                .await
                .unwrap();
        }

        let cache = JsonlCache::open(&path).await.unwrap();
        assert_eq!(cache.len(), 2);
        let b = cache.get(&key("b")).await.unwrap().unwrap();
        assert_eq!(b.per_test, Some(vec![true, false]));
    }

    #[tokio::test]
    async fn test_torn_line_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.jsonl");

        {
            let cache = JsonlCache::open(&path).await.unwrap();
            cache.put(key("a"), Outcome::Timeout.into()).await.unwrap();
        }
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str(r#"{"key": "abc", "rec"#);
        std::fs::write(&path, content).unwrap();

        let cache = JsonlCache::open(&path).await.unwrap();
        assert_eq!(cache.len(), 1);
        cache.put(key("c"), Outcome::Pass.into()).await.unwrap();
        drop(cache);

        let reopened = JsonlCache::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get(&key("c")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_later_write_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.jsonl");

        {
            let cache = JsonlCache::open(&path).await.unwrap();
            cache.put(key("a"), Outcome::Timeout.into()).await.unwrap();
            cache.put(key("a"), Outcome::Pass.into()).await.unwrap();
        }

        let cache = JsonlCache::open(&path).await.unwrap();
        assert_eq!(cache.get(&key("a")).await.unwrap(), Some(Outcome::Pass.into()));
    }
}
