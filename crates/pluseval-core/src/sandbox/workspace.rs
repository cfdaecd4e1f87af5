//! Per-unit working directory

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;

use crate::error::ExecError;

/// Temporary directory owned by one execution, removed on drop
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace
    pub fn new() -> Result<Self, ExecError> {
        let temp_dir = tempfile::Builder::new()
            .prefix("pluseval-")
            .tempdir()
            .map_err(ExecError::Workspace)?;
        Ok(Self { temp_dir })
    }

    /// Root path of the workspace
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file into the workspace and return its path
    pub async fn write(&self, name: &str, content: &str) -> Result<PathBuf, ExecError> {
        let path = self.root().join(name);
        fs::write(&path, content)
            .await
            .map_err(|source| ExecError::WriteProgram {
                path: path.clone(),
                source,
            })?;
        tracing::trace!("Wrote {} bytes to {:?}", content.len(), path);
        Ok(path)
    }
}
