//! Allocation of unique temporary file paths.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use uuid::Uuid;

/// Hands out filesystem paths that no other job will receive.
///
/// Allocation only names the file; nothing is created on disk until
/// `create_file` is called for it.
#[async_trait]
pub trait TempPathAllocator: Send + Sync {
    fn allocate(&self, suffix: &str) -> PathBuf;

    /// Create `path` for writing. Fails if anything already exists there.
    async fn create_file(&self, path: &Path) -> std::io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
    }
}

/// Allocates `<dir>/<prefix>-<uuid><suffix>` paths
#[derive(Debug, Clone)]
pub struct SystemTempPaths {
    dir: PathBuf,
    prefix: String,
}

impl SystemTempPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "pngcrush-stream".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

#[async_trait]
impl TempPathAllocator for SystemTempPaths {
    fn allocate(&self, suffix: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}{}", self.prefix, Uuid::new_v4(), suffix))
    }
}
