//! # Local Filesystem Backend

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::StorageBackend;
use crate::errors::{StorageError, StorageResult};
use crate::io::{BoxChunkSource, FileSource};

const WRITE_CHUNK_SIZE: usize = 8 * 1024;

/// Local filesystem storage backend.
///
/// Paths are resolved relative to a base directory. Parent directories are
/// only created on write when `mkdirs` is enabled; otherwise a write into a
/// missing directory fails with an I/O error.
#[derive(Debug)]
pub struct LocalBackend {
    base_dir: PathBuf,
    mkdirs: bool,
    base_url: String,
}

impl LocalBackend {
    /// Create a backend rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            mkdirs: false,
            base_url: "/".to_string(),
        }
    }

    /// Create missing parent directories on write
    pub fn mkdirs(mut self, mkdirs: bool) -> Self {
        self.mkdirs = mkdirs;
        self
    }

    /// Prefix returned by [`url`](StorageBackend::url)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn write(&self, path: &str, mut data: BoxChunkSource) -> StorageResult<()> {
        let full_path = self.full_path(path);

        if self.mkdirs {
            if let Some(parent) = full_path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::io(format!("mkdir local:{path}"), e))?;
            }
        }

        let mut file = tokio::fs::File::create(&full_path)
            .await
            .map_err(|e| StorageError::io(format!("write local:{path}"), e))?;
        loop {
            let chunk = data.read(WRITE_CHUNK_SIZE).await?;
            if chunk.is_empty() {
                break;
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::io(format!("write local:{path}"), e))?;
        }
        file.flush()
            .await
            .map_err(|e| StorageError::io(format!("write local:{path}"), e))?;
        Ok(())
    }

    async fn read(&self, path: &str, _chunk_size: usize) -> StorageResult<BoxChunkSource> {
        let file = tokio::fs::File::open(self.full_path(path))
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StorageError::NotFound(path.to_string())
                } else {
                    StorageError::io(format!("read local:{path}"), e)
                }
            })?;
        Ok(Box::new(FileSource::new(file)))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(format!("delete local:{path}"), e)),
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .map_err(|e| StorageError::io(format!("stat local:{path}"), e))
    }

    async fn url(&self, path: &str) -> StorageResult<String> {
        // Forward-slash join regardless of the host path separator
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    fn abspath(&self, path: &str) -> String {
        self.full_path(path).to_string_lossy().into_owned()
    }
}
