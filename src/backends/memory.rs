//! # In-Memory Backend
//!
//! Keeps each object in a spooled buffer: small objects stay in process
//! memory, anything past the spool threshold rolls to a temp file.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use super::StorageBackend;
use crate::errors::{StorageError, StorageResult};
use crate::io::adapter::lock_spool;
use crate::io::{BoxChunkSource, SharedSpool, SpooledSource, SpooledTempFile, DEFAULT_SPOOL_MAX_SIZE};

const WRITE_CHUNK_SIZE: usize = 16 * 1024;

/// In-memory storage backend
#[derive(Debug)]
pub struct MemoryBackend {
    spool_max_size: usize,
    files: RwLock<HashMap<String, SharedSpool>>,
}

impl MemoryBackend {
    /// Create a backend with the default 1 MiB spool threshold
    pub fn new() -> Self {
        Self::with_spool_max_size(DEFAULT_SPOOL_MAX_SIZE)
    }

    /// Create a backend with a custom spool threshold
    pub fn with_spool_max_size(spool_max_size: usize) -> Self {
        Self {
            spool_max_size,
            files: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, path: &str) -> StorageResult<Option<SharedSpool>> {
        let files = self
            .files
            .read()
            .map_err(|_| StorageError::Internal("storage map lock poisoned".into()))?;
        Ok(files.get(path).cloned())
    }

    fn insert(&self, path: &str, spool: SharedSpool) -> StorageResult<()> {
        let mut files = self
            .files
            .write()
            .map_err(|_| StorageError::Internal("storage map lock poisoned".into()))?;
        files.insert(path.to_string(), spool);
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn write(&self, path: &str, mut data: BoxChunkSource) -> StorageResult<()> {
        // A fresh spool replaces whatever was stored before; concurrent
        // writers to the same path race and the last insert wins.
        let spool: SharedSpool = Arc::new(Mutex::new(SpooledTempFile::new(self.spool_max_size)));
        self.insert(path, Arc::clone(&spool))?;

        loop {
            let chunk = data.read(WRITE_CHUNK_SIZE).await?;
            if chunk.is_empty() {
                break;
            }
            // Re-check the roll state for every chunk: writing this chunk
            // may be what pushes the buffer to disk.
            let rolled = lock_spool(&spool)?.is_rolled();
            if rolled {
                let spool = Arc::clone(&spool);
                let path = path.to_string();
                tokio::task::spawn_blocking(move || -> StorageResult<()> {
                    let mut guard = lock_spool(&spool)?;
                    guard
                        .write_all(&chunk)
                        .map_err(|e| StorageError::io(format!("write memory:{path}"), e))
                })
                .await
                .map_err(|e| StorageError::Internal(format!("blocking write task failed: {e}")))??;
            } else {
                lock_spool(&spool)?
                    .write_all(&chunk)
                    .map_err(|e| StorageError::io(format!("write memory:{path}"), e))?;
            }
        }
        Ok(())
    }

    async fn read(&self, path: &str, _chunk_size: usize) -> StorageResult<BoxChunkSource> {
        let spool = self
            .entry(path)?
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;

        // Reposition to the start before handing the buffer out; a rolled
        // buffer seeks on the blocking pool.
        let rolled = lock_spool(&spool)?.is_rolled();
        if rolled {
            let spool = Arc::clone(&spool);
            tokio::task::spawn_blocking(move || -> StorageResult<()> {
                lock_spool(&spool)?
                    .rewind()
                    .map_err(|e| StorageError::io("rewind spooled buffer", e))
            })
            .await
            .map_err(|e| StorageError::Internal(format!("blocking seek task failed: {e}")))??;
        } else {
            lock_spool(&spool)?
                .rewind()
                .map_err(|e| StorageError::io("rewind spooled buffer", e))?;
        }

        Ok(Box::new(SpooledSource::new(spool)))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let mut files = self
            .files
            .write()
            .map_err(|_| StorageError::Internal("storage map lock poisoned".into()))?;
        files.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.entry(path)?.is_some())
    }

    async fn url(&self, path: &str) -> StorageResult<String> {
        // Memory-held objects have no externally reachable address
        Ok(format!("/{path}"))
    }

    fn abspath(&self, path: &str) -> String {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BytesSource;

    fn source(data: &[u8]) -> BoxChunkSource {
        Box::new(BytesSource::new(data.to_vec()))
    }

    async fn drain(mut src: BoxChunkSource) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let chunk = src.read(1024).await.unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        out
    }

    fn is_rolled(backend: &MemoryBackend, path: &str) -> bool {
        let spool = backend.entry(path).unwrap().unwrap();
        let rolled = spool.lock().unwrap().is_rolled();
        rolled
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let backend = MemoryBackend::new();
        backend.write("file.txt", source(b"content")).await.unwrap();

        assert!(backend.exists("file.txt").await.unwrap());
        let data = drain(backend.read("file.txt", 1024).await.unwrap()).await;
        assert_eq!(data, b"content");
    }

    #[tokio::test]
    async fn test_small_write_stays_in_memory() {
        let backend = MemoryBackend::with_spool_max_size(2);
        backend.write("f", source(b"aa")).await.unwrap();
        assert!(!is_rolled(&backend, "f"));
    }

    #[tokio::test]
    async fn test_overwrite_gets_fresh_spool() {
        let backend = MemoryBackend::with_spool_max_size(2);
        backend.write("f", source(b"aa")).await.unwrap();
        assert!(!is_rolled(&backend, "f"));

        backend.write("f", source(b"aaa")).await.unwrap();
        assert!(is_rolled(&backend, "f"));
        let data = drain(backend.read("f", 1024).await.unwrap()).await;
        assert_eq!(data, b"aaa");
    }

    #[tokio::test]
    async fn test_rolled_content_readable() {
        let backend = MemoryBackend::with_spool_max_size(4);
        backend.write("big", source(b"0123456789")).await.unwrap();
        assert!(is_rolled(&backend, "big"));

        let data = drain(backend.read("big", 3).await.unwrap()).await;
        assert_eq!(data, b"0123456789");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let result = backend.read("missing.txt", 1024).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_then_gone() {
        let backend = MemoryBackend::new();
        backend.write("f", source(b"x")).await.unwrap();
        backend.delete("f").await.unwrap();
        assert!(!backend.exists("f").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let backend = MemoryBackend::new();
        backend.delete("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_url_and_abspath() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.url("a/b.txt").await.unwrap(), "/a/b.txt");
        assert_eq!(backend.abspath("a/b.txt"), "a/b.txt");
    }

    #[tokio::test]
    async fn test_empty_object() {
        let backend = MemoryBackend::new();
        backend.write("empty", source(b"")).await.unwrap();
        assert!(backend.exists("empty").await.unwrap());
        let data = drain(backend.read("empty", 1024).await.unwrap()).await;
        assert!(data.is_empty());
    }
}
