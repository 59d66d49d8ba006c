//! # Stream Adapters
//!
//! [`ChunkSource`] implementations over the concrete resources a backend can
//! hand out: an in-memory byte buffer, a blocking `Read` handle, an async
//! file and a shared spooled buffer.
//!
//! Resources whose native read would block the calling thread are offloaded
//! to the tokio blocking pool; in-memory reads run inline. The spooled
//! adapter queries the buffer's rolled state on every call because the spool
//! can roll between two reads of the same logical stream.

use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use super::spool::SpooledTempFile;
use super::ChunkSource;
use crate::errors::{StorageError, StorageResult};

/// Shared handle to a spooled buffer
pub type SharedSpool = Arc<Mutex<SpooledTempFile>>;

fn read_chunk<R: Read>(reader: &mut R, max: usize) -> std::io::Result<Bytes> {
    let mut buf = vec![0u8; max];
    let n = reader.read(&mut buf)?;
    buf.truncate(n);
    Ok(Bytes::from(buf))
}

pub(crate) fn lock_spool(spool: &SharedSpool) -> StorageResult<MutexGuard<'_, SpooledTempFile>> {
    spool
        .lock()
        .map_err(|_| StorageError::Internal("spool lock poisoned".into()))
}

/// In-memory byte buffer; reads never block and run inline
#[derive(Debug)]
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl ChunkSource for BytesSource {
    async fn read(&mut self, max: usize) -> StorageResult<Bytes> {
        let n = max.min(self.data.len());
        Ok(self.data.split_to(n))
    }
}

/// Wraps a blocking `Read` handle; every read runs on the blocking pool
pub struct BlockingSource {
    inner: Option<Box<dyn Read + Send>>,
}

impl BlockingSource {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Some(Box::new(reader)),
        }
    }
}

#[async_trait]
impl ChunkSource for BlockingSource {
    async fn read(&mut self, max: usize) -> StorageResult<Bytes> {
        // The handle is lost if the offloaded task dies; treat that as EOF.
        let Some(mut reader) = self.inner.take() else {
            return Ok(Bytes::new());
        };
        let (reader, result) = tokio::task::spawn_blocking(move || {
            let result = read_chunk(&mut reader, max);
            (reader, result)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("blocking read task failed: {e}")))?;
        self.inner = Some(reader);
        result.map_err(|e| StorageError::io("read from blocking handle", e))
    }
}

/// Async file handle; tokio routes each read through its blocking pool
#[derive(Debug)]
pub struct FileSource {
    file: tokio::fs::File,
}

impl FileSource {
    pub fn new(file: tokio::fs::File) -> Self {
        Self { file }
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    async fn read(&mut self, max: usize) -> StorageResult<Bytes> {
        let mut buf = vec![0u8; max];
        let n = self
            .file
            .read(&mut buf)
            .await
            .map_err(|e| StorageError::io("read from file", e))?;
        buf.truncate(n);
        Ok(Bytes::from(buf))
    }
}

/// Reads a shared spooled buffer.
///
/// The rolled state is queried on every call, never cached: an unrolled
/// buffer is read inline, a rolled one on the blocking pool.
#[derive(Debug)]
pub struct SpooledSource {
    spool: SharedSpool,
}

impl SpooledSource {
    pub fn new(spool: SharedSpool) -> Self {
        Self { spool }
    }
}

#[async_trait]
impl ChunkSource for SpooledSource {
    async fn read(&mut self, max: usize) -> StorageResult<Bytes> {
        let rolled = lock_spool(&self.spool)?.is_rolled();
        if rolled {
            let spool = Arc::clone(&self.spool);
            tokio::task::spawn_blocking(move || -> StorageResult<Bytes> {
                let mut guard = lock_spool(&spool)?;
                read_chunk(&mut *guard, max).map_err(|e| StorageError::io("read spooled buffer", e))
            })
            .await
            .map_err(|e| StorageError::Internal(format!("blocking read task failed: {e}")))?
        } else {
            let mut guard = lock_spool(&self.spool)?;
            read_chunk(&mut *guard, max).map_err(|e| StorageError::io("read spooled buffer", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn drain(source: &mut dyn ChunkSource, max: usize) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let chunk = source.read(max).await.unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn test_bytes_source_chunked() {
        let mut source = BytesSource::new(&b"abcdef"[..]);
        assert_eq!(source.read(4).await.unwrap(), Bytes::from_static(b"abcd"));
        assert_eq!(source.read(4).await.unwrap(), Bytes::from_static(b"ef"));
        // terminal: every further read stays empty
        assert!(source.read(4).await.unwrap().is_empty());
        assert!(source.read(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blocking_source() {
        let mut source = BlockingSource::new(std::io::Cursor::new(b"hello world".to_vec()));
        assert_eq!(drain(&mut source, 3).await, b"hello world");
        assert!(source.read(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spooled_source_in_memory() {
        let mut spool = SpooledTempFile::new(1024);
        spool.write_all(b"cont\nent").unwrap();
        spool.rewind().unwrap();
        assert!(!spool.is_rolled());

        let mut source = SpooledSource::new(Arc::new(Mutex::new(spool)));
        assert_eq!(drain(&mut source, 4).await, b"cont\nent");
    }

    #[tokio::test]
    async fn test_spooled_source_rolled() {
        let mut spool = SpooledTempFile::new(1);
        spool.write_all(b"cont\nent").unwrap();
        spool.rewind().unwrap();
        assert!(spool.is_rolled());

        let mut source = SpooledSource::new(Arc::new(Mutex::new(spool)));
        assert_eq!(drain(&mut source, 4).await, b"cont\nent");
    }

    #[tokio::test]
    async fn test_spooled_source_sees_roll_between_reads() {
        let spool = Arc::new(Mutex::new(SpooledTempFile::new(8)));
        {
            let mut guard = spool.lock().unwrap();
            guard.write_all(b"before").unwrap();
            guard.rewind().unwrap();
        }

        let mut source = SpooledSource::new(Arc::clone(&spool));
        assert_eq!(source.read(3).await.unwrap(), Bytes::from_static(b"bef"));

        // roll the buffer mid-stream; the adapter must pick the blocking path
        // up without losing the read position
        {
            let mut guard = spool.lock().unwrap();
            guard.roll().unwrap();
            assert!(guard.is_rolled());
        }
        assert_eq!(drain(&mut source, 3).await, b"ore");
    }
}
