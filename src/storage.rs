//! # Storage Facade
//!
//! The single entry point callers use. Wraps one backend, normalizes
//! caller-supplied input into a chunk source and delegates; holds no mutable
//! state of its own, so one instance is safely shared across tasks.

use bytes::Bytes;
use futures_util::Stream;

use crate::backends::StorageBackend;
use crate::errors::StorageResult;
use crate::io::{chunk_stream, BlockingSource, BoxChunkSource, BytesSource};

/// Default chunk size for [`FileStorage::iterator`] and [`FileStorage::open`]
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Caller-supplied write input: raw bytes, a blocking `Read` handle, or an
/// already-conformant chunk source
pub enum DataSource {
    Bytes(Bytes),
    Reader(Box<dyn std::io::Read + Send>),
    Source(BoxChunkSource),
}

impl DataSource {
    fn into_source(self) -> BoxChunkSource {
        match self {
            DataSource::Bytes(data) => Box::new(BytesSource::new(data)),
            DataSource::Reader(reader) => Box::new(BlockingSource::new(reader)),
            DataSource::Source(source) => source,
        }
    }
}

impl From<Bytes> for DataSource {
    fn from(data: Bytes) -> Self {
        DataSource::Bytes(data)
    }
}

impl From<Vec<u8>> for DataSource {
    fn from(data: Vec<u8>) -> Self {
        DataSource::Bytes(data.into())
    }
}

impl From<&[u8]> for DataSource {
    fn from(data: &[u8]) -> Self {
        DataSource::Bytes(Bytes::copy_from_slice(data))
    }
}

impl From<std::fs::File> for DataSource {
    fn from(file: std::fs::File) -> Self {
        DataSource::Reader(Box::new(file))
    }
}

impl From<BoxChunkSource> for DataSource {
    fn from(source: BoxChunkSource) -> Self {
        DataSource::Source(source)
    }
}

/// File storage facade over a single backend
#[derive(Debug)]
pub struct FileStorage {
    backend: Box<dyn StorageBackend>,
}

impl FileStorage {
    /// Wrap a backend
    pub fn new<B: StorageBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Write `data` at `path`, replacing any existing object
    pub async fn write(&self, path: &str, data: impl Into<DataSource>) -> StorageResult<()> {
        self.backend.write(path, data.into().into_source()).await
    }

    /// Open the object at `path` for sequential reading
    pub async fn open(&self, path: &str) -> StorageResult<BoxChunkSource> {
        self.backend.read(path, DEFAULT_CHUNK_SIZE).await
    }

    /// Pull-based finite sequence of byte chunks, ending at the first
    /// zero-length read. Not restartable.
    pub async fn iterator(
        &self,
        path: &str,
        chunk_size: usize,
    ) -> StorageResult<impl Stream<Item = StorageResult<Bytes>> + Send> {
        let source = self.backend.read(path, chunk_size).await?;
        Ok(chunk_stream(source, chunk_size))
    }

    /// Check whether an object exists at `path`
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.backend.exists(path).await
    }

    /// Delete the object at `path`
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        self.backend.delete(path).await
    }

    /// Resolve an access URL for `path`
    pub async fn url(&self, path: &str) -> StorageResult<String> {
        self.backend.url(path).await
    }

    /// Backend-native absolute locator for `path`
    pub fn abspath(&self, path: &str) -> String {
        self.backend.abspath(path)
    }
}
