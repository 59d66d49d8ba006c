//! # Storage Backend Trait

pub mod local;
pub mod memory;
pub mod s3;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use s3::{S3Backend, S3Config};

use async_trait::async_trait;

use crate::errors::StorageResult;
use crate::io::BoxChunkSource;

/// Backend trait for file storage.
///
/// One concrete type per storage medium. Every method is safe to retry at
/// the caller's discretion; none retries internally. Partial failure
/// mid-stream may leave a partially written object at the destination.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Persist every chunk of `data` at `path`, in source order, replacing
    /// any existing object
    async fn write(&self, path: &str, data: BoxChunkSource) -> StorageResult<()>;

    /// Open the object at `path` for sequential reading from offset 0.
    /// `chunk_size` is a hint; backends may ignore it.
    async fn read(&self, path: &str, chunk_size: usize) -> StorageResult<BoxChunkSource>;

    /// Delete the object at `path`
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Check whether an object exists at `path`
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Resolve an access URL for `path`
    async fn url(&self, path: &str) -> StorageResult<String>;

    /// Backend-native absolute locator for `path`
    fn abspath(&self, path: &str) -> String;
}
