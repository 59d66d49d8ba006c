//! aerostore - A uniform asynchronous file-storage layer
//!
//! One chunked, non-blocking read interface over heterogeneous storage
//! media: an in-process memory spool, the local filesystem, or an
//! S3-compatible object store.
//!
//! ```ignore
//! use aerostore::{FileStorage, MemoryBackend};
//!
//! let storage = FileStorage::new(MemoryBackend::new());
//! storage.write("avatars/1.png", png_bytes).await?;
//! let mut source = storage.open("avatars/1.png").await?;
//! while !source.read(8192).await?.is_empty() { /* ... */ }
//! ```

pub mod backends;
pub mod config;
pub mod errors;
pub mod io;
pub mod paths;
pub mod server;
pub mod storage;

pub use backends::{LocalBackend, MemoryBackend, S3Backend, S3Config, StorageBackend};
pub use config::StorageConfig;
pub use errors::{StorageError, StorageResult};
pub use io::{BoxChunkSource, ChunkSource, Lines, SpooledTempFile};
pub use server::{file_server, FileServerConfig};
pub use storage::{DataSource, FileStorage};
