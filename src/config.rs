//! # Storage Configuration
//!
//! Declarative backend selection, deserializable from JSON config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backends::{LocalBackend, MemoryBackend, S3Backend, S3Config};
use crate::errors::StorageResult;
use crate::io::DEFAULT_SPOOL_MAX_SIZE;
use crate::storage::FileStorage;

fn default_spool_max_size() -> usize {
    DEFAULT_SPOOL_MAX_SIZE
}

fn default_base_url() -> String {
    "/".to_string()
}

/// Backend selection and options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory spooled storage
    Memory {
        /// In-memory-to-disk roll-over point (default: 1,048,576)
        #[serde(default = "default_spool_max_size")]
        spool_max_size: usize,
    },
    /// Local filesystem storage
    Local {
        /// Root all relative paths are resolved against
        base_dir: PathBuf,
        /// Create missing parent directories on write
        #[serde(default)]
        mkdirs: bool,
        /// Prefix returned by `url`
        #[serde(default = "default_base_url")]
        base_url: String,
    },
    /// S3-compatible object store
    S3(S3Config),
}

impl StorageConfig {
    /// Construct the configured backend behind a storage facade
    pub fn build(self) -> StorageResult<FileStorage> {
        match self {
            StorageConfig::Memory { spool_max_size } => Ok(FileStorage::new(
                MemoryBackend::with_spool_max_size(spool_max_size),
            )),
            StorageConfig::Local {
                base_dir,
                mkdirs,
                base_url,
            } => Ok(FileStorage::new(
                LocalBackend::new(base_dir).mkdirs(mkdirs).base_url(base_url),
            )),
            StorageConfig::S3(config) => Ok(FileStorage::new(S3Backend::new(config)?)),
        }
    }
}
