//! # Storage Errors

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by storage backends and the streaming adapters
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object exists at the given path. Every backend translates its
    /// native "missing" signal into this variant; nothing else is reclassified.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Local I/O failure, tagged with the operation and path that triggered it.
    /// Never retried internally.
    #[error("I/O failure in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote object-store transport or authentication failure, surfaced as-is
    #[error("Object store error: {0}")]
    Remote(#[source] object_store::Error),

    /// Missing or invalid construction input. Raised at build time, before
    /// any operation is attempted.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            StorageError::NotFound(_) => 404,
            StorageError::Io { .. } => 500,
            StorageError::Remote(_) => 500,
            StorageError::Configuration(_) => 500,
            StorageError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StorageError::NotFound("a.txt".into()).status_code(), 404);
        let err = StorageError::io("read local:a.txt", std::io::Error::other("disk gone"));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_io_context_in_message() {
        let err = StorageError::io("write local:a.txt", std::io::Error::other("full"));
        assert!(err.to_string().contains("write local:a.txt"));
    }
}
