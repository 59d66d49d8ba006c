//! # S3 Backend
//!
//! S3-compatible object store backend built on `object_store`. Every
//! operation constructs a short-lived client scoped to that single call;
//! nothing is cached across calls.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{ClientOptions, ObjectStore};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::StorageBackend;
use crate::errors::{StorageError, StorageResult};
use crate::io::{BoxChunkSource, ChunkSource};

/// Default lifetime of presigned URLs (seconds)
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

const WRITE_CHUNK_SIZE: usize = 16 * 1024;
const DEFAULT_REGION: &str = "us-east-2";

fn default_signed_url_ttl() -> u64 {
    DEFAULT_SIGNED_URL_TTL_SECS
}

/// S3 backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Target bucket
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// AWS region (default: "us-east-2")
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override for S3-compatible stores (e.g. MinIO)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Expiry of URLs returned by `url` (default: 3600)
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
}

/// S3-compatible object store backend
#[derive(Debug)]
pub struct S3Backend {
    config: S3Config,
}

impl S3Backend {
    /// Create a backend, validating the configuration up front.
    ///
    /// Fails fast with [`StorageError::Configuration`] before any operation
    /// is attempted.
    pub fn new(config: S3Config) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::Configuration("bucket name is required".into()));
        }
        if config.access_key_id.is_empty() || config.secret_access_key.is_empty() {
            return Err(StorageError::Configuration(
                "access key id and secret access key are required".into(),
            ));
        }
        Ok(Self { config })
    }

    /// Build a client for a single call
    fn connect(&self, content_type: Option<&str>) -> StorageResult<AmazonS3> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&self.config.bucket)
            .with_access_key_id(&self.config.access_key_id)
            .with_secret_access_key(&self.config.secret_access_key)
            .with_region(self.config.region.as_deref().unwrap_or(DEFAULT_REGION));

        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.with_endpoint(endpoint.trim_end_matches('/'));
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }
        if let Some(content_type) = content_type {
            builder =
                builder.with_client_options(ClientOptions::new().with_default_content_type(content_type));
        }

        builder
            .build()
            .map_err(|e| StorageError::Configuration(e.to_string()))
    }
}

fn translate(err: object_store::Error, path: &str) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
        other => StorageError::Remote(other),
    }
}

/// Adapts a remote response body stream to the chunked read contract
struct ObjectSource {
    stream: BoxStream<'static, object_store::Result<Bytes>>,
    pending: Bytes,
    path: String,
    done: bool,
}

impl ObjectSource {
    fn new(stream: BoxStream<'static, object_store::Result<Bytes>>, path: &str) -> Self {
        Self {
            stream,
            pending: Bytes::new(),
            path: path.to_string(),
            done: false,
        }
    }
}

#[async_trait]
impl ChunkSource for ObjectSource {
    async fn read(&mut self, max: usize) -> StorageResult<Bytes> {
        while self.pending.is_empty() && !self.done {
            match self.stream.next().await {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(err)) => {
                    self.done = true;
                    return Err(translate(err, &self.path));
                }
                None => self.done = true,
            }
        }
        let n = max.min(self.pending.len());
        Ok(self.pending.split_to(n))
    }
}

// Operations are generic over the store so the same code paths drive both
// the per-call AmazonS3 client and the in-memory store used in tests.

async fn write_to(store: &dyn ObjectStore, path: &str, mut data: BoxChunkSource) -> StorageResult<()> {
    let location = ObjectPath::from(path);
    let (_upload_id, mut writer) = store
        .put_multipart(&location)
        .await
        .map_err(|e| translate(e, path))?;

    loop {
        let chunk = data.read(WRITE_CHUNK_SIZE).await?;
        if chunk.is_empty() {
            break;
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| StorageError::io(format!("write s3:{path}"), e))?;
    }
    writer
        .shutdown()
        .await
        .map_err(|e| StorageError::io(format!("write s3:{path}"), e))?;
    tracing::debug!(path, "object uploaded");
    Ok(())
}

async fn read_from(store: &dyn ObjectStore, path: &str) -> StorageResult<BoxChunkSource> {
    let location = ObjectPath::from(path);
    let result = store.get(&location).await.map_err(|e| translate(e, path))?;
    Ok(Box::new(ObjectSource::new(result.into_stream(), path)))
}

async fn exists_in(store: &dyn ObjectStore, path: &str) -> StorageResult<bool> {
    let location = ObjectPath::from(path);
    match store.head(&location).await {
        Ok(_) => Ok(true),
        Err(object_store::Error::NotFound { .. }) => Ok(false),
        Err(err) => Err(StorageError::Remote(err)),
    }
}

async fn delete_from(store: &dyn ObjectStore, path: &str) -> StorageResult<()> {
    let location = ObjectPath::from(path);
    match store.delete(&location).await {
        Ok(()) => Ok(()),
        // Deleting an absent key succeeds silently, matching the other backends
        Err(object_store::Error::NotFound { .. }) => Ok(()),
        Err(err) => Err(StorageError::Remote(err)),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn write(&self, path: &str, data: BoxChunkSource) -> StorageResult<()> {
        let content_type = mime_guess::from_path(path).first_raw();
        let store = self.connect(content_type)?;
        write_to(&store, path, data).await
    }

    async fn read(&self, path: &str, _chunk_size: usize) -> StorageResult<BoxChunkSource> {
        let store = self.connect(None)?;
        read_from(&store, path).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let store = self.connect(None)?;
        delete_from(&store, path).await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let store = self.connect(None)?;
        exists_in(&store, path).await
    }

    async fn url(&self, path: &str) -> StorageResult<String> {
        let store = self.connect(None)?;
        let location = ObjectPath::from(path);
        let expires_in = Duration::from_secs(self.config.signed_url_ttl_secs);
        let url = store
            .signed_url(Method::GET, &location, expires_in)
            .await
            .map_err(|e| translate(e, path))?;
        Ok(url.to_string())
    }

    fn abspath(&self, path: &str) -> String {
        // No filesystem-native locator exists for a remote object
        path.to_string()
    }
}
