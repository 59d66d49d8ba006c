//! # File Server
//!
//! Thin HTTP adapter over the storage facade: GET and HEAD only. Absolute
//! URLs returned by the backend become redirects; everything else is
//! streamed with a guessed MIME type and a Content-Disposition header.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::errors::{StorageError, StorageResult};
use crate::io::chunk_stream;
use crate::storage::FileStorage;

const STREAM_CHUNK_SIZE: usize = 8 * 1024;

// Characters escaped inside the Content-Disposition filename quotes
const FILENAME_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'%').add(b'\\');

/// File server options
#[derive(Debug, Clone)]
pub struct FileServerConfig {
    /// Serve downloads as attachments instead of inline (default: true)
    pub as_attachment: bool,
    /// Status used when redirecting to an absolute URL (default: 302)
    pub redirect_status: StatusCode,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            as_attachment: true,
            redirect_status: StatusCode::FOUND,
        }
    }
}

struct ServerState {
    storage: Arc<FileStorage>,
    config: FileServerConfig,
}

/// Build a router serving every object under the given storage.
///
/// GET and HEAD are handled; any other method gets 405.
pub fn file_server(storage: Arc<FileStorage>, config: FileServerConfig) -> Router {
    let state = Arc::new(ServerState { storage, config });
    Router::new()
        .route("/*path", get(serve_file))
        .with_state(state)
}

async fn serve_file(State(state): State<Arc<ServerState>>, Path(path): Path<String>) -> Response {
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.split('/').any(|part| part == "..") {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    match respond(&state, path).await {
        Ok(response) => response,
        Err(err) => {
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, err.to_string()).into_response()
        }
    }
}

async fn respond(state: &ServerState, path: &str) -> StorageResult<Response> {
    // Backends with an externally reachable address (signed URLs, a public
    // base URL) answer with a redirect instead of proxying bytes.
    let url = state.storage.url(path).await?;
    if url.starts_with("http://") || url.starts_with("https://") {
        return Response::builder()
            .status(state.config.redirect_status)
            .header(header::LOCATION, url)
            .body(Body::empty())
            .map_err(|e| StorageError::Internal(e.to_string()));
    }

    if !state.storage.exists(path).await? {
        return Ok((StatusCode::NOT_FOUND, "File not found").into_response());
    }

    let source = state.storage.open(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let filename = path.rsplit('/').next().unwrap_or(path);
    let disposition = if state.config.as_attachment {
        "attachment"
    } else {
        "inline"
    };
    let content_disposition = format!(
        "{}; filename=\"{}\"",
        disposition,
        utf8_percent_encode(filename, FILENAME_ESCAPE)
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .body(Body::from_stream(chunk_stream(source, STREAM_CHUNK_SIZE)))
        .map_err(|e| StorageError::Internal(e.to_string()))
}
