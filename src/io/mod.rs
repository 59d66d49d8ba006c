//! # Streaming I/O
//!
//! The chunked read contract shared by every backend, plus line-oriented
//! iteration and chunked stream conversion over any source.

pub mod adapter;
pub mod spool;

pub use adapter::{BlockingSource, BytesSource, FileSource, SharedSpool, SpooledSource};
pub use spool::{SpooledTempFile, DEFAULT_SPOOL_MAX_SIZE};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::errors::StorageResult;

/// Sequential, single-pass byte producer.
///
/// `read` returns between 0 and `max` bytes. An empty result signals end of
/// stream and is terminal: once a source returns empty, every subsequent
/// read also returns empty. Sources are exclusively owned by the call that
/// consumes them and are never reused afterwards.
#[async_trait]
pub trait ChunkSource: Send {
    /// Read up to `max` bytes; empty means end of stream
    async fn read(&mut self, max: usize) -> StorageResult<Bytes>;
}

/// Owned, type-erased chunk source
pub type BoxChunkSource = Box<dyn ChunkSource>;

const LINE_CHUNK_SIZE: usize = 8 * 1024;

/// Line-oriented iteration over a chunk source.
///
/// Splits on `\n`, keeping the newline with each line, so concatenating
/// every yielded line reproduces the source bytes exactly. Finite and not
/// restartable: a single pass over the underlying cursor.
pub struct Lines {
    source: BoxChunkSource,
    buffer: Vec<u8>,
    done: bool,
}

impl Lines {
    pub fn new(source: BoxChunkSource) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Next line including its trailing newline; `None` after the last line
    pub async fn next_line(&mut self) -> StorageResult<Option<Bytes>> {
        loop {
            if let Some(at) = self.buffer.iter().position(|&b| b == b'\n') {
                let rest = self.buffer.split_off(at + 1);
                let line = std::mem::replace(&mut self.buffer, rest);
                return Ok(Some(Bytes::from(line)));
            }
            if self.done {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let last = std::mem::take(&mut self.buffer);
                return Ok(Some(Bytes::from(last)));
            }
            let chunk = self.source.read(LINE_CHUNK_SIZE).await?;
            if chunk.is_empty() {
                self.done = true;
            } else {
                self.buffer.extend_from_slice(&chunk);
            }
        }
    }
}

/// Convert a source into a finite, non-restartable stream of byte chunks.
///
/// The stream ends at the source's first empty read; an error ends it after
/// yielding the error.
pub fn chunk_stream(
    source: BoxChunkSource,
    chunk_size: usize,
) -> impl Stream<Item = StorageResult<Bytes>> + Send {
    let chunk_size = chunk_size.max(1);
    futures_util::stream::unfold(Some(source), move |state| async move {
        let mut source = state?;
        match source.read(chunk_size).await {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => Some((Ok(chunk), Some(source))),
            Err(err) => Some((Err(err), None)),
        }
    })
}
