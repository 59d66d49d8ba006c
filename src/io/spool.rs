//! # Spooled Temporary File
//!
//! A write-accumulating byte buffer that starts in memory and migrates to an
//! anonymous temporary file once a size threshold is exceeded.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Default roll-over threshold (1 MiB)
pub const DEFAULT_SPOOL_MAX_SIZE: usize = 1024 * 1024;

#[derive(Debug)]
enum SpoolState {
    Buffered(Cursor<Vec<u8>>),
    Rolled(File),
}

/// Byte buffer that rolls over to a temp file past `max_size` bytes.
///
/// The transition is one-way: once rolled, the buffer stays disk-backed for
/// the rest of its lifetime. A write that straddles the threshold flushes the
/// buffered bytes to the file first and then appends the new chunk, so no
/// bytes are lost or duplicated.
///
/// Callers must query [`is_rolled`](Self::is_rolled) on every access rather
/// than caching it, since any write can trigger the transition.
#[derive(Debug)]
pub struct SpooledTempFile {
    max_size: usize,
    state: SpoolState,
}

impl SpooledTempFile {
    /// Create an in-memory buffer with the given roll-over threshold
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            state: SpoolState::Buffered(Cursor::new(Vec::new())),
        }
    }

    /// Whether the buffer has migrated to disk
    pub fn is_rolled(&self) -> bool {
        matches!(self.state, SpoolState::Rolled(_))
    }

    /// Reset the cursor to the start, ready for sequential reading
    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    pub(crate) fn roll(&mut self) -> io::Result<()> {
        let SpoolState::Buffered(cursor) = &mut self.state else {
            return Ok(());
        };
        let pos = cursor.position();
        let mut file = tempfile::tempfile()?;
        file.write_all(cursor.get_ref())?;
        file.seek(SeekFrom::Start(pos))?;
        tracing::debug!(buffered = cursor.get_ref().len(), "spool rolled to disk");
        self.state = SpoolState::Rolled(file);
        Ok(())
    }
}

impl Write for SpooledTempFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let over_threshold = match &self.state {
            SpoolState::Buffered(cursor) => cursor.position() as usize + buf.len() > self.max_size,
            SpoolState::Rolled(_) => false,
        };
        if over_threshold {
            self.roll()?;
        }
        match &mut self.state {
            SpoolState::Buffered(cursor) => cursor.write(buf),
            SpoolState::Rolled(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            SpoolState::Buffered(cursor) => cursor.flush(),
            SpoolState::Rolled(file) => file.flush(),
        }
    }
}

impl Read for SpooledTempFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.state {
            SpoolState::Buffered(cursor) => cursor.read(buf),
            SpoolState::Rolled(file) => file.read(buf),
        }
    }
}

impl Seek for SpooledTempFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.state {
            SpoolState::Buffered(cursor) => cursor.seek(pos),
            SpoolState::Rolled(file) => file.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stays_in_memory_below_threshold() {
        let mut spool = SpooledTempFile::new(2);
        spool.write_all(b"aa").unwrap();
        assert!(!spool.is_rolled());
    }

    #[test]
    fn test_rolls_past_threshold() {
        let mut spool = SpooledTempFile::new(2);
        spool.write_all(b"aaa").unwrap();
        assert!(spool.is_rolled());
    }

    #[test]
    fn test_straddling_write_keeps_all_bytes() {
        let mut spool = SpooledTempFile::new(4);
        spool.write_all(b"ab").unwrap();
        assert!(!spool.is_rolled());
        spool.write_all(b"cdef").unwrap();
        assert!(spool.is_rolled());

        spool.rewind().unwrap();
        let mut content = Vec::new();
        spool.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"abcdef");
    }

    #[test]
    fn test_roll_is_irreversible() {
        let mut spool = SpooledTempFile::new(1);
        spool.write_all(b"xx").unwrap();
        assert!(spool.is_rolled());

        spool.rewind().unwrap();
        let mut content = Vec::new();
        spool.read_to_end(&mut content).unwrap();
        assert!(spool.is_rolled());
        assert_eq!(content, b"xx");
    }

    #[test]
    fn test_read_after_rewind_in_memory() {
        let mut spool = SpooledTempFile::new(1024);
        spool.write_all(b"hello").unwrap();
        spool.rewind().unwrap();
        let mut content = Vec::new();
        spool.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"hello");
        assert!(!spool.is_rolled());
    }

    #[test]
    fn test_writes_after_roll_append_to_file() {
        let mut spool = SpooledTempFile::new(3);
        spool.write_all(b"abcd").unwrap();
        spool.write_all(b"ef").unwrap();

        spool.rewind().unwrap();
        let mut content = Vec::new();
        spool.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"abcdef");
    }
}
