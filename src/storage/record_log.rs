//! Record Log
//!
//! Buffered append-only writer plus a positioned reader over the same file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::FlushStrategy;
use crate::error::{DriftError, Result};

/// Upper bound on the up-front allocation for a single read
const MAX_READ_PREALLOC: u64 = 1024 * 1024;

/// Append-only log of concatenated key and value bytes
///
/// ## Concurrency
/// One mutex serializes every append and read. Reads flush the buffer first,
/// so a read always observes all earlier appends from this process.
pub struct RecordLog {
    /// Path of the log file
    path: PathBuf,

    /// Writer, reader and cursor, all behind one lock
    inner: Mutex<LogInner>,

    /// Cursor value observed at open time (diagnostics only)
    base_offset: u64,

    /// When buffered appends are pushed to the file
    flush_strategy: FlushStrategy,
}

struct LogInner {
    /// Append-mode handle; every write lands at the end of the file
    writer: BufWriter<File>,

    /// Independent read handle with its own file position
    reader: File,

    /// Write cursor: file length plus bytes still buffered
    next_offset: u64,

    /// Appends since the last flush (for EveryNAppends)
    unflushed: usize,
}

impl LogInner {
    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.unflushed = 0;
        Ok(())
    }

    /// Re-derive the cursor after a failed write.
    ///
    /// The file is opened in append mode, so the next byte lands at
    /// `file length + buffered bytes` no matter what was partially written.
    fn resync_cursor(&mut self) {
        if let Ok(meta) = self.writer.get_ref().metadata() {
            self.next_offset = meta.len() + self.writer.buffer().len() as u64;
        }
    }
}

fn write_record<W: Write>(writer: &mut W, key: &str, value: &[u8]) -> std::io::Result<()> {
    writer.write_all(key.as_bytes())?;
    writer.write_all(value)
}

impl RecordLog {
    /// Open or create the log file, never truncating existing bytes
    pub fn open(path: &Path, flush_strategy: FlushStrategy) -> Result<Self> {
        let write_file = OpenOptions::new().create(true).append(true).open(path)?;
        let reader = OpenOptions::new().read(true).open(path)?;

        let offset = write_file.metadata()?.len();

        tracing::debug!(path = %path.display(), offset, "Opened record log");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(LogInner {
                writer: BufWriter::new(write_file),
                reader,
                next_offset: offset,
                unflushed: 0,
            }),
            base_offset: offset,
            flush_strategy,
        })
    }

    /// Append key bytes followed by value bytes
    ///
    /// Returns the cursor *after* the write; the value starts at
    /// `end_offset - value.len()`. Bytes are only guaranteed to be in the file
    /// after a flush.
    pub fn append(&self, key: &str, value: &[u8]) -> Result<u64> {
        let mut inner = self.inner.lock();

        if let Err(e) = write_record(&mut inner.writer, key, value) {
            inner.resync_cursor();
            return Err(e.into());
        }

        inner.next_offset += (key.len() + value.len()) as u64;
        let end_offset = inner.next_offset;

        match self.flush_strategy {
            FlushStrategy::OnRead => {}
            FlushStrategy::EveryAppend => inner.flush()?,
            FlushStrategy::EveryNAppends { count } => {
                inner.unflushed += 1;
                if inner.unflushed >= count {
                    inner.flush()?;
                }
            }
        }

        Ok(end_offset)
    }

    /// Read exactly `length` bytes starting at `offset`
    ///
    /// Fails with `SizeMismatch` if the file holds fewer bytes than requested.
    pub fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();

        // Reads must observe every earlier append
        inner.flush()?;

        let reader = &mut inner.reader;
        reader.seek(SeekFrom::Start(offset))?;

        let mut value = Vec::with_capacity(length.min(MAX_READ_PREALLOC) as usize);
        let actual = Read::by_ref(reader).take(length).read_to_end(&mut value)? as u64;

        if actual != length {
            return Err(DriftError::SizeMismatch {
                expected: length,
                actual,
            });
        }

        Ok(value)
    }

    /// Flush buffered appends and fsync the file
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.flush()?;
        inner.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Current write cursor (total logical length, buffered bytes included)
    pub fn len(&self) -> u64 {
        self.inner.lock().next_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor observed when the log was opened
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
