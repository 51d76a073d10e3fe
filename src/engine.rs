//! Engine Module
//!
//! The storage engine that composes the record log and the key index.
//!
//! ## Responsibilities
//! - Sequence every write as: append to log, then update index
//! - Resolve reads through the index into the log
//! - Report index entries that point past the end of the log

use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::index::{KeyIndex, KeyInfo};
use crate::storage::{Record, RecordLog};

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **Writes** (`set`): serialized by `write_lock`, held across the append
///   and the index update so the index always reflects the latest append
///   for a key.
///   - Order: write_lock → log (append) → index (put)
///
/// - **Reads** (`get`): no write_lock. The index lookup takes the index's
///   shared file lock; the log read takes the log mutex. An index entry only
///   becomes visible after its bytes are appended, so a read never sees an
///   entry whose bytes are missing.
///
/// One process per data directory; nothing coordinates across processes.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Append-only value storage
    log: RecordLog,

    /// Key → (offset, size) index
    index: KeyIndex,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open the record log for append (existing bytes are kept)
    /// 3. Load the key index snapshot, if any
    /// 4. Refuse to open if index entries reach past the end of the log
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let log = RecordLog::open(&config.log_path(), config.flush_strategy)?;
        let index = KeyIndex::open(&config.index_path())?;

        let engine = Self {
            config,
            log,
            index,
            write_lock: Mutex::new(()),
        };

        let mut dangling = engine.check_consistency();
        if !dangling.is_empty() {
            let log_len = engine.log.len();
            dangling.sort();
            tracing::error!(
                count = dangling.len(),
                log_len,
                "Index entries point past the end of the record log; store needs manual repair"
            );
            return Err(DriftError::DanglingIndex {
                keys: dangling,
                log_len,
            });
        }

        tracing::info!(
            data_dir = %engine.config.data_dir.display(),
            keys = engine.index.len(),
            base_offset = engine.log.base_offset(),
            "Engine opened"
        );

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }

    /// Store a record
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Append key + value to the log
    /// 3. Point the index at the new value bytes
    ///
    /// A failed append leaves the index untouched. A failed index update
    /// leaves orphaned bytes in the log; retrying appends a fresh copy.
    pub fn set(&self, record: Record) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        let end_offset = self.log.append(&record.key, &record.value)?;

        let size = record.value.len() as u64;
        let info = KeyInfo::new(end_offset - size, size);

        tracing::trace!(
            key = %record.key,
            offset = info.offset,
            size,
            appended = record.encoded_len(),
            "Set record"
        );

        self.index.put(record.key, info)
    }

    /// Store a key/value pair (convenience over `set`)
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.set(Record::new(key, value))
    }

    /// Get the value for a key
    ///
    /// Fails with `KeyNotFound` if the key was never set, and with
    /// `SizeMismatch` if the log is shorter than the index entry claims.
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let info = self.index.get(key)?;
        self.log.read(info.offset, info.size)
    }

    /// All keys currently indexed, in no particular order
    pub fn list_keys(&self) -> Vec<String> {
        self.index.list()
    }

    /// Index entry for a key
    pub fn key_info(&self, key: &str) -> Result<KeyInfo> {
        self.index.get(key)
    }

    /// Read the raw byte range an index entry describes
    pub fn read_range(&self, info: KeyInfo) -> Result<Vec<u8>> {
        self.log.read(info.offset, info.size)
    }

    /// Keys whose index entry extends past the current log length
    ///
    /// A non-empty result means the log was truncated or the index is from a
    /// different log. Nothing is repaired.
    pub fn check_consistency(&self) -> Vec<String> {
        let log_len = self.log.len();

        self.index
            .entries()
            .into_iter()
            .filter(|(_, info)| info.end() > log_len)
            .map(|(key, _)| key)
            .collect()
    }

    /// Flush buffered appends and fsync the log
    pub fn sync(&self) -> Result<()> {
        self.log.sync()
    }

    /// Close the engine gracefully
    pub fn close(self) -> Result<()> {
        self.sync()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "Engine closed");
        Ok(())
    }

    /// Irreversibly delete the on-disk store
    ///
    /// Teardown only; the engine is consumed.
    pub fn remove(self) -> Result<()> {
        let data_dir = self.config.data_dir.clone();
        drop(self);

        fs::remove_dir_all(&data_dir).map_err(|e| {
            DriftError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to remove {}: {}", data_dir.display(), e),
            ))
        })?;

        tracing::info!(data_dir = %data_dir.display(), "Store removed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Number of indexed keys
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Current record log length (write cursor)
    pub fn log_len(&self) -> u64 {
        self.log.len()
    }

    /// Record log length observed at open
    pub fn base_offset(&self) -> u64 {
        self.log.base_offset()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
