//! Key Index implementation
//!
//! HashMap-based index with a full-snapshot file behind it.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{DriftError, Result};

use super::KeyInfo;

/// Size of the CRC32 trailer at the end of a snapshot
const CRC_SIZE: usize = 4;

/// Persistent key → KeyInfo index
///
/// ## Concurrency
/// - `file_lock`: writers hold it exclusively across insert + persist,
///   readers hold it shared across reload + lookup. A reload therefore never
///   interleaves with a half-finished put.
/// - `entries`: the in-memory map; swapped wholesale on reload.
///
/// The snapshot file is only coordinated in-process. Two processes must not
/// open the same index.
pub struct KeyIndex {
    /// Snapshot file path
    path: PathBuf,

    /// In-memory entries
    entries: RwLock<HashMap<String, KeyInfo>>,

    /// Guards the snapshot file
    file_lock: RwLock<()>,
}

impl KeyIndex {
    /// Open an index, loading the snapshot if one exists
    ///
    /// A missing snapshot is a fresh store and yields an empty index.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = load_snapshot(path)?.unwrap_or_default();

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened key index");

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
            file_lock: RwLock::new(()),
        })
    }

    /// Insert or overwrite an entry, then persist the whole index
    ///
    /// If persisting fails the in-memory entry is rolled back, so memory never
    /// holds an entry the snapshot does not.
    pub fn put(&self, key: String, info: KeyInfo) -> Result<()> {
        let _file = self.file_lock.write();
        let mut entries = self.entries.write();

        let previous = entries.insert(key.clone(), info);

        let persisted =
            encode_snapshot(&entries).and_then(|bytes| write_snapshot(&self.path, &bytes));

        if let Err(e) = persisted {
            match previous {
                Some(old) => entries.insert(key, old),
                None => entries.remove(&key),
            };
            return Err(e);
        }

        Ok(())
    }

    /// Look up a key after reloading the snapshot from disk
    pub fn get(&self, key: &str) -> Result<KeyInfo> {
        let _file = self.file_lock.read();

        if let Some(loaded) = load_snapshot(&self.path)? {
            *self.entries.write() = loaded;
        }

        self.entries
            .read()
            .get(key)
            .copied()
            .ok_or_else(|| DriftError::KeyNotFound(key.to_string()))
    }

    /// Current in-memory keys (no reload), in no particular order
    pub fn list(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Copy of every in-memory entry (no reload)
    pub fn entries(&self) -> Vec<(String, KeyInfo)> {
        self.entries
            .read()
            .iter()
            .map(|(key, info)| (key.clone(), *info))
            .collect()
    }

    /// Reload the in-memory map from the snapshot file
    pub fn reload(&self) -> Result<()> {
        let _file = self.file_lock.read();

        if let Some(loaded) = load_snapshot(&self.path)? {
            *self.entries.write() = loaded;
        }

        Ok(())
    }

    /// Number of in-memory entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// =============================================================================
// Snapshot encoding
// =============================================================================

fn encode_snapshot(entries: &HashMap<String, KeyInfo>) -> Result<Vec<u8>> {
    let mut bytes = bincode::serialize(entries)?;
    let crc = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    Ok(bytes)
}

fn decode_snapshot(bytes: &[u8]) -> Result<HashMap<String, KeyInfo>> {
    if bytes.len() < CRC_SIZE {
        return Err(DriftError::SnapshotCorruption(format!(
            "snapshot is {} bytes, shorter than its checksum",
            bytes.len()
        )));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CRC_SIZE);
    let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = crc32fast::hash(body);

    if expected != actual {
        return Err(DriftError::SnapshotCorruption(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            expected, actual
        )));
    }

    Ok(bincode::deserialize(body)?)
}

/// Read the snapshot; `Ok(None)` if the file does not exist yet
fn load_snapshot(path: &Path) -> Result<Option<HashMap<String, KeyInfo>>> {
    match fs::read(path) {
        Ok(bytes) => decode_snapshot(&bytes).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write to a temp file, fsync, then rename over the live snapshot
fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    let mut file = File::create(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}
