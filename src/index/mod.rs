//! Key Index Module
//!
//! Durable mapping from key to the location of its value in the record log.
//!
//! ## Responsibilities
//! - Resolve a key to `(offset, size)` in the record log
//! - Persist a full snapshot of the index on every mutation
//! - Reload the snapshot before every lookup
//!
//! ## Snapshot Format
//! ```text
//! ┌─────────────────────────────────────────┬───────────┐
//! │ bincode(HashMap<String, KeyInfo>)       │ CRC32 (4) │
//! └─────────────────────────────────────────┴───────────┘
//! ```
//! The snapshot is written to a sibling `.tmp` file, fsynced, then renamed
//! over the previous one.

mod key_index;

use serde::{Deserialize, Serialize};

pub use key_index::KeyIndex;

/// Location and length of one value inside the record log
///
/// Invariant: `offset + size` never exceeds the log length once the `Set`
/// that produced it has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Length of the value in bytes
    pub size: u64,

    /// Byte offset of the first value byte
    pub offset: u64,
}

impl KeyInfo {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { size, offset }
    }

    /// Offset one past the last value byte
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// True if the two byte ranges share at least one byte
    pub fn overlaps(&self, other: &KeyInfo) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}
