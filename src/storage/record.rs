//! Record definition

use serde::{Deserialize, Serialize};

/// One key/value pair as written to the record log
///
/// Immutable once written. Setting the same key again appends new bytes and
/// repoints the index; earlier bytes stay in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Bytes this record occupies in the log (key + value)
    pub fn encoded_len(&self) -> u64 {
        (self.key.len() + self.value.len()) as u64
    }
}
