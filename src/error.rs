//! Error types for DriftKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DriftError
pub type Result<T> = std::result::Result<T, DriftError>;

/// Unified error type for DriftKV operations
#[derive(Debug, Error)]
pub enum DriftError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The log returned fewer bytes than the index promised.
    /// Treated as store corruption; nothing repairs it automatically.
    #[error("Size mismatch: expected {expected} bytes, read {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Index snapshot corrupted: {0}")]
    SnapshotCorruption(String),

    /// Index entries reach past the end of the record log. Writing to such a
    /// store would hand those keys another record's bytes, so it is refused.
    #[error("Index references {} key(s) beyond the {log_len}-byte record log: {}", keys.len(), keys.join(", "))]
    DanglingIndex { keys: Vec<String>, log_len: u64 },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Authorization Errors
    // -------------------------------------------------------------------------
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A failure reported by the remote end that has no local counterpart
    #[error("Remote error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for DriftError {
    fn from(err: bincode::Error) -> Self {
        DriftError::Serialization(err.to_string())
    }
}

impl DriftError {
    /// True for the "key absent from index" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriftError::KeyNotFound(_))
    }
}
