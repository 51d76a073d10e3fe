//! Response definitions
//!
//! Represents replies to clients and peers.

use serde::{Deserialize, Serialize};

use crate::error::DriftError;

/// Category of a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    SizeMismatch,
    InvalidRequest,
    Internal,
}

/// A response to send to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Generic success (Hello, SetStream opened)
    Ok,

    /// A SetKey was stored
    Ack,

    /// A value for GetKey or one GetStream item
    Value { key: String, value: Vec<u8> },

    /// Result of ListKeys
    Keys { keys: Vec<String> },

    /// A stream finished cleanly
    StreamEnd,

    /// Reply to Ping
    Pong,

    /// The call failed
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Create an ERROR response
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }

    /// Map a local failure onto the wire
    ///
    /// For `NotFound` the message is the key itself.
    pub fn from_error(err: &DriftError) -> Self {
        match err {
            DriftError::KeyNotFound(key) => Response::error(ErrorKind::NotFound, key.clone()),
            DriftError::PermissionDenied(msg) => {
                Response::error(ErrorKind::PermissionDenied, msg.clone())
            }
            DriftError::SizeMismatch { .. } => {
                Response::error(ErrorKind::SizeMismatch, err.to_string())
            }
            DriftError::Protocol(msg) => Response::error(ErrorKind::InvalidRequest, msg.clone()),
            other => Response::error(ErrorKind::Internal, other.to_string()),
        }
    }

    /// Turn an `Error` response back into a local error
    pub fn into_error(kind: ErrorKind, message: String) -> DriftError {
        match kind {
            ErrorKind::NotFound => DriftError::KeyNotFound(message),
            ErrorKind::PermissionDenied => DriftError::PermissionDenied(message),
            ErrorKind::InvalidRequest => DriftError::Protocol(message),
            ErrorKind::SizeMismatch | ErrorKind::Internal => DriftError::Remote(message),
        }
    }
}
