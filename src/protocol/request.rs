//! Request definitions
//!
//! Represents calls from clients and peers.

use serde::{Deserialize, Serialize};

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Declare the caller identity for this connection
    Hello { subject: String },

    /// Store a value
    SetKey { key: String, value: Vec<u8> },

    /// Fetch a value
    GetKey { key: String },

    /// List every key
    ListKeys,

    /// Fetch many values, streamed back in input order
    GetStream { keys: Vec<String> },

    /// Open a stream of SetKey requests
    SetStream,

    /// Close an open SetStream
    EndStream,

    /// Health check
    Ping,
}

impl Request {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Request::Hello { .. } => "Hello",
            Request::SetKey { .. } => "SetKey",
            Request::GetKey { .. } => "GetKey",
            Request::ListKeys => "ListKeys",
            Request::GetStream { .. } => "GetStream",
            Request::SetStream => "SetStream",
            Request::EndStream => "EndStream",
            Request::Ping => "Ping",
        }
    }
}
