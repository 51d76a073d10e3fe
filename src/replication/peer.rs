//! Peer seams
//!
//! The replicator talks to peers and to the local store only through these
//! traits, so transports and sinks can be swapped.

use std::time::Duration;

use crate::client::Client;
use crate::engine::Engine;
use crate::error::Result;
use crate::storage::Record;

/// Values arriving from a peer, in key-list order
pub type RecordStream = Box<dyn Iterator<Item = Result<Record>> + Send>;

/// Dials peers
pub trait PeerConnector: Send + Sync {
    fn connect(&self, addr: &str) -> Result<Box<dyn PeerSession>>;
}

/// An open session with one peer
pub trait PeerSession: Send {
    /// The peer's full current key set
    fn list_keys(&mut self) -> Result<Vec<String>>;

    /// One bulk streaming request for every key in `keys`
    fn stream_values(self: Box<Self>, keys: Vec<String>) -> Result<RecordStream>;
}

/// Where replicated records are stored locally
pub trait RecordSink: Send + Sync {
    fn apply(&self, record: Record) -> Result<()>;
}

impl RecordSink for Engine {
    fn apply(&self, record: Record) -> Result<()> {
        self.set(record)
    }
}

/// Dials peers over TCP and identifies as `subject`
#[derive(Debug, Clone)]
pub struct TcpConnector {
    subject: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(subject: impl Into<String>, timeout: Duration) -> Self {
        Self {
            subject: subject.into(),
            timeout,
        }
    }
}

impl PeerConnector for TcpConnector {
    fn connect(&self, addr: &str) -> Result<Box<dyn PeerSession>> {
        let client = Client::connect_as(addr, &self.subject, self.timeout)?;
        Ok(Box::new(client))
    }
}

impl PeerSession for Client {
    fn list_keys(&mut self) -> Result<Vec<String>> {
        Client::list_keys(self)
    }

    fn stream_values(self: Box<Self>, keys: Vec<String>) -> Result<RecordStream> {
        let stream = self.into_get_stream(keys)?;
        Ok(Box::new(stream))
    }
}
