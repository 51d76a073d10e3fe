//! Replication Module
//!
//! Pull replication: a node dials a peer, asks for the peer's full key list,
//! streams every value back, and applies each one to its own store as it
//! arrives.
//!
//! ## Per-peer worker
//! ```text
//!            Join                      stream drained / Leave / Close
//!   Idle ───────────▶ Streaming ──────────────────────────────────────▶ Idle
//!                         │
//!                         │ dial / list / receive / local set error
//!                         ▼
//!                       Failed   (no retry; a fresh Join starts over)
//! ```
//!
//! Every Join is a full resync of the peer's current keys, not a delta.
//! Workers hold only receive-side cancellation handles; the replicator owns
//! their lifecycles through the name-keyed peer map.

mod peer;
mod replicator;

pub use peer::{PeerConnector, PeerSession, RecordSink, RecordStream, TcpConnector};
pub use replicator::{PeerState, Replicator};
