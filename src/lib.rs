//! # DriftKV
//!
//! A small replicated key-value store with:
//! - An append-only record log holding raw key and value bytes
//! - A persisted key index mapping each key to its latest value's location
//! - Subject-based authorization at the service boundary
//! - A framed TCP protocol with bulk get and set streams
//! - Pull replication: a node copies every key of the peers it joins
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              TCP Server  (clients and peer nodes)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                KvService  (authorize, then act)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │            ┌──────────────────────────┐
//!                       │◀───────────│ Replicator (peer workers)│
//!                       ▼            └──────────────────────────┘
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Engine  (single writer)                   │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │   Record Log    │                │    Key Index    │
//!   │    (append)     │                │ (snapshot file) │
//!   └─────────────────┘                └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod index;
pub mod engine;
pub mod auth;
pub mod service;
pub mod protocol;
pub mod network;
pub mod client;
pub mod replication;
pub mod node;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DriftError, Result};
pub use config::{Config, FlushStrategy, PeerAddr};
pub use engine::Engine;
pub use storage::Record;
pub use index::KeyInfo;
pub use service::KvService;
pub use network::Server;
pub use client::Client;
pub use replication::{PeerState, Replicator};
pub use node::Node;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DriftKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
