//! Configuration for DriftKV
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::DriftError;

/// Main configuration for a DriftKV node
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── records.log      (append-only record log)
    ///     └── keyindex.snap    (key index snapshot)
    ///
    /// Exactly one process may open a given data directory.
    pub data_dir: PathBuf,

    /// File name of the record log inside `data_dir`
    pub log_file_name: String,

    /// File name of the key index snapshot inside `data_dir`
    pub index_file_name: String,

    /// When buffered record log writes reach the file
    pub flush_strategy: FlushStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Name of this node; also the subject presented to peers when replicating
    pub node_name: String,

    /// TCP listen address (port 0 picks an ephemeral port)
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Authorization Configuration
    // -------------------------------------------------------------------------
    /// ACL policy file; `None` allows every call
    pub acl_policy_file: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Replication Configuration
    // -------------------------------------------------------------------------
    /// Peers joined when the node starts
    pub peers: Vec<PeerAddr>,
}

/// Record log flush strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStrategy {
    /// Keep appends buffered until the next read or explicit sync
    OnRead,

    /// Flush the buffer after every append
    EveryAppend,

    /// Flush after N buffered appends
    EveryNAppends { count: usize },
}

/// A named peer address (`name=host:port`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    pub name: String,
    pub addr: String,
}

impl PeerAddr {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
        }
    }
}

impl FromStr for PeerAddr {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, addr) = s.split_once('=').ok_or_else(|| {
            DriftError::Config(format!("Expected peer as name=host:port, got '{}'", s))
        })?;

        let (name, addr) = (name.trim(), addr.trim());
        if name.is_empty() || addr.is_empty() {
            return Err(DriftError::Config(format!(
                "Peer name and address must be non-empty: '{}'",
                s
            )));
        }

        Ok(Self::new(name, addr))
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.addr)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./driftkv_data"),
            log_file_name: "records.log".to_string(),
            index_file_name: "keyindex.snap".to_string(),
            flush_strategy: FlushStrategy::OnRead,
            node_name: "node-0".to_string(),
            listen_addr: "127.0.0.1:9400".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            acl_policy_file: None,
            peers: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the record log
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file_name)
    }

    /// Full path of the key index snapshot
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(&self.index_file_name)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the record log file name
    pub fn log_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.log_file_name = name.into();
        self
    }

    /// Set the key index snapshot file name
    pub fn index_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_file_name = name.into();
        self
    }

    /// Set the record log flush strategy
    pub fn flush_strategy(mut self, strategy: FlushStrategy) -> Self {
        self.config.flush_strategy = strategy;
        self
    }

    /// Set the node name
    pub fn node_name(mut self, name: impl Into<String>) -> Self {
        self.config.node_name = name.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the ACL policy file
    pub fn acl_policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.acl_policy_file = Some(path.into());
        self
    }

    /// Add a peer to join at startup
    pub fn peer(mut self, peer: PeerAddr) -> Self {
        self.config.peers.push(peer);
        self
    }

    /// Replace the startup peer list
    pub fn peers(mut self, peers: Vec<PeerAddr>) -> Self {
        self.config.peers = peers;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
