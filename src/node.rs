//! Node Module
//!
//! Wires one store, its RPC server and its replicator into a running node.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AclAuthorizer, AllowAll, Authorizer};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::network::{Server, ServerHandle};
use crate::replication::{PeerState, Replicator, TcpConnector};
use crate::service::KvService;

/// A running DriftKV node
pub struct Node {
    name: String,
    engine: Arc<Engine>,
    server: ServerHandle,
    replicator: Replicator,
}

impl Node {
    /// Open the store, start serving, and join every configured peer
    pub fn start(config: Config) -> Result<Self> {
        let engine = Arc::new(Engine::open(config.clone())?);

        let authorizer: Arc<dyn Authorizer> = match &config.acl_policy_file {
            Some(path) => Arc::new(AclAuthorizer::from_policy_file(path)?),
            None => {
                tracing::warn!("No ACL policy configured, every caller is allowed");
                Arc::new(AllowAll)
            }
        };

        let service = Arc::new(KvService::new(Arc::clone(&engine), authorizer));
        let server = Server::bind(&config, service)?.spawn()?;

        // Peers are dialed as this node, so their ACLs can name it
        let connector = TcpConnector::new(
            config.node_name.clone(),
            Duration::from_millis(config.read_timeout_ms),
        );
        let replicator = Replicator::new(Arc::new(connector), engine.clone());

        for peer in &config.peers {
            replicator.join(&peer.name, &peer.addr)?;
        }

        tracing::info!(
            node = %config.node_name,
            addr = %server.local_addr(),
            peers = config.peers.len(),
            "Node started"
        );

        Ok(Self {
            name: config.node_name,
            engine,
            server,
            replicator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address the RPC server is bound to
    pub fn rpc_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Start replicating from a peer
    pub fn join(&self, name: &str, addr: &str) -> Result<()> {
        self.replicator.join(name, addr)
    }

    /// Stop replicating from a peer
    pub fn leave(&self, name: &str) {
        self.replicator.leave(name)
    }

    pub fn peer_state(&self, name: &str) -> Option<PeerState> {
        self.replicator.peer_state(name)
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    /// Stop replication, stop serving, and close the store
    pub fn shutdown(self) -> Result<()> {
        let Node {
            name,
            engine,
            server,
            replicator,
        } = self;

        replicator.close();
        drop(replicator);
        server.shutdown()?;

        // Connection threads or exiting workers may still hold the engine
        match Arc::try_unwrap(engine) {
            Ok(engine) => engine.close()?,
            Err(shared) => shared.sync()?,
        }

        tracing::info!(node = %name, "Node stopped");
        Ok(())
    }
}
