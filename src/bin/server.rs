//! DriftKV Server Binary
//!
//! Starts a DriftKV node: store, RPC server and replicator.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use driftkv::{Config, FlushStrategy, Node, PeerAddr};
use tracing_subscriber::{fmt, EnvFilter};

/// When the record log flushes buffered appends
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Flush {
    /// Only before reads and on sync
    OnRead,
    /// After every append
    Always,
}

/// DriftKV Server
#[derive(Parser, Debug)]
#[command(name = "driftkv-server")]
#[command(about = "Replicated key-value store node")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./driftkv_data")]
    data_dir: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9400")]
    listen: String,

    /// Name this node uses when dialing peers
    #[arg(short, long, default_value = "node-0")]
    node_name: String,

    /// Peer to replicate from, as name=host:port (repeatable)
    #[arg(short, long = "join")]
    join: Vec<PeerAddr>,

    /// ACL policy file; every caller is allowed when omitted
    #[arg(short, long)]
    acl_policy: Option<PathBuf>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Record log flush strategy
    #[arg(long, value_enum, default_value = "on-read")]
    flush: Flush,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,driftkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("DriftKV Server v{}", driftkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());
    tracing::info!("Listen address: {}", args.listen);

    let flush_strategy = match args.flush {
        Flush::OnRead => FlushStrategy::OnRead,
        Flush::Always => FlushStrategy::EveryAppend,
    };

    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .node_name(&args.node_name)
        .max_connections(args.max_connections)
        .flush_strategy(flush_strategy)
        .peers(args.join);

    if let Some(path) = args.acl_policy {
        builder = builder.acl_policy_file(path);
    }

    let node = match Node::start(builder.build()) {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("Failed to start node: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %node.rpc_addr(), "Serving until the process is terminated");

    // The accept loop and workers run on their own threads
    loop {
        std::thread::park();
    }
}
