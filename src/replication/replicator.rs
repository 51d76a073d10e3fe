//! Replicator
//!
//! Join/Leave/Close lifecycle and the per-peer resync worker.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{bounded, select, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::Record;

use super::{PeerConnector, RecordSink};

/// Observable state of one peer subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// The worker is dialing or transferring
    Streaming,

    /// The worker finished the transfer or was cancelled
    Idle,

    /// The worker hit an error and stopped
    Failed,
}

/// How a worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum WorkerExit {
    Drained { applied: usize },
    Cancelled,
    Failed(String),
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Drained { applied } => write!(f, "drained ({} records applied)", applied),
            WorkerExit::Cancelled => write!(f, "cancelled"),
            WorkerExit::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One entry of the peer set
struct Subscription {
    addr: String,

    /// Never sent on; dropping it is the leave signal
    _leave: Sender<()>,

    /// Receives the worker's exit report
    exit: Receiver<WorkerExit>,

    /// Cached exit report once received
    last_exit: Option<WorkerExit>,
}

impl Subscription {
    fn state(&mut self) -> PeerState {
        if self.last_exit.is_none() {
            match self.exit.try_recv() {
                Ok(exit) => self.last_exit = Some(exit),
                Err(TryRecvError::Empty) => return PeerState::Streaming,
                Err(TryRecvError::Disconnected) => {
                    self.last_exit = Some(WorkerExit::Failed(
                        "worker exited without reporting".to_string(),
                    ))
                }
            }
        }

        match self.last_exit {
            Some(WorkerExit::Failed(_)) => PeerState::Failed,
            _ => PeerState::Idle,
        }
    }
}

struct PeerSet {
    peers: HashMap<String, Subscription>,

    /// Never sent on; dropping it (Close) signals every worker
    close_tx: Option<Sender<()>>,

    /// Cloned into each worker
    close_rx: Receiver<()>,
}

/// Replication agent: keeps one resync worker per joined peer
///
/// ## Concurrency
/// The peer set is mutated under one mutex. Workers run on their own threads
/// and hold no reference back to the replicator; they only watch the close
/// and leave channels. Join/Leave/Close never wait for a worker.
pub struct Replicator {
    connector: Arc<dyn PeerConnector>,
    sink: Arc<dyn RecordSink>,
    state: Mutex<PeerSet>,
}

impl Replicator {
    pub fn new(connector: Arc<dyn PeerConnector>, sink: Arc<dyn RecordSink>) -> Self {
        let (close_tx, close_rx) = bounded(0);

        Self {
            connector,
            sink,
            state: Mutex::new(PeerSet {
                peers: HashMap::new(),
                close_tx: Some(close_tx),
                close_rx,
            }),
        }
    }

    /// Subscribe to a peer and start a full resync from it
    ///
    /// No-op if a worker for `name` is still streaming, or after `close`.
    /// A name whose worker already ended (drained, cancelled or failed) gets a
    /// fresh worker. Replication failures are logged by the worker, never
    /// returned here; only failing to start the worker thread is an error.
    pub fn join(&self, name: &str, addr: &str) -> Result<()> {
        let mut state = self.state.lock();

        if state.close_tx.is_none() {
            tracing::debug!(peer = %name, "Replicator closed, ignoring join");
            return Ok(());
        }

        if let Some(existing) = state.peers.get_mut(name) {
            if existing.state() == PeerState::Streaming {
                tracing::debug!(peer = %name, addr = %existing.addr, "Already replicating, ignoring join");
                return Ok(());
            }
            tracing::debug!(peer = %name, "Previous worker ended, starting a fresh resync");
        }

        let (leave_tx, leave_rx) = bounded(0);
        let (exit_tx, exit_rx) = bounded(1);

        let worker = Worker {
            name: name.to_string(),
            addr: addr.to_string(),
            connector: Arc::clone(&self.connector),
            sink: Arc::clone(&self.sink),
            close_rx: state.close_rx.clone(),
            leave_rx,
            exit_tx,
        };

        thread::Builder::new()
            .name(format!("driftkv-replicate-{}", name))
            .spawn(move || worker.run())?;

        state.peers.insert(
            name.to_string(),
            Subscription {
                addr: addr.to_string(),
                _leave: leave_tx,
                exit: exit_rx,
                last_exit: None,
            },
        );

        tracing::info!(peer = %name, addr = %addr, "Joined peer");
        Ok(())
    }

    /// Stop replicating from a peer
    ///
    /// No-op for unknown names. Returns without waiting for the worker; it
    /// stops at its next wait point.
    pub fn leave(&self, name: &str) {
        let removed = self.state.lock().peers.remove(name);

        if let Some(subscription) = removed {
            tracing::info!(peer = %name, addr = %subscription.addr, "Left peer");
        }
    }

    /// Stop every worker and refuse further joins. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();

        if state.close_tx.take().is_some() {
            let count = state.peers.len();
            state.peers.clear();
            tracing::info!(peers = count, "Replicator closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().close_tx.is_none()
    }

    /// State of a subscription, `None` if `name` is not joined
    pub fn peer_state(&self, name: &str) -> Option<PeerState> {
        self.state
            .lock()
            .peers
            .get_mut(name)
            .map(|subscription| subscription.state())
    }

    /// Names of all joined peers
    pub fn peers(&self) -> Vec<String> {
        self.state.lock().peers.keys().cloned().collect()
    }

    /// Number of workers still streaming
    pub fn active_workers(&self) -> usize {
        self.state
            .lock()
            .peers
            .values_mut()
            .map(Subscription::state)
            .filter(|state| *state == PeerState::Streaming)
            .count()
    }
}

impl Drop for Replicator {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Worker
// =============================================================================

struct Worker {
    name: String,
    addr: String,
    connector: Arc<dyn PeerConnector>,
    sink: Arc<dyn RecordSink>,
    close_rx: Receiver<()>,
    leave_rx: Receiver<()>,
    exit_tx: Sender<WorkerExit>,
}

impl Worker {
    fn run(self) {
        let exit = self.replicate();

        match &exit {
            WorkerExit::Drained { .. } => {
                tracing::info!(peer = %self.name, addr = %self.addr, "Resync {}", exit)
            }
            WorkerExit::Cancelled => {
                tracing::debug!(peer = %self.name, "Resync {}", exit)
            }
            WorkerExit::Failed(_) => {
                tracing::warn!(peer = %self.name, addr = %self.addr, "Resync {}", exit)
            }
        }

        let _ = self.exit_tx.send(exit);
    }

    /// Dial, list, stream, apply
    fn replicate(&self) -> WorkerExit {
        let mut session = match self.connector.connect(&self.addr) {
            Ok(session) => session,
            Err(e) => return WorkerExit::Failed(format!("dial {}: {}", self.addr, e)),
        };

        if self.cancelled() {
            return WorkerExit::Cancelled;
        }

        let keys = match session.list_keys() {
            Ok(keys) => keys,
            Err(e) => return WorkerExit::Failed(format!("list keys: {}", e)),
        };

        tracing::debug!(peer = %self.name, keys = keys.len(), "Requesting values");

        let stream = match session.stream_values(keys) {
            Ok(stream) => stream,
            Err(e) => return WorkerExit::Failed(format!("open stream: {}", e)),
        };

        // Rendezvous channel: at most one received value is in flight
        let (value_tx, value_rx) = bounded::<Result<Record>>(0);

        let receiver = thread::Builder::new()
            .name(format!("driftkv-recv-{}", self.name))
            .spawn(move || {
                for item in stream {
                    let last = item.is_err();
                    if value_tx.send(item).is_err() || last {
                        break;
                    }
                }
            });

        if let Err(e) = receiver {
            return WorkerExit::Failed(format!("spawn receiver: {}", e));
        }

        let mut applied = 0;
        loop {
            select! {
                recv(self.close_rx) -> _ => return WorkerExit::Cancelled,
                recv(self.leave_rx) -> _ => return WorkerExit::Cancelled,
                recv(value_rx) -> message => match message {
                    Ok(Ok(record)) => {
                        // Both signals may have fired while this value was ready
                        if self.cancelled() {
                            return WorkerExit::Cancelled;
                        }

                        let key = record.key.clone();
                        if let Err(e) = self.sink.apply(record) {
                            return WorkerExit::Failed(format!("local set of {}: {}", key, e));
                        }
                        applied += 1;
                    }
                    Ok(Err(e)) => return WorkerExit::Failed(format!("stream receive: {}", e)),
                    Err(_) => return WorkerExit::Drained { applied },
                }
            }
        }
    }

    /// True once Leave or Close has been signalled
    fn cancelled(&self) -> bool {
        let gone = |rx: &Receiver<()>| matches!(rx.try_recv(), Err(TryRecvError::Disconnected));
        gone(&self.close_rx) || gone(&self.leave_rx)
    }
}
