//! TCP Server
//!
//! Accepts connections and hands each to its own thread.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::protocol::{write_response, ErrorKind, Response};
use crate::service::KvService;

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for DriftKV
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    service: Arc<KvService>,
    max_connections: usize,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Decrements the active connection count when a handler thread ends
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: &Config, service: Arc<KvService>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            DriftError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        // Non-blocking accept so the loop can observe shutdown
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        tracing::info!(addr = %local_addr, "Server listening");

        Ok(Self {
            listener,
            local_addr,
            service,
            max_connections: config.max_connections,
            read_timeout_ms: config.read_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop (blocking until shutdown)
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!(addr = %self.local_addr, "Server stopped accepting");
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    ///
    /// Open connections finish on their own (disconnect or read timeout).
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Run the accept loop on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let addr = self.local_addr;
        let shutdown = Arc::clone(&self.shutdown);

        let thread = thread::Builder::new()
            .name(format!("driftkv-accept-{}", addr.port()))
            .spawn(move || self.run())?;

        Ok(ServerHandle {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }

    fn dispatch(&self, mut stream: TcpStream, addr: SocketAddr) {
        if self.active.load(Ordering::SeqCst) >= self.max_connections {
            tracing::warn!(peer = %addr, max = self.max_connections, "Connection limit reached, rejecting");
            let _ = stream.set_nonblocking(false);
            let _ = write_response(
                &mut stream,
                &Response::error(ErrorKind::Internal, "server busy"),
            );
            return;
        }

        // Accepted sockets may inherit the listener's non-blocking mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!(peer = %addr, "Cannot configure connection: {}", e);
            return;
        }

        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));
        let service = Arc::clone(&self.service);
        let (read_ms, write_ms) = (self.read_timeout_ms, self.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("driftkv-conn-{}", addr))
            .spawn(move || {
                let _guard = guard;
                let result = Connection::new(stream, service).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::warn!(peer = %addr, "Connection ended with error: {}", e);
                }
            });

        if let Err(e) = spawned {
            // The closure (and its guard) was dropped, so the count is restored
            tracing::error!(peer = %addr, "Failed to spawn connection thread: {}", e);
        }
    }
}

/// Handle to a server running on a background thread
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and wait for the accept loop to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Relaxed);

        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| DriftError::Network("Accept thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(addr = %self.addr, "Server shutdown failed: {}", e);
        }
    }
}
