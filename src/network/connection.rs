//! Connection Handler
//!
//! Handles individual client and peer connections.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DriftError, Result};
use crate::protocol::{read_request, write_response, ErrorKind, Request, Response};
use crate::service::KvService;

/// Whether the connection stays open after a request
enum Flow {
    Continue,
    Closed,
}

/// Handles a single connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Service every request is routed through
    service: Arc<KvService>,

    /// Peer address for logging
    peer_addr: String,

    /// Caller identity; empty until a Hello arrives
    subject: String,
}

/// Errors that mean the other side went away rather than that we failed
fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

/// Read timeouts surface as WouldBlock on Unix and TimedOut on Windows
fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(stream: TcpStream, service: Arc<KvService>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            service,
            peer_addr,
            subject: String::new(),
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses.
    /// Returns when the caller disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "Connection established");

        loop {
            let request = match self.next_request()? {
                Some(request) => request,
                None => return Ok(()),
            };

            tracing::trace!(peer = %self.peer_addr, request = request.name(), "Received request");

            match self.dispatch(request) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Closed) => return Ok(()),
                Err(DriftError::Io(ref e)) if is_disconnect(e) => {
                    // The caller left before we could answer
                    tracing::debug!(
                        peer = %self.peer_addr,
                        "Caller disconnected before response could be sent: {}", e
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, "Error writing response: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Read the next request; `None` once the caller has gone away
    fn next_request(&mut self) -> Result<Option<Request>> {
        match read_request(&mut self.reader) {
            Ok(request) => Ok(Some(request)),
            Err(DriftError::Io(ref e)) if is_disconnect(e) => {
                tracing::debug!(peer = %self.peer_addr, "Caller disconnected");
                Ok(None)
            }
            Err(DriftError::Io(ref e)) if is_timeout(e) => {
                tracing::debug!(peer = %self.peer_addr, "Read timeout, closing connection");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(peer = %self.peer_addr, "Error reading request: {}", e);
                // Send error response if possible
                let _ = self.send(Response::from_error(&e));
                Err(e)
            }
        }
    }

    /// Execute one request and answer it
    fn dispatch(&mut self, request: Request) -> Result<Flow> {
        let response = match request {
            Request::Hello { subject } => {
                tracing::debug!(peer = %self.peer_addr, subject = %subject, "Caller identified");
                self.subject = subject;
                Response::Ok
            }
            Request::SetKey { key, value } => self.answer(
                self.service
                    .set_key(&self.subject, key, value)
                    .map(|_| Response::Ack),
            ),
            Request::GetKey { key } => self.answer(
                self.service
                    .get_key(&self.subject, &key)
                    .map(|value| Response::Value { key, value }),
            ),
            Request::ListKeys => self.answer(
                self.service
                    .list_keys(&self.subject)
                    .map(|keys| Response::Keys { keys }),
            ),
            Request::GetStream { keys } => {
                self.stream_values(keys)?;
                return Ok(Flow::Continue);
            }
            Request::SetStream => return self.accept_sets(),
            Request::EndStream => {
                Response::error(ErrorKind::InvalidRequest, "EndStream without an open SetStream")
            }
            Request::Ping => Response::Pong,
        };

        self.reply(response)?;
        Ok(Flow::Continue)
    }

    /// Send one Value per key in order, then StreamEnd.
    /// The first failing key ends the stream with an Error.
    fn stream_values(&mut self, keys: Vec<String>) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, keys = keys.len(), "Streaming values");

        for key in keys {
            match self.service.get_key(&self.subject, &key) {
                Ok(value) => {
                    if !self.reply(Response::Value { key, value })? {
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::debug!(peer = %self.peer_addr, key = %key, "GetStream aborted: {}", e);
                    return self.send(Response::from_error(&e));
                }
            }
        }

        self.send(Response::StreamEnd)
    }

    /// Serve an open SetStream until EndStream or the first failure
    fn accept_sets(&mut self) -> Result<Flow> {
        self.send(Response::Ok)?;

        let mut stored = 0usize;
        loop {
            let request = match self.next_request()? {
                Some(request) => request,
                None => return Ok(Flow::Closed),
            };

            match request {
                Request::SetKey { key, value } => {
                    match self.service.set_key(&self.subject, key, value) {
                        Ok(()) => {
                            stored += 1;
                            self.send(Response::Ack)?;
                        }
                        Err(e) => {
                            tracing::debug!(peer = %self.peer_addr, stored, "SetStream aborted: {}", e);
                            self.send(Response::from_error(&e))?;
                            return Ok(Flow::Continue);
                        }
                    }
                }
                Request::EndStream => {
                    tracing::debug!(peer = %self.peer_addr, stored, "SetStream finished");
                    self.send(Response::StreamEnd)?;
                    return Ok(Flow::Continue);
                }
                other => {
                    self.send(Response::error(
                        ErrorKind::InvalidRequest,
                        format!("{} is not allowed inside a SetStream", other.name()),
                    ))?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    /// Turn a service result into a response
    fn answer(&self, result: Result<Response>) -> Response {
        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(peer = %self.peer_addr, subject = %self.subject, "Call failed: {}", e);
                Response::from_error(&e)
            }
        }
    }

    /// Send a response to the caller
    fn send(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Send a response, answering with an Error frame instead if it cannot
    /// be framed (e.g. a value over the payload limit).
    ///
    /// Returns false when the Error was sent in its place. Framing fails
    /// before any byte is written, so the connection stays in sync.
    fn reply(&mut self, response: Response) -> Result<bool> {
        match self.send(response) {
            Ok(()) => Ok(true),
            Err(e @ DriftError::Protocol(_)) => {
                tracing::warn!(peer = %self.peer_addr, "Cannot frame response: {}", e);
                self.send(Response::error(ErrorKind::Internal, e.to_string()))?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
