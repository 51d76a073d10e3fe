//! Client Module
//!
//! Blocking RPC client for the DriftKV protocol.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{DriftError, Result};
use crate::protocol::{read_response, write_request, Request, Response};
use crate::storage::Record;

/// Connection to one DriftKV service endpoint
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    addr: String,
}

impl Client {
    /// Dial `addr` with the given timeout (also used for reads and writes)
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let stream = dial(addr, timeout)?;

        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let read_stream = stream.try_clone()?;

        tracing::debug!(addr, "Connected");

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            addr: addr.to_string(),
        })
    }

    /// Dial and identify as `subject` in one step
    pub fn connect_as(addr: &str, subject: &str, timeout: Duration) -> Result<Self> {
        let mut client = Self::connect(addr, timeout)?;
        client.hello(subject)?;
        Ok(client)
    }

    /// Declare the caller subject for this connection
    pub fn hello(&mut self, subject: &str) -> Result<()> {
        match self.call(&Request::Hello {
            subject: subject.to_string(),
        })? {
            Response::Ok => Ok(()),
            other => Err(unexpected("Hello", &other)),
        }
    }

    /// SetKey
    pub fn set_key(&mut self, key: &str, value: &[u8]) -> Result<()> {
        match self.call(&Request::SetKey {
            key: key.to_string(),
            value: value.to_vec(),
        })? {
            Response::Ack => Ok(()),
            other => Err(unexpected("SetKey", &other)),
        }
    }

    /// GetKey
    pub fn get_key(&mut self, key: &str) -> Result<Vec<u8>> {
        match self.call(&Request::GetKey {
            key: key.to_string(),
        })? {
            Response::Value { value, .. } => Ok(value),
            other => Err(unexpected("GetKey", &other)),
        }
    }

    /// ListKeys
    pub fn list_keys(&mut self) -> Result<Vec<String>> {
        match self.call(&Request::ListKeys)? {
            Response::Keys { keys } => Ok(keys),
            other => Err(unexpected("ListKeys", &other)),
        }
    }

    /// Ping
    pub fn ping(&mut self) -> Result<()> {
        match self.call(&Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected("Ping", &other)),
        }
    }

    /// GetStream: values for `keys`, in order, one at a time
    pub fn get_stream(&mut self, keys: Vec<String>) -> Result<GetStream<'_>> {
        self.send(&Request::GetStream { keys })?;
        Ok(GetStream {
            client: self,
            finished: false,
        })
    }

    /// GetStream that owns the connection, for handing to another thread
    pub fn into_get_stream(mut self, keys: Vec<String>) -> Result<OwnedGetStream> {
        self.send(&Request::GetStream { keys })?;
        Ok(OwnedGetStream {
            client: self,
            finished: false,
        })
    }

    /// Open a SetStream
    ///
    /// Close it with `SetStream::finish`; dropping it sends EndStream best-effort.
    pub fn set_stream(&mut self) -> Result<SetStream<'_>> {
        match self.call(&Request::SetStream)? {
            Response::Ok => Ok(SetStream {
                client: self,
                finished: false,
            }),
            other => Err(unexpected("SetStream", &other)),
        }
    }

    /// Address this client dialed
    pub fn addr(&self) -> &str {
        &self.addr
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn send(&mut self, request: &Request) -> Result<()> {
        write_request(&mut self.writer, request)
    }

    /// Read one response, turning `Error` frames into errors
    fn recv(&mut self) -> Result<Response> {
        match read_response(&mut self.reader)? {
            Response::Error { kind, message } => Err(Response::into_error(kind, message)),
            response => Ok(response),
        }
    }

    fn call(&mut self, request: &Request) -> Result<Response> {
        self.send(request)?;
        self.recv()
    }

    /// Next item of an in-flight GetStream; `None` at StreamEnd
    fn next_stream_value(&mut self) -> Option<Result<Record>> {
        match self.recv() {
            Ok(Response::Value { key, value }) => Some(Ok(Record { key, value })),
            Ok(Response::StreamEnd) => None,
            Ok(other) => Some(Err(unexpected("GetStream", &other))),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Try every address `addr` resolves to, in order, until one accepts
fn dial(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let candidates = addr
        .to_socket_addrs()
        .map_err(|e| DriftError::Network(format!("Cannot resolve {}: {}", addr, e)))?;

    let mut last_err = None;
    for socket_addr in candidates {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::trace!(addr, candidate = %socket_addr, "Connect attempt failed: {}", e);
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => DriftError::Network(format!("Cannot connect to {}: {}", addr, e)),
        None => DriftError::Network(format!("No address for {}", addr)),
    })
}

fn unexpected(call: &str, response: &Response) -> DriftError {
    DriftError::Protocol(format!("Unexpected response to {}: {:?}", call, response))
}

/// Iterator over the values of a GetStream
///
/// Ends after StreamEnd or the first error. Drain it before issuing another
/// call on the same client; unread values stay queued on the connection.
pub struct GetStream<'a> {
    client: &'a mut Client,
    finished: bool,
}

impl Iterator for GetStream<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = self.client.next_stream_value();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

/// Owning variant of [`GetStream`]
pub struct OwnedGetStream {
    client: Client,
    finished: bool,
}

impl Iterator for OwnedGetStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = self.client.next_stream_value();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

/// Writer half of a SetStream
///
/// Each `send` waits for its acknowledgement.
pub struct SetStream<'a> {
    client: &'a mut Client,
    finished: bool,
}

impl SetStream<'_> {
    /// Store one record; an error closes the stream server-side
    pub fn send(&mut self, record: Record) -> Result<()> {
        if self.finished {
            return Err(DriftError::Protocol("SetStream already closed".to_string()));
        }

        let result = self.client.call(&Request::SetKey {
            key: record.key,
            value: record.value,
        });

        match result {
            Ok(Response::Ack) => Ok(()),
            Ok(other) => {
                self.finished = true;
                Err(unexpected("SetStream", &other))
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Close the stream cleanly
    pub fn finish(mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        match self.client.call(&Request::EndStream)? {
            Response::StreamEnd => Ok(()),
            other => Err(unexpected("EndStream", &other)),
        }
    }
}

impl Drop for SetStream<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.client.call(&Request::EndStream);
        }
    }
}
