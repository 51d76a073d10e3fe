//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ CRC (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DriftError, Result};

use super::{Request, Response};

/// Header size: 4 bytes length + 4 bytes CRC32
pub const HEADER_SIZE: usize = 8;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frame Encoding/Decoding
// =============================================================================

/// Encode a message into a complete frame
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(message)?;

    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(DriftError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_u32(crc32fast::hash(&payload));
    frame.put_slice(&payload);

    Ok(frame.to_vec())
}

/// Decode a message from a complete frame
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_SIZE {
        return Err(DriftError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let payload_len = header.get_u32();
    let crc = header.get_u32();

    check_payload_len(payload_len)?;

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(DriftError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    decode_payload(&bytes[HEADER_SIZE..total_len], crc)
}

fn check_payload_len(payload_len: u32) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(DriftError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn decode_payload<T: DeserializeOwned>(payload: &[u8], crc: u32) -> Result<T> {
    let actual = crc32fast::hash(payload);
    if actual != crc {
        return Err(DriftError::Protocol(format!(
            "Frame checksum mismatch: header {:08x}, payload {:08x}",
            crc, actual
        )));
    }

    bincode::deserialize(payload)
        .map_err(|e| DriftError::Protocol(format!("Malformed payload: {}", e)))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one frame from a stream
///
/// Blocks until a complete frame is received or an error occurs
fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let mut fields = &header[..];
    let payload_len = fields.get_u32();
    let crc = fields.get_u32();

    check_payload_len(payload_len)?;

    // Read payload
    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }

    decode_payload(&payload, crc)
}

fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let bytes = encode_frame(message)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete request from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    read_frame(reader)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    write_frame(writer, request)
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    read_frame(reader)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_frame(writer, response)
}
