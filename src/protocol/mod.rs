//! Protocol Module
//!
//! Defines the wire protocol between clients, peers and the service.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ CRC (4)  │   Payload (bincode)         │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! Both header fields are big-endian; the CRC covers the payload only.
//!
//! ### Calls
//! - `Hello`      → `Ok`          (sets the caller subject for the connection)
//! - `SetKey`     → `Ack`
//! - `GetKey`     → `Value`
//! - `ListKeys`   → `Keys`
//! - `GetStream`  → `Value`* then `StreamEnd`, or `Error` ending the stream
//! - `SetStream`  → `Ok`, then (`SetKey` → `Ack`)*, `EndStream` → `StreamEnd`
//! - `Ping`       → `Pong`
//!
//! Any call may instead be answered by `Error { kind, message }`.

mod request;
mod response;
mod codec;

pub use request::Request;
pub use response::{ErrorKind, Response};
pub use codec::{
    decode_frame, encode_frame, read_request, read_response, write_request, write_response,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
