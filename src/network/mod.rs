//! Network Module
//!
//! TCP server and connection handling.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polls for shutdown)
//! - One thread per connection, capped at `max_connections`
//! - Requests routed through `KvService`

mod server;
mod connection;

pub use server::{Server, ServerHandle};
pub use connection::Connection;
