//! Storage Module
//!
//! The append-only record log: the only place values physically live.
//!
//! ## Responsibilities
//! - Append key bytes followed by value bytes at the write cursor
//! - Serve positioned reads of exact byte ranges
//! - Flush buffered appends before any read
//!
//! ## File Format
//! ```text
//! ┌──────────────┬────────────────┬──────────────┬────────────────┬─────
//! │ Key 1 bytes  │ Value 1 bytes  │ Key 2 bytes  │ Value 2 bytes  │ ...
//! └──────────────┴────────────────┴──────────────┴────────────────┴─────
//! ```
//!
//! There is no framing: records cannot be found by scanning the log. The key
//! index is the only authority for where a value starts and how long it is,
//! so the two files must be written together.

mod record;
mod record_log;

pub use record::Record;
pub use record_log::RecordLog;
