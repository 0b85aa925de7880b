//! Command ingestion: wire codec, transport boundary, connection handler.
//!
//! ```text
//! Transport::read ──▶ framing ──▶ decode_command ──▶ ChannelBank::apply
//! ```

pub mod codec;
pub mod handler;
pub mod transport;
