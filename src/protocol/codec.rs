//! Fixed-size command codec.
//!
//! Wire format: one command is exactly four bytes carrying an unsigned
//! 32-bit duration in milliseconds.
//!
//! ```text
//! ┌──────────────────────────┐
//! │ duration_ms (4B, u32)    │  byte order: ByteOrder (default Native)
//! └──────────────────────────┘
//! ```
//!
//! How bytes are cut into frames is a separate choice ([`Framing`]):
//! the device default treats every `read` result as one frame, and
//! anything that is not exactly four bytes is rejected whole.
//! [`StreamFramer`] instead reassembles fragmented and coalesced reads
//! into 4-byte units.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Size of one command on the wire.
pub const COMMAND_LEN: usize = 4;

/// Byte order of the duration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// The device's own byte order (little-endian on every ESP32).
    #[default]
    Native,
    Little,
    Big,
}

/// How a byte stream is split into command frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Framing {
    /// One `read` result is one frame; wrong-length reads are rejected.
    #[default]
    PerRead,
    /// Bytes are reassembled into consecutive 4-byte frames.
    Stream,
}

/// A decoded activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub duration_ms: u32,
}

/// Decode one frame. Succeeds only for exactly [`COMMAND_LEN`] bytes.
pub fn decode_command(frame: &[u8], order: ByteOrder) -> Result<Command, FrameError> {
    let bytes: [u8; COMMAND_LEN] = frame.try_into().map_err(|_| FrameError::BadLength {
        got: frame.len(),
        expected: COMMAND_LEN,
    })?;
    let duration_ms = match order {
        ByteOrder::Native => u32::from_ne_bytes(bytes),
        ByteOrder::Little => u32::from_le_bytes(bytes),
        ByteOrder::Big => u32::from_be_bytes(bytes),
    };
    Ok(Command { duration_ms })
}

/// Encode a command, e.g. for test clients.
pub fn encode_command(command: Command, order: ByteOrder) -> [u8; COMMAND_LEN] {
    match order {
        ByteOrder::Native => command.duration_ms.to_ne_bytes(),
        ByteOrder::Little => command.duration_ms.to_le_bytes(),
        ByteOrder::Big => command.duration_ms.to_be_bytes(),
    }
}

/// Streaming reassembler for [`Framing::Stream`].
///
/// Holds at most three bytes of a partial frame between reads; never
/// rejects anything, since every byte belongs to some 4-byte unit.
#[derive(Debug, Default)]
pub struct StreamFramer {
    partial: [u8; COMMAND_LEN],
    collected: usize,
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes, calling `on_frame` for every completed frame
    /// in arrival order.
    pub fn feed(&mut self, mut data: &[u8], mut on_frame: impl FnMut([u8; COMMAND_LEN])) {
        while !data.is_empty() {
            let to_copy = (COMMAND_LEN - self.collected).min(data.len());
            self.partial[self.collected..self.collected + to_copy]
                .copy_from_slice(&data[..to_copy]);
            self.collected += to_copy;
            data = &data[to_copy..];

            if self.collected == COMMAND_LEN {
                self.collected = 0;
                on_frame(self.partial);
            }
        }
    }

    /// Bytes of an incomplete frame currently buffered.
    pub fn pending(&self) -> usize {
        self.collected
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.collected = 0;
    }
}
