//! Transport abstraction: a blocking, byte-oriented connection.
//!
//! The connection handler is generic over `Transport`, so the same state
//! machine runs on a `TcpStream` on the device and on a scripted
//! transport in tests.

use core::fmt;
use std::io::Read;
use std::net::{SocketAddr, TcpStream};

/// Byte-oriented receive side of one connection.
pub trait Transport {
    /// Error type for this transport.
    type Error: fmt::Display;

    /// Block until data arrives, then copy up to `buf.len()` bytes into
    /// `buf`. `Ok(0)` means the peer closed the connection.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Remote address, for logging.
    fn peer(&self) -> Peer;
}

/// Remote endpoint of a connection, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer(pub Option<SocketAddr>);

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(addr) => write!(f, "{}", addr),
            None => write!(f, "unknown"),
        }
    }
}

impl From<SocketAddr> for Peer {
    fn from(addr: SocketAddr) -> Self {
        Self(Some(addr))
    }
}

impl Transport for TcpStream {
    type Error = std::io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, std::io::Error> {
        loop {
            match Read::read(self, buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn peer(&self) -> Peer {
        Peer(self.peer_addr().ok())
    }
}
