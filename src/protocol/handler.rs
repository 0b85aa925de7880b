//! Per-connection handler.
//!
//! ```text
//!  Connected ──read n>0──▶ decode ──ok──▶ bank.apply ─┐
//!      ▲                     └──err──▶ warn, drop ────┤
//!      └──────────────────────────────────────────────┘
//!  Connected ──read 0──▶ PeerClosed ─┐
//!  Connected ──read Err─▶ IoError ───┴──▶ terminated (handler returns)
//! ```
//!
//! A handler owns its transport and receive buffer; the only state it
//! shares with other handlers is the channel bank. Malformed frames never
//! end a connection, and a failing connection never affects another.

use core::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use super::codec::{decode_command, ByteOrder, Framing, StreamFramer};
use super::transport::{Peer, Transport};
use crate::actuator::bank::ChannelBank;
use crate::app::events::AppEvent;
use crate::app::ports::{Clock, EventSink};

/// Receive buffer size. Reads larger than one command are still one
/// frame under [`Framing::PerRead`] (and rejected for their length).
pub const RECV_BUF_LEN: usize = 1024;

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Orderly close by the peer (`read` returned 0).
    PeerClosed,
    /// The transport reported an error; the message is truncated to fit.
    IoError(heapless::String<64>),
}

impl Termination {
    fn io(err: &impl fmt::Display) -> Self {
        let full = err.to_string();
        let mut end = full.len().min(64);
        while !full.is_char_boundary(end) {
            end -= 1;
        }
        let mut msg = heapless::String::new();
        // Cannot fail: `end` is within capacity.
        let _ = msg.push_str(&full[..end]);
        Self::IoError(msg)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

/// Everything a handler needs that outlives the connection.
#[derive(Clone)]
pub struct HandlerContext {
    pub bank: Arc<ChannelBank>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
    pub byte_order: ByteOrder,
    pub framing: Framing,
}

impl HandlerContext {
    /// Decode one frame and, if valid, extend every channel.
    fn dispatch(&self, peer: Peer, frame: &[u8]) {
        match decode_command(frame, self.byte_order) {
            Ok(cmd) => {
                self.bank.apply(self.clock.now_ms(), &cmd);
                debug!("conn[{}]: activate {} ms", peer, cmd.duration_ms);
                self.events.emit(&AppEvent::CommandAccepted {
                    peer,
                    duration_ms: cmd.duration_ms,
                });
            }
            Err(error) => {
                warn!("conn[{}]: {}", peer, error);
                self.events.emit(&AppEvent::FrameRejected { peer, error });
            }
        }
    }
}

/// Serves one connection until it closes or fails.
pub struct ConnectionHandler<T> {
    transport: T,
    peer: Peer,
    ctx: HandlerContext,
    framer: StreamFramer,
    buf: [u8; RECV_BUF_LEN],
}

impl<T: Transport> ConnectionHandler<T> {
    pub fn new(transport: T, ctx: HandlerContext) -> Self {
        let peer = transport.peer();
        Self {
            transport,
            peer,
            ctx,
            framer: StreamFramer::new(),
            buf: [0; RECV_BUF_LEN],
        }
    }

    pub fn peer(&self) -> Peer {
        self.peer
    }

    /// Read and dispatch until the connection terminates.
    pub fn run(mut self) -> Termination {
        info!("conn[{}]: connected", self.peer);

        let termination = loop {
            match self.transport.read(&mut self.buf) {
                Ok(0) => break Termination::PeerClosed,
                Ok(n) => self.on_received(n),
                Err(e) => break Termination::io(&e),
            }
        };

        match &termination {
            Termination::PeerClosed => info!("conn[{}]: {}", self.peer, termination),
            Termination::IoError(_) => warn!("conn[{}]: {}", self.peer, termination),
        }
        if self.framer.pending() > 0 {
            debug!("conn[{}]: dropped {} trailing bytes", self.peer, self.framer.pending());
        }
        self.ctx.events.emit(&AppEvent::ClientDisconnected {
            peer: self.peer,
            termination: termination.clone(),
        });
        termination
    }

    fn on_received(&mut self, n: usize) {
        let data = &self.buf[..n.min(RECV_BUF_LEN)];
        match self.ctx.framing {
            Framing::PerRead => self.ctx.dispatch(self.peer, data),
            Framing::Stream => {
                let (ctx, peer) = (&self.ctx, self.peer);
                self.framer.feed(data, |frame| ctx.dispatch(peer, &frame));
            }
        }
    }
}
