//! Outbound application events.
//!
//! Connection handlers, the listener and the main loop emit these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them (serial log in production, a
//! recording sink in tests).

use crate::actuator::bank::MAX_CHANNELS;
use crate::error::FrameError;
use crate::protocol::handler::Termination;
use crate::protocol::transport::Peer;

use super::ports::LinkEvent;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The listener is bound and the evaluators are running.
    Started { port: u16, channels: usize },

    /// A connection was admitted and a handler spawned for it.
    ClientConnected { peer: Peer },

    /// A connection was refused at admission.
    ClientRejected { peer: Peer, reason: RejectReason },

    /// A frame decoded and the channel bank was extended.
    CommandAccepted { peer: Peer, duration_ms: u32 },

    /// A frame failed to decode; nothing was extended.
    FrameRejected { peer: Peer, error: FrameError },

    /// A connection handler finished.
    ClientDisconnected { peer: Peer, termination: Termination },

    /// Station link lifecycle change.
    Link(LinkEvent),

    /// An evaluator has not ticked within the supervision window.
    EvaluatorStalled { channel: &'static str, silent_ms: u64 },

    /// Periodic status snapshot.
    Status(StatusData),
}

/// Why the listener refused a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// `max_connections` handlers are already running.
    AtCapacity,
    /// The accept-rate token bucket is empty.
    RateLimited,
    /// The handler thread could not be created.
    SpawnFailed,
}

/// A point-in-time status snapshot suitable for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusData {
    pub uptime_ms: u64,
    pub connections: usize,
    pub channels: heapless::Vec<ChannelStatus, MAX_CHANNELS>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub name: &'static str,
    pub active: bool,
    pub remaining_ms: u64,
    /// Activity pulse open (always `false` for channels without one).
    pub pulse: bool,
}
