//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by rendering application events as single
//! log lines (UART / USB-CDC on the device, stderr in simulation).
//! Per-frame events go out at `debug` so a busy client does not flood
//! the console; lifecycle and safety events at `info` and above.

use core::fmt::Write as _;

use log::{debug, error, info, warn};

use crate::app::events::{AppEvent, RejectReason};
use crate::app::ports::{EventSink, LinkDelegate, LinkEvent};

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        match event {
            AppEvent::Started { port, channels } => {
                info!("START | listening on :{} | channels={}", port, channels);
            }
            AppEvent::ClientConnected { peer } => {
                info!("CONN  | {} connected", peer);
            }
            AppEvent::ClientRejected { peer, reason } => {
                let why = match reason {
                    RejectReason::AtCapacity => "at capacity",
                    RejectReason::RateLimited => "rate limited",
                    RejectReason::SpawnFailed => "handler spawn failed",
                };
                warn!("CONN  | {} rejected ({})", peer, why);
            }
            AppEvent::CommandAccepted { peer, duration_ms } => {
                debug!("CMD   | {} -> {} ms", peer, duration_ms);
            }
            AppEvent::FrameRejected { peer, error } => {
                debug!("CMD   | {} dropped frame: {}", peer, error);
            }
            AppEvent::ClientDisconnected { peer, termination } => {
                info!("CONN  | {} {}", peer, termination);
            }
            AppEvent::Link(LinkEvent::Started) => info!("LINK  | station started"),
            AppEvent::Link(LinkEvent::Disconnected) => warn!("LINK  | disconnected"),
            AppEvent::Link(LinkEvent::GotIp(ip)) => info!("LINK  | got ip {}", ip),
            AppEvent::EvaluatorStalled { channel, silent_ms } => {
                error!("SAFE  | evaluator '{}' silent for {} ms", channel, silent_ms);
            }
            AppEvent::Status(s) => {
                let mut line = heapless::String::<128>::new();
                for ch in &s.channels {
                    // Overflow just shortens the line.
                    let _ = write!(line, " {}={}", ch.name, if ch.active { "ON" } else { "off" });
                    if ch.active {
                        let _ = write!(line, "({}ms)", ch.remaining_ms);
                    }
                    if ch.pulse {
                        let _ = write!(line, "+pulse");
                    }
                }
                info!(
                    "STAT  | up={}s | conns={} |{}",
                    s.uptime_ms / 1_000,
                    s.connections,
                    line
                );
            }
        }
    }
}

/// Link events are rendered like any other application event.
impl LinkDelegate for LogEventSink {
    fn on_link_event(&self, event: LinkEvent) {
        self.emit(&AppEvent::Link(event));
    }
}
