//! TCP command listener.
//!
//! Binds the command port, accepts connections, and runs each admitted
//! connection's [`ConnectionHandler`] on its own thread pinned to the
//! protocol core.
//!
//! ## Admission
//!
//! Two gates, checked in this order for every accepted socket:
//!
//! 1. **Capacity**: at most `max_connections` handlers alive at once.
//!    Each handler holds a [`ConnectionPermit`] that releases its slot
//!    when the thread ends.
//! 2. **Rate**: a `burster` token bucket refilled at
//!    `accept_rate_per_sec` (burst of the same size).
//!
//! A refused socket is closed immediately; nothing else is affected.
//! A failure of `bind` or `accept` itself is fatal.

use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use burster::Limiter;
use log::{error, info};

use super::time::platform_now;
use crate::app::events::{AppEvent, RejectReason};
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::ListenerError;
use crate::protocol::handler::{ConnectionHandler, HandlerContext};
use crate::protocol::transport::Peer;

const HANDLER_PRIORITY: u8 = 5;
/// Handler stack: 1 KiB receive buffer plus logging headroom.
const HANDLER_STACK_KB: usize = 6;
const LISTENER_PRIORITY: u8 = 5;
const LISTENER_STACK_KB: usize = 4;

// ───────────────────────────────────────────────────────────────
// Admission control
// ───────────────────────────────────────────────────────────────

/// A held connection slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct ConnectionPermit {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Capacity cap plus accept-rate limiter.
pub struct Admission {
    active: Arc<AtomicUsize>,
    max: usize,
    limiter: burster::TokenBucket<fn() -> Duration>,
}

impl Admission {
    pub fn new(max_connections: u8, accept_rate_per_sec: u8) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            max: usize::from(max_connections),
            limiter: burster::TokenBucket::new_with_time_provider(
                accept_rate_per_sec.into(),
                accept_rate_per_sec.into(),
                platform_now as fn() -> Duration,
            ),
        }
    }

    /// Take a slot, or say why not. A capacity refusal does not spend a
    /// rate token.
    pub fn try_admit(&mut self) -> Result<ConnectionPermit, RejectReason> {
        if self.active.load(Ordering::Acquire) >= self.max {
            return Err(RejectReason::AtCapacity);
        }
        if self.limiter.try_consume(1).is_err() {
            return Err(RejectReason::RateLimited);
        }
        // Only the accept loop increments, so the check above cannot race
        // with another admission.
        self.active.fetch_add(1, Ordering::AcqRel);
        Ok(ConnectionPermit {
            active: Arc::clone(&self.active),
        })
    }

    /// Live handler count, shared for status reporting.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }
}

// ───────────────────────────────────────────────────────────────
// Listener
// ───────────────────────────────────────────────────────────────

pub struct Listener {
    socket: TcpListener,
    port: u16,
    ctx: HandlerContext,
    admission: Admission,
}

impl Listener {
    /// Bind `0.0.0.0:port`. Port 0 picks an ephemeral port (tests).
    pub fn bind(port: u16, ctx: HandlerContext, admission: Admission) -> Result<Self, ListenerError> {
        let socket = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .map_err(|e| {
                error!("listener: bind :{} failed: {}", port, e);
                ListenerError::Bind { port }
            })?;
        let port = socket.local_addr().map(|a| a.port()).unwrap_or(port);
        info!("listener: bound on :{}", port);
        Ok(Self { socket, port, ctx, admission })
    }

    /// Port actually bound.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept forever. Returns only when `accept` fails.
    pub fn serve(mut self) -> ListenerError {
        loop {
            match self.socket.accept() {
                Ok((stream, addr)) => self.admit(stream, Peer::from(addr)),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("listener: accept failed: {}", e);
                    return ListenerError::Accept;
                }
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, peer: Peer) {
        let permit = match self.admission.try_admit() {
            Ok(permit) => permit,
            Err(reason) => {
                self.ctx.events.emit(&AppEvent::ClientRejected { peer, reason });
                return;
            }
        };

        let ctx = self.ctx.clone();
        let spawned = spawn_on_core(
            Core::Pro,
            HANDLER_PRIORITY,
            HANDLER_STACK_KB,
            "conn\0",
            move || {
                let _permit = permit;
                ConnectionHandler::new(stream, ctx).run();
            },
        );
        match spawned {
            Ok(_) => self.ctx.events.emit(&AppEvent::ClientConnected { peer }),
            Err(e) => {
                error!("listener: cannot spawn handler for {}: {}", peer, e);
                self.ctx.events.emit(&AppEvent::ClientRejected {
                    peer,
                    reason: RejectReason::SpawnFailed,
                });
            }
        }
    }

    /// Run [`serve`](Self::serve) on its own thread; an accept failure
    /// aborts the process.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        spawn_on_core(Core::Pro, LISTENER_PRIORITY, LISTENER_STACK_KB, "listener\0", move || {
            let err = self.serve();
            error!("listener: {} - aborting", err);
            std::process::abort();
        })
    }
}
