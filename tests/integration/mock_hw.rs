//! Mock outputs, clock and event sink for integration tests.
//!
//! Pins record every write into a shared history so tests can assert on
//! the full output timeline after handing the pin itself to a channel.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use netrelay::app::events::AppEvent;
use netrelay::app::ports::{Clock, EventSink};
use netrelay::protocol::transport::{Peer, Transport};

// ── Digital output ────────────────────────────────────────────

/// Relay pin whose writes land in a shared history.
pub struct RecordingPin {
    history: Arc<Mutex<Vec<bool>>>,
}

#[allow(dead_code)]
impl RecordingPin {
    pub fn new() -> (Self, Arc<Mutex<Vec<bool>>>) {
        let history = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                history: Arc::clone(&history),
            },
            history,
        )
    }
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.history.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.history.lock().unwrap().push(true);
        Ok(())
    }
}

// ── PWM output ────────────────────────────────────────────────

pub const MOCK_MAX_DUTY: u16 = 1023;

/// Indicator PWM whose duty writes land in a shared history.
pub struct RecordingPwm {
    history: Arc<Mutex<Vec<u16>>>,
}

#[allow(dead_code)]
impl RecordingPwm {
    pub fn new() -> (Self, Arc<Mutex<Vec<u16>>>) {
        let history = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                history: Arc::clone(&history),
            },
            history,
        )
    }
}

impl embedded_hal::pwm::ErrorType for RecordingPwm {
    type Error = Infallible;
}

impl SetDutyCycle for RecordingPwm {
    fn max_duty_cycle(&self) -> u16 {
        MOCK_MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.history.lock().unwrap().push(duty);
        Ok(())
    }
}

/// Last recorded level, or the reset level if nothing was written.
#[allow(dead_code)]
pub fn last<T: Copy + Default>(history: &Mutex<Vec<T>>) -> T {
    history.lock().unwrap().last().copied().unwrap_or_default()
}

// ── Clock ─────────────────────────────────────────────────────

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(ms),
        })
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Collects every emitted event.
#[derive(Default)]
pub struct CollectingSink {
    pub events: Mutex<Vec<AppEvent>>,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Transport ─────────────────────────────────────────────────

/// Transport that replays a fixed script of reads, then reports closed.
pub struct ScriptedTransport {
    reads: VecDeque<Result<Vec<u8>, String>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(reads: Vec<Result<Vec<u8>, String>>) -> Self {
        Self {
            reads: reads.into(),
        }
    }

    /// Successful reads only, then a clean close.
    pub fn chunks(chunks: &[&[u8]]) -> Self {
        Self::new(chunks.iter().map(|c| Ok(c.to_vec())).collect())
    }
}

impl Transport for ScriptedTransport {
    type Error = String;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, String> {
        match self.reads.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
        }
    }

    fn peer(&self) -> Peer {
        Peer(None)
    }
}
