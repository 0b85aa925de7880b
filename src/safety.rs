//! Evaluator liveness supervision.
//!
//! Every evaluator stamps a [`Heartbeat`] after each tick. The main loop
//! asks the [`EvaluatorSupervisor`] whether all of them are fresh and
//! feeds the task watchdog only if they are, so a stuck evaluator resets
//! the device within the watchdog window.
//!
//! Stamps are stored as the low 32 bits of the millisecond clock: the
//! ESP32 has no 64-bit atomics. The wrapping difference of two `u32`
//! stamps is read as signed, which is exact for gaps under ~24 days and
//! lets a stamp taken after the supervisor's clock read count as fresh.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{error, info};

use crate::actuator::bank::MAX_CHANNELS;

/// An evaluator silent for longer than this is reported as stalled.
pub const STALL_THRESHOLD_MS: u32 = 1_000;

/// Last-tick stamp published by one evaluator.
#[derive(Debug)]
pub struct Heartbeat {
    name: &'static str,
    last_ms: AtomicU32,
}

impl Heartbeat {
    pub fn new(name: &'static str, now_ms: u64) -> Self {
        Self {
            name,
            last_ms: AtomicU32::new(now_ms as u32),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Record a completed tick.
    pub fn beat(&self, now_ms: u64) {
        self.last_ms.store(now_ms as u32, Ordering::Relaxed);
    }

    /// Milliseconds since the last beat; zero if the beat is newer than
    /// `now_ms`.
    pub fn silent_ms(&self, now_ms: u64) -> u32 {
        let gap = (now_ms as u32).wrapping_sub(self.last_ms.load(Ordering::Relaxed));
        (gap as i32).max(0) as u32
    }
}

/// A heartbeat that has gone quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stall {
    pub channel: &'static str,
    pub silent_ms: u32,
}

/// Watches the heartbeats of every evaluator.
pub struct EvaluatorSupervisor {
    heartbeats: heapless::Vec<Arc<Heartbeat>, MAX_CHANNELS>,
    threshold_ms: u32,
    /// Whether the previous check found a stall (for edge-triggered logs).
    stalled: bool,
}

impl Default for EvaluatorSupervisor {
    fn default() -> Self {
        Self::new(STALL_THRESHOLD_MS)
    }
}

impl EvaluatorSupervisor {
    pub fn new(threshold_ms: u32) -> Self {
        Self {
            heartbeats: heapless::Vec::new(),
            threshold_ms,
            stalled: false,
        }
    }

    /// Start watching `heartbeat`. Returns it back if already full.
    pub fn watch(&mut self, heartbeat: Arc<Heartbeat>) -> Result<(), Arc<Heartbeat>> {
        self.heartbeats.push(heartbeat)
    }

    /// Every heartbeat silent for longer than the threshold.
    pub fn check(&mut self, now_ms: u64) -> heapless::Vec<Stall, MAX_CHANNELS> {
        let stalls: heapless::Vec<Stall, MAX_CHANNELS> = self
            .heartbeats
            .iter()
            .filter_map(|hb| {
                let silent_ms = hb.silent_ms(now_ms);
                (silent_ms > self.threshold_ms).then_some(Stall {
                    channel: hb.name(),
                    silent_ms,
                })
            })
            .collect();

        match (self.stalled, stalls.is_empty()) {
            (false, false) => {
                for s in &stalls {
                    error!("SAFETY: evaluator '{}' silent for {} ms", s.channel, s.silent_ms);
                }
            }
            (true, true) => info!("SAFETY: all evaluators ticking again"),
            _ => {}
        }
        self.stalled = !stalls.is_empty();
        stalls
    }

    /// `true` when no evaluator is stalled.
    pub fn healthy(&mut self, now_ms: u64) -> bool {
        self.check(now_ms).is_empty()
    }
}
