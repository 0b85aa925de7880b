//! The set of channels a decoded command fans out to.

use std::sync::Arc;

use super::Channel;
use crate::app::events::ChannelStatus;
use crate::error::{Error, Result};
use crate::protocol::codec::Command;

/// Upper bound on channels per device (relay + indicator + headroom).
pub const MAX_CHANNELS: usize = 4;

/// Fixed-capacity list of shared channels.
///
/// Built once at boot and then shared read-only (`Arc<ChannelBank>`)
/// between every connection handler; each channel does its own locking.
#[derive(Default)]
pub struct ChannelBank {
    channels: heapless::Vec<Arc<dyn Channel>, MAX_CHANNELS>,
}

impl ChannelBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel. Fails once [`MAX_CHANNELS`] are registered.
    pub fn push(&mut self, channel: Arc<dyn Channel>) -> Result<()> {
        self.channels
            .push(channel)
            .map_err(|_| Error::Init("channel bank full"))
    }

    /// Extend every channel with the command's duration.
    ///
    /// Channels are locked one at a time; never more than one lock is
    /// held by the caller.
    pub fn apply(&self, now_ms: u64, command: &Command) {
        for channel in &self.channels {
            channel.extend(now_ms, command.duration_ms);
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Per-channel logical state at `now_ms`.
    pub fn status(&self, now_ms: u64) -> heapless::Vec<ChannelStatus, MAX_CHANNELS> {
        self.channels
            .iter()
            .map(|ch| ChannelStatus {
                name: ch.name(),
                active: ch.is_active(now_ms),
                remaining_ms: ch.remaining_ms(now_ms),
                pulse: ch.pulse_active(now_ms),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::deadline::DeadlineStore;
    use crate::error::HardwareError;

    struct Bare(&'static str, DeadlineStore<()>);

    impl Channel for Bare {
        fn name(&self) -> &'static str {
            self.0
        }
        fn extend(&self, now_ms: u64, duration_ms: u32) {
            self.1.extend(now_ms, duration_ms);
        }
        fn is_active(&self, now_ms: u64) -> bool {
            self.1.evaluate(now_ms)
        }
        fn remaining_ms(&self, now_ms: u64) -> u64 {
            self.1.deadline().remaining_ms(now_ms)
        }
        fn tick(&self, _now_ms: u64) -> core::result::Result<bool, HardwareError> {
            Ok(false)
        }
        fn force_off(&self) -> core::result::Result<(), HardwareError> {
            Ok(())
        }
    }

    fn bare(name: &'static str) -> Arc<dyn Channel> {
        Arc::new(Bare(name, DeadlineStore::new(0, ())))
    }

    #[test]
    fn apply_extends_every_channel() {
        let mut bank = ChannelBank::new();
        bank.push(bare("a")).unwrap();
        bank.push(bare("b")).unwrap();
        bank.apply(10, &Command { duration_ms: 90 });

        let status = bank.status(50);
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|s| s.active && s.remaining_ms == 50));
        assert!(bank.status(100).iter().all(|s| !s.active));
    }

    #[test]
    fn rejects_past_capacity() {
        let mut bank = ChannelBank::new();
        for _ in 0..MAX_CHANNELS {
            bank.push(bare("x")).unwrap();
        }
        assert_eq!(bank.push(bare("y")), Err(Error::Init("channel bank full")));
        assert_eq!(bank.len(), MAX_CHANNELS);
    }
}
