//! Binary actuator channel (relay).
//!
//! Drives a digital output high while the deadline is active and low
//! otherwise. The pin is only touched when the computed level differs
//! from the last committed one, so an idle relay costs one lock per tick.

use embedded_hal::digital::{OutputPin, PinState};
use log::{debug, info};

use super::deadline::DeadlineStore;
use super::Channel;
use crate::error::HardwareError;

struct RelayOutput<P> {
    pin: P,
    /// Level last written to `pin`.
    level: bool,
}

impl<P: OutputPin> RelayOutput<P> {
    fn write(&mut self, name: &'static str, level: bool) -> Result<(), HardwareError> {
        self.pin
            .set_state(PinState::from(level))
            .map_err(|_| HardwareError::GpioWrite { channel: name })?;
        self.level = level;
        Ok(())
    }
}

/// Relay channel over any embedded-hal [`OutputPin`].
pub struct RelayChannel<P> {
    name: &'static str,
    store: DeadlineStore<RelayOutput<P>>,
}

impl<P: OutputPin> RelayChannel<P> {
    /// Inactive channel. The pin is assumed low until the first
    /// [`Channel::force_off`] makes that true.
    pub fn new(name: &'static str, pin: P, now_ms: u64) -> Self {
        Self {
            name,
            store: DeadlineStore::new(now_ms, RelayOutput { pin, level: false }),
        }
    }

    /// Level last committed to the pin.
    pub fn committed(&self) -> bool {
        self.store.with(|_, out| out.level)
    }
}

impl<P: OutputPin + Send> Channel for RelayChannel<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extend(&self, now_ms: u64, duration_ms: u32) {
        self.store.extend(now_ms, duration_ms);
        debug!("{}: active for {} ms", self.name, duration_ms);
    }

    fn is_active(&self, now_ms: u64) -> bool {
        self.store.evaluate(now_ms)
    }

    fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.store.deadline().remaining_ms(now_ms)
    }

    fn tick(&self, now_ms: u64) -> Result<bool, HardwareError> {
        let name = self.name;
        self.store.with(|deadline, out| {
            let want = deadline.is_active(now_ms);
            if want == out.level {
                return Ok(false);
            }
            out.write(name, want)?;
            info!("{}: {}", name, if want { "ON" } else { "OFF" });
            Ok(true)
        })
    }

    fn force_off(&self) -> Result<(), HardwareError> {
        let name = self.name;
        self.store.with(|_, out| out.write(name, false))
    }
}
