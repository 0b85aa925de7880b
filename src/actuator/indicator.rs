//! Fading indicator channel (PWM LED).
//!
//! Two deadlines live under the channel's lock:
//!
//! * the **fade** deadline, extended by the requested duration, sets the
//!   shape of the cubic decay from full brightness to dark;
//! * the **pulse** gate, extended by a short fixed window on every
//!   command, marks recent activity.
//!
//! The LED shows the fade value only while both are active, so a long
//! command gives a brief flash whose brightness reflects how much of the
//! requested interval is left, and a burst of commands keeps it lit.

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use super::deadline::{Deadline, DeadlineStore};
use super::fade::fade_level;
use super::Channel;
use crate::error::HardwareError;

struct IndicatorOutput<P> {
    pwm: P,
    pulse: Deadline,
    /// Duty last written to `pwm`.
    duty: u16,
}

impl<P: SetDutyCycle> IndicatorOutput<P> {
    fn write(&mut self, name: &'static str, duty: u16) -> Result<(), HardwareError> {
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|_| HardwareError::PwmWrite { channel: name })?;
        self.duty = duty;
        Ok(())
    }
}

fn target_duty(fade: &Deadline, pulse: &Deadline, peak: u16, now_ms: u64) -> u16 {
    if fade.is_active(now_ms) && pulse.is_active(now_ms) {
        fade_level(peak, fade.elapsed_ms(now_ms), fade.duration_ms())
    } else {
        0
    }
}

/// Indicator channel over any embedded-hal [`SetDutyCycle`] output.
pub struct IndicatorChannel<P> {
    name: &'static str,
    pulse_ms: u32,
    peak: u16,
    store: DeadlineStore<IndicatorOutput<P>>,
}

impl<P: SetDutyCycle> IndicatorChannel<P> {
    /// Dark channel. `pulse_ms` is the activity window opened by each
    /// command; peak brightness is the output's full-scale duty.
    pub fn new(name: &'static str, pwm: P, pulse_ms: u32, now_ms: u64) -> Self {
        let peak = pwm.max_duty_cycle();
        Self {
            name,
            pulse_ms,
            peak,
            store: DeadlineStore::new(
                now_ms,
                IndicatorOutput {
                    pwm,
                    pulse: Deadline::expired_at(now_ms),
                    duty: 0,
                },
            ),
        }
    }

    /// Brightness the channel should show at `now_ms`.
    pub fn level_at(&self, now_ms: u64) -> u16 {
        let peak = self.peak;
        self.store
            .with(|fade, out| target_duty(fade, &out.pulse, peak, now_ms))
    }

    /// Duty last committed to the output.
    pub fn committed(&self) -> u16 {
        self.store.with(|_, out| out.duty)
    }
}

impl<P: SetDutyCycle + Send> Channel for IndicatorChannel<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extend(&self, now_ms: u64, duration_ms: u32) {
        let pulse_ms = self.pulse_ms;
        self.store.with(|fade, out| {
            fade.extend(now_ms, duration_ms);
            out.pulse.extend(now_ms, pulse_ms);
        });
        debug!("{}: fade over {} ms", self.name, duration_ms);
    }

    fn is_active(&self, now_ms: u64) -> bool {
        self.store
            .with(|fade, out| fade.is_active(now_ms) && out.pulse.is_active(now_ms))
    }

    fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.store.with(|fade, out| {
            fade.remaining_ms(now_ms).min(out.pulse.remaining_ms(now_ms))
        })
    }

    fn pulse_active(&self, now_ms: u64) -> bool {
        self.store.with(|_, out| out.pulse.is_active(now_ms))
    }

    fn tick(&self, now_ms: u64) -> Result<bool, HardwareError> {
        let (name, peak) = (self.name, self.peak);
        self.store.with(|fade, out| {
            let want = target_duty(fade, &out.pulse, peak, now_ms);
            if want == out.duty {
                return Ok(false);
            }
            out.write(name, want)?;
            Ok(true)
        })
    }

    fn force_off(&self) -> Result<(), HardwareError> {
        let name = self.name;
        self.store.with(|_, out| out.write(name, 0))
    }
}
