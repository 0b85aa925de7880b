//! embedded-hal output implementations over the ESP-IDF GPIO and LEDC
//! drivers.
//!
//! The actuator channels are generic over `OutputPin` / `SetDutyCycle`;
//! these are the concrete types `main` hands them. In simulation the
//! writes land in a field and a `trace!` line instead of a register.

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::pins;

/// Driver return code of a failed output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputError(pub i32);

impl digital::Error for OutputError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl pwm::Error for OutputError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

// ── GPIO ──────────────────────────────────────────────────────

/// A push-pull GPIO configured by [`hw_init::init_outputs`](super::hw_init::init_outputs).
pub struct GpioOutput {
    pin: i32,
    #[cfg(not(target_os = "espidf"))]
    high: bool,
}

impl GpioOutput {
    pub fn new(pin: i32) -> Self {
        Self {
            pin,
            #[cfg(not(target_os = "espidf"))]
            high: false,
        }
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), OutputError> {
        // SAFETY: register write on a pin configured as output at boot;
        // each GpioOutput is owned by exactly one channel.
        let ret = unsafe { gpio_set_level(self.pin, u32::from(high)) };
        if ret != ESP_OK as i32 {
            return Err(OutputError(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), OutputError> {
        log::trace!("gpio(sim): GPIO{} <- {}", self.pin, u8::from(high));
        self.high = high;
        Ok(())
    }

    /// Last level written (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn is_set_high(&self) -> bool {
        self.high
    }
}

impl digital::ErrorType for GpioOutput {
    type Error = OutputError;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), OutputError> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), OutputError> {
        self.write(true)
    }
}

// ── LEDC ──────────────────────────────────────────────────────

/// One LEDC channel at [`pins::PWM_RESOLUTION_BITS`] resolution.
pub struct LedcOutput {
    channel: u32,
    #[cfg(not(target_os = "espidf"))]
    duty: u16,
}

impl LedcOutput {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            #[cfg(not(target_os = "espidf"))]
            duty: 0,
        }
    }

    /// Last duty written (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl pwm::ErrorType for LedcOutput {
    type Error = OutputError;
}

impl SetDutyCycle for LedcOutput {
    fn max_duty_cycle(&self) -> u16 {
        pins::PWM_MAX_DUTY
    }

    #[cfg(target_os = "espidf")]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), OutputError> {
        // SAFETY: channel configured in init_ledc(); only the indicator's
        // evaluator writes it.
        unsafe {
            let ret = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel, u32::from(duty));
            if ret != ESP_OK as i32 {
                return Err(OutputError(ret));
            }
            let ret = ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel);
            if ret != ESP_OK as i32 {
                return Err(OutputError(ret));
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), OutputError> {
        log::trace!("ledc(sim): CH{} <- {}", self.channel, duty);
        self.duty = duty.min(pins::PWM_MAX_DUTY);
        Ok(())
    }
}
