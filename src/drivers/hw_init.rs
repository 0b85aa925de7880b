//! One-shot output peripheral initialization.
//!
//! Configures the relay GPIO as a push-pull output (driven low) and the
//! LEDC timer/channel behind the indicator LED, using raw ESP-IDF sys
//! calls. Called once from `main()` before any evaluator is spawned.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    /// Pin number outside `0..=MAX_OUTPUT_GPIO`.
    InvalidPin(i32),
    GpioConfigFailed(i32),
    LedcTimerFailed(i32),
    LedcChannelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "GPIO{} is not an output-capable pin", pin),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcTimerFailed(rc) => write!(f, "LEDC timer config failed (rc={})", rc),
            Self::LedcChannelFailed(rc) => write!(f, "LEDC channel config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(_: HwInitError) -> Self {
        Self::Init("output peripherals")
    }
}

fn check_pin(pin: i32) -> Result<(), HwInitError> {
    if (0..=pins::MAX_OUTPUT_GPIO).contains(&pin) {
        Ok(())
    } else {
        Err(HwInitError::InvalidPin(pin))
    }
}

/// Configure the relay output and the indicator PWM.
#[cfg(target_os = "espidf")]
pub fn init_outputs(relay_gpio: i32, indicator_gpio: i32) -> Result<(), HwInitError> {
    check_pin(relay_gpio)?;
    check_pin(indicator_gpio)?;
    // SAFETY: Called once from main() before evaluators start; single-threaded.
    unsafe {
        init_relay_gpio(relay_gpio)?;
        init_ledc(indicator_gpio)?;
    }
    info!("hw_init: relay=GPIO{}, indicator=GPIO{} (LEDC CH{})",
        relay_gpio, indicator_gpio, pins::INDICATOR_LEDC_CHANNEL);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_outputs(relay_gpio: i32, indicator_gpio: i32) -> Result<(), HwInitError> {
    check_pin(relay_gpio)?;
    check_pin(indicator_gpio)?;
    log::info!("hw_init(sim): relay=GPIO{}, indicator=GPIO{}", relay_gpio, indicator_gpio);
    Ok(())
}

// ── Relay GPIO ────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_relay_gpio(pin: i32) -> Result<(), HwInitError> {
    // Clear any IOMUX function left by the bootloader first.
    unsafe { gpio_reset_pin(pin) };

    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    let ret = unsafe { gpio_set_level(pin, 0) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    Ok(())
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc(pin: i32) -> Result<(), HwInitError> {
    // Timer 0: indicator (5 kHz, 10-bit)
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: pins::PWM_RESOLUTION_BITS,
        freq_hz: pins::INDICATOR_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcTimerFailed(ret)); }

    let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: pins::INDICATOR_LEDC_CHANNEL,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: pin,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    }) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcChannelFailed(ret)); }
    Ok(())
}
