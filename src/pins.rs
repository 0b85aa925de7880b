//! Default GPIO / peripheral assignments for the NetRelay board.
//!
//! These are the factory defaults; [`SystemConfig`](crate::config::SystemConfig)
//! carries the pins actually used so a board variant can override them from NVS.

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Digital output driving the relay coil transistor (active HIGH).
pub const RELAY_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Indicator LED
// ---------------------------------------------------------------------------

/// On-board LED, driven through LEDC so it can fade.
pub const INDICATOR_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC channel used by the indicator.
pub const INDICATOR_LEDC_CHANNEL: u32 = 0;
/// LEDC timer resolution (bits). 10-bit gives a smooth low end for the fade.
pub const PWM_RESOLUTION_BITS: u32 = 10;
/// LEDC frequency for the indicator (5 kHz, flicker-free).
pub const INDICATOR_PWM_FREQ_HZ: u32 = 5_000;
/// Maximum duty value at [`PWM_RESOLUTION_BITS`].
pub const PWM_MAX_DUTY: u16 = (1 << PWM_RESOLUTION_BITS) - 1;

/// Highest GPIO number on the ESP32 that can be configured as an output.
pub const MAX_OUTPUT_GPIO: i32 = 33;
