//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (µs since boot,
//!   monotonic, 64-bit).
//! - **other targets**: `std::time::Instant` from construction.

use std::time::Duration;

use crate::app::ports::Clock;

/// The device clock every channel deadline is measured against.
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: reads the 64-bit high-resolution timer; callable from any task.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since construction.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }
}

/// Process-wide monotonic time, as a plain `fn` for APIs that take a
/// time provider (the accept-rate token bucket).
#[cfg(target_os = "espidf")]
pub fn platform_now() -> Duration {
    // SAFETY: see MonotonicClock::uptime_us.
    Duration::from_micros((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64)
}

/// Process-wide monotonic time, as a plain `fn` for APIs that take a
/// time provider (the accept-rate token bucket).
#[cfg(not(target_os = "espidf"))]
pub fn platform_now() -> Duration {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed()
}
