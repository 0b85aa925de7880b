//! Actuation / timing engine.
//!
//! Turns an arbitrary stream of (possibly overlapping, possibly concurrent)
//! "activate for N milliseconds" requests into one coherent output timeline
//! per channel.
//!
//! ```text
//!  conn thread ──extend──┐                     ┌── evaluator thread (10 ms)
//!  conn thread ──extend──┼─▶ DeadlineStore<S> ◀┘   compare + commit
//!  conn thread ──extend──┘   (one lock: deadline + output state)
//! ```
//!
//! * [`deadline`]: deadline value + the per-channel lock.
//! * [`fade`]: cubic ease-out intensity curve.
//! * [`relay`]: binary channel (`OutputPin`).
//! * [`indicator`]: fading PWM channel gated by an activity pulse (`SetDutyCycle`).
//! * [`bank`]: the set of channels a command fans out to.
//! * [`evaluator`]: the periodic commit loop, one thread per channel.

pub mod bank;
pub mod deadline;
pub mod evaluator;
pub mod fade;
pub mod indicator;
pub mod relay;

use crate::error::HardwareError;

/// One independently-deadlined output.
///
/// `extend` may be called from any connection thread; `tick` is called
/// only by the channel's evaluator, which is the sole writer of the
/// physical output. Both take the channel's single lock.
pub trait Channel: Send + Sync {
    /// Short name for logs and status reports.
    fn name(&self) -> &'static str;

    /// Overwrite the deadline with `now_ms + duration_ms` (last writer wins).
    fn extend(&self, now_ms: u64, duration_ms: u32);

    /// Logical state at `now_ms`, independent of what is on the pin.
    fn is_active(&self, now_ms: u64) -> bool;

    /// Milliseconds left until the channel goes inactive (0 when inactive).
    fn remaining_ms(&self, now_ms: u64) -> u64;

    /// Whether a recent command's activity pulse is still open. Opened by
    /// every command, including ones too short to activate the channel.
    fn pulse_active(&self, _now_ms: u64) -> bool {
        false
    }

    /// Recompute the output for `now_ms` and write it if it changed.
    /// Returns `true` when a hardware write happened.
    fn tick(&self, now_ms: u64) -> Result<bool, HardwareError>;

    /// Unconditionally drive the output to its off level.
    fn force_off(&self) -> Result<(), HardwareError>;
}
