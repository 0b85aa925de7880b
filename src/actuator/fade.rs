//! Cubic ease-out intensity curve for the indicator channel.
//!
//! ```text
//! level = peak · (1 − elapsed/total)³  =  peak · remaining³ / total³
//! ```
//!
//! Computed in integer math (no libm, no floats): with `total ≤ u32::MAX`
//! ms and `peak ≤ u16::MAX`, `peak · total³` stays below 2¹¹³, so `u128`
//! never overflows.

/// Exponent of the decay curve. Higher values fade faster near the start.
pub const FADE_EXPONENT: u32 = 3;

/// Intensity at `elapsed_ms` into an activation lasting `total_ms`.
///
/// * `elapsed == 0` → `peak`
/// * `elapsed >= total` → `0`
/// * non-increasing in `elapsed`
pub fn fade_level(peak: u16, elapsed_ms: u64, total_ms: u64) -> u16 {
    if total_ms == 0 || elapsed_ms >= total_ms {
        return 0;
    }
    let remaining = u128::from(total_ms - elapsed_ms).pow(FADE_EXPONENT);
    let total = u128::from(total_ms).pow(FADE_EXPONENT);
    // remaining < total, so the quotient is < peak and fits in u16.
    (u128::from(peak) * remaining / total) as u16
}
