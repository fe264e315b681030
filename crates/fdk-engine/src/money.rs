//! Fixed-point money helpers.
//!
//! Amounts are `i64` micros (1 unit of currency = 1_000_000 micros).
//! Configured percents are quantized once to integer basis points; all
//! limit arithmetic after that point is integer math with `i128`
//! intermediates, so results are identical across platforms and runs.

/// 1e-6 fixed-point scale.
pub const MICROS_SCALE: i64 = 1_000_000;

/// Quantize a percent value (`5.0` = 5%) to basis points (`500`).
///
/// Quantization happens exactly once, at the config boundary; fractional
/// basis points round half away from zero.
pub fn percent_to_bps(percent: f64) -> i64 {
    (percent * 100.0).round() as i64
}

/// `bps / 10_000` of a non-negative micros amount, rounded half up.
pub fn bps_of(amount_micros: i64, bps: i64) -> i64 {
    debug_assert!(amount_micros >= 0);
    debug_assert!(bps >= 0);
    ((amount_micros as i128 * bps as i128 + 5_000) / 10_000) as i64
}

/// `percent%` of a non-negative micros amount.
pub fn percent_of(amount_micros: i64, percent: f64) -> i64 {
    bps_of(amount_micros, percent_to_bps(percent))
}
