//! Time and duration conversion utilities.
//!
//! Playback positions and lyric timestamps are carried as microseconds in a
//! `u64`. These helpers keep the float conversions in one place with explicit
//! saturation behavior.

use std::time::Duration;

/// Microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Microseconds in one minute.
pub const MICROS_PER_MIN: u64 = 60 * MICROS_PER_SEC;

/// Convert fractional seconds to microseconds, rounding to the nearest microsecond.
///
/// Negative and NaN inputs map to 0; values beyond `u64::MAX` microseconds saturate.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn secs_f64_to_micros(secs: f64) -> u64 {
    let micros = (secs * 1_000_000.0).round();
    if micros.is_nan() || micros <= 0.0 {
        return 0;
    }
    // `as` saturates for floats above u64::MAX
    micros as u64
}

/// Ratio of two microsecond spans as an `f64`.
///
/// Precision loss only starts past 2^53 microseconds (~285 years).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn micros_ratio(numerator: u64, denominator: u64) -> f64 {
    numerator as f64 / denominator as f64
}

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}
