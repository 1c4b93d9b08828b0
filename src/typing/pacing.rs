//! Inter-character pacing and time-remaining estimates.
//!
//! A "word" is counted as six characters (five letters plus a trailing
//! space), so a rate in words per second maps to `wps * 6` keystrokes per
//! second. Rates at or above [`UNTHROTTLED_WPS`] collapse to a one-nanosecond
//! delay, which keeps the sleep strictly positive.

use std::time::Duration;

/// Slowest accepted rate; lower requests are clamped up to this.
pub const MIN_WPS: f64 = 1.0;

/// Rate at which pacing is switched off.
pub const UNTHROTTLED_WPS: f64 = 500.0;

/// Characters per word used to convert WPS into keystrokes per second.
pub const CHARS_PER_WORD: f64 = 6.0;

/// Delay used once the rate reaches [`UNTHROTTLED_WPS`].
pub const UNTHROTTLED_DELAY: Duration = Duration::from_nanos(1);

/// Clamp a requested rate to the accepted range.
///
/// NaN is treated as the minimum rate.
pub fn effective_wps(requested: f64) -> f64 {
    requested.max(MIN_WPS)
}

/// Delay slept after each emitted character for the requested rate.
pub fn char_delay(requested_wps: f64) -> Duration {
    let wps = effective_wps(requested_wps);
    if wps >= UNTHROTTLED_WPS {
        return UNTHROTTLED_DELAY;
    }
    Duration::from_secs_f64(1.0 / (wps * CHARS_PER_WORD))
}

/// Time left to type `remaining` characters at `delay` each.
pub fn estimate_remaining(remaining: usize, delay: Duration) -> Duration {
    delay.saturating_mul(u32::try_from(remaining).unwrap_or(u32::MAX))
}

/// Format a duration as `MMmSSs`, e.g. `02m05s`.
pub fn format_eta(remaining: Duration) -> String {
    let total = remaining.as_secs();
    format!("{:02}m{:02}s", total / 60, total % 60)
}

/// Placeholder shown when no run is active.
pub const IDLE_ETA: &str = "--m--s";
