//! Time-remaining extrapolation and rendering.

/// Rendered when the ETA cannot be computed.
pub const UNKNOWN_ETA: &str = "unknown";

/// Extrapolate the remaining time in seconds.
///
/// The total run time is extrapolated as `elapsed / fraction`; the remainder
/// is that total minus `elapsed`, clamped at zero once the estimate has been
/// exceeded. Returns `None` for negative, infinite or NaN inputs and for a
/// fraction that is not strictly positive.
pub fn remaining_secs(elapsed_secs: f64, fraction: f64) -> Option<f64> {
    if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
        return None;
    }
    if !fraction.is_finite() || fraction <= 0.0 {
        return None;
    }
    let total = elapsed_secs / fraction;
    if !total.is_finite() {
        return None;
    }
    Some((total - elapsed_secs).max(0.0))
}

/// Render the ETA for a run that is `fraction` complete after `elapsed_secs`.
///
/// ```
/// use framestream::progress::format_eta;
///
/// assert_eq!(format_eta(30.0, 0.5), "30 seconds");
/// assert_eq!(format_eta(3660.0, 0.5), "1 hour and 1 minute");
/// assert_eq!(format_eta(30.0, 0.0), "unknown");
/// ```
pub fn format_eta(elapsed_secs: f64, fraction: f64) -> String {
    match remaining_secs(elapsed_secs, fraction) {
        Some(secs) => format_seconds(secs),
        None => UNKNOWN_ETA.to_string(),
    }
}

/// Render a number of seconds as `"1 hour, 2 minutes and 3 seconds"`.
///
/// Zero hours and minutes are omitted. Seconds are omitted only when zero
/// and another component is present.
pub fn format_seconds(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return UNKNOWN_ETA.to_string();
    }

    let total = secs.round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(unit(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(unit(minutes, "minute"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(unit(seconds, "second"));
    }

    match parts.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
        None => UNKNOWN_ETA.to_string(),
    }
}

fn unit(count: u64, name: &str) -> String {
    if count == 1 {
        format!("1 {}", name)
    } else {
        format!("{} {}s", count, name)
    }
}
