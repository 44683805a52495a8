//! Human-readable durations for entry titles and promise rows

/// Format a millisecond duration, switching units as it grows.
///
/// `high_resolution` keeps three decimals for sub-second values.
pub fn millis_to_string(ms: f64, high_resolution: bool) -> String {
    if !ms.is_finite() {
        return "-".to_string();
    }
    if ms == 0.0 {
        return "0".to_string();
    }
    if high_resolution && ms < 1000.0 {
        return format!("{:.3}\u{2009}ms", ms);
    }
    if ms < 1000.0 {
        return format!("{:.0}\u{2009}ms", ms);
    }

    let seconds = ms / 1000.0;
    if seconds < 60.0 {
        return format!("{:.2}\u{2009}s", seconds);
    }

    let minutes = seconds / 60.0;
    if minutes < 60.0 {
        return format!("{:.1}\u{2009}min", minutes);
    }

    let hours = minutes / 60.0;
    if hours < 24.0 {
        return format!("{:.1}\u{2009}hrs", hours);
    }

    format!("{:.1}\u{2009}days", hours / 24.0)
}

/// Format milliseconds with a fixed number of decimals
pub fn precise_millis_to_string(ms: f64, precision: usize) -> String {
    format!("{:.*}\u{2009}ms", precision, ms)
}
