//! Clock-style time formatting.

/// Placeholder shown for unknown or negative times.
pub const UNKNOWN_TIME: &str = "--:--";

/// Formats seconds as zero-padded `HH:MM:SS`, truncating fractions.
///
/// `None`, negative and non-finite values render as [`UNKNOWN_TIME`].
/// Hours are not wrapped, so a 25 hour value renders as `25:00:00`.
pub fn format_time(seconds: impl Into<Option<f64>>) -> String {
    let Some(secs) = seconds.into().filter(|s| s.is_finite() && *s >= 0.0) else {
        return UNKNOWN_TIME.to_string();
    };

    let total = secs.trunc() as u64;
    let (minutes, secs) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
