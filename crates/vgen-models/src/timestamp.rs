//! SRT timestamp formatting.

/// Format a non-negative offset in seconds as an SRT timestamp `HH:MM:SS,mmm`.
///
/// Milliseconds are truncated, not rounded. The value is converted to whole
/// milliseconds once (with a tiny epsilon so `3723.005` does not become
/// `3723.00499..`) and every field is derived from that integer.
/// Negative and non-finite inputs format as zero. Hours are not capped,
/// so offsets past 99 hours widen the hour field.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0 + 1e-6).floor() as u64
    } else {
        0
    };

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
