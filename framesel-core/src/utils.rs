//! Utility functions for formatting and parsing.
//!
//! Timecodes are rendered from integer frame indices so that persisted
//! values never carry floating-point drift from repeated conversions.

/// Formats a frame index as `HH:MM:SS.mmm` at the given frame rate.
///
/// Returns `None` for a non-finite or non-positive frame rate.
#[must_use]
pub fn format_timecode(frame_index: u64, frame_rate: f64) -> Option<String> {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return None;
    }
    let total_millis = ((frame_index as f64) * 1000.0 / frame_rate).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    Some(format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}"))
}

/// Parses an ffprobe rational frame rate such as `24000/1001` or `25`.
///
/// Returns `None` for `0/0`, zero or malformed values.
#[must_use]
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0, 24.0).as_deref(), Some("00:00:00.000"));
        assert_eq!(format_timecode(24, 24.0).as_deref(), Some("00:00:01.000"));
        assert_eq!(format_timecode(14972, 24.0).as_deref(), Some("00:10:23.833"));
        assert_eq!(format_timecode(86_400, 24.0).as_deref(), Some("01:00:00.000"));
        assert_eq!(format_timecode(1001, 24000.0 / 1001.0).as_deref(), Some("00:00:41.750"));
        assert_eq!(format_timecode(10, 0.0), None);
        assert_eq!(format_timecode(10, f64::NAN), None);
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("30000/1000"), Some(30.0));
        let ntsc = parse_frame_rate("24000/1001").unwrap();
        assert!((ntsc - 23.976).abs() < 0.001);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }
}
