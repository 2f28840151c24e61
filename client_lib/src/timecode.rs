//! `HH:MM:SS` / `MM:SS` time codes used by the analysis payloads.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

/// Converts a time code to whole seconds.
/// Returns `None` for empty input, a wrong number of fields, non-numeric fields,
/// or a total that does not fit in `u32`.
pub fn parse_timecode(code: &str) -> Option<u32> {
    let parts: Vec<&str> = code.trim().split(':').collect();
    let field = |s: &str| s.trim().parse::<u64>().ok();

    let total = match parts.as_slice() {
        [h, m, s] => field(h)?
            .checked_mul(3600)?
            .checked_add(field(m)?.checked_mul(60)?)?
            .checked_add(field(s)?)?,
        [m, s] => field(m)?.checked_mul(60)?.checked_add(field(s)?)?,
        _ => return None,
    };
    u32::try_from(total).ok()
}

/// Same as [`parse_timecode`] for an optional field.
pub fn parse_opt(code: Option<&str>) -> Option<u32> {
    code.and_then(parse_timecode)
}

/// Renders a media duration as `H:MM:SS` or `M:SS`. Zero or negative renders empty.
pub fn format_duration(seconds: f64) -> String {
    if !(seconds > 0.0) {
        return String::new();
    }
    let total = seconds.floor() as u64;
    let hrs = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hrs > 0 {
        format!("{}:{:02}:{:02}", hrs, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_layouts() {
        assert_eq!(parse_timecode("00:00:04"), Some(4));
        assert_eq!(parse_timecode("01:02:03"), Some(3723));
        assert_eq!(parse_timecode("02:30"), Some(150));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert_eq!(parse_timecode(""), None);
        assert_eq!(parse_timecode("45"), None);
        assert_eq!(parse_timecode("1:2:3:4"), None);
        assert_eq!(parse_timecode("aa:10"), None);
        assert_eq!(parse_opt(None), None);
    }

    #[test]
    fn oversized_codes_have_no_time() {
        assert_eq!(parse_timecode("1200000:00:00"), None);
        assert_eq!(parse_timecode("99999999999999999999:00"), None);
        assert_eq!(parse_timecode("1193046:28:15"), Some(u32::MAX));
        assert_eq!(parse_timecode("1193046:28:16"), None);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(0.0), "");
        assert_eq!(format_duration(45.9), "0:45");
        assert_eq!(format_duration(125.0), "2:05");
        assert_eq!(format_duration(3725.0), "1:02:05");
    }
}
