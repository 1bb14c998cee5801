//! `PT#H#M#S` duration codes as returned in `contentDetails.duration`.

/// Parses a duration code into whole seconds.
///
/// Returns `None` when the code is empty or lacks the `PT` designator.
/// A unit marker with no digits in front of it counts as zero, and any
/// other marker just resets the digit buffer.
pub fn parse_duration(code: &str) -> Option<u64> {
    let rest = code.strip_prefix("PT")?;

    let (mut hours, mut minutes, mut seconds) = (0u64, 0u64, 0u64);
    let mut digits = String::new();

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let value = digits.parse::<u64>().unwrap_or(0);
        match ch {
            'H' => hours = value,
            'M' => minutes = value,
            'S' => seconds = value,
            _ => {}
        }
        digits.clear();
    }

    Some(
        hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60))
            .saturating_add(seconds),
    )
}

/// `mm:ss`, or `hh:mm:ss` once there is at least one full hour.
pub fn format_clock(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_missing_designator_is_unknown() {
        assert_eq!(parse_duration("2M3S"), None);
        assert_eq!(parse_duration("P1D"), None);
    }

    #[test]
    fn test_minutes_seconds() {
        assert_eq!(parse_duration("PT2M3S"), Some(123));
    }

    #[test]
    fn test_hours_minutes_seconds() {
        assert_eq!(parse_duration("PT2H3M4S"), Some(2 * 3600 + 3 * 60 + 4));
    }

    #[test]
    fn test_single_units() {
        assert_eq!(parse_duration("PT59S"), Some(59));
        assert_eq!(parse_duration("PT1M"), Some(60));
        assert_eq!(parse_duration("PT1H"), Some(3600));
        assert_eq!(parse_duration("PT"), Some(0));
    }

    #[test]
    fn test_unit_without_digits_is_zero() {
        assert_eq!(parse_duration("PTM30S"), Some(30));
        assert_eq!(parse_duration("PTHMS"), Some(0));
    }

    #[test]
    fn test_out_of_order_units_do_not_panic() {
        assert_eq!(parse_duration("PT5S2M"), Some(125));
        assert_eq!(parse_duration("PT1X5S"), Some(5));
    }

    #[test]
    fn test_trailing_digits_ignored() {
        assert_eq!(parse_duration("PT1M30"), Some(60));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(123), "02:03");
        assert_eq!(format_clock(3600 + 62), "01:01:02");
    }
}
