//! Duration string parsing
//!
//! Window sizes in pipeline specifications are written as duration strings: a
//! possibly signed sequence of decimal numbers, each with optional fraction and
//! a unit suffix, such as `"300ms"`, `"-1.5h"` or `"2h45m"`. Valid units are
//! `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.

use crate::error::DurationParseError;
use chrono::Duration;

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MINUTE;

// Fractions beyond this many digits are below nanosecond resolution.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration string
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let fail = |reason: &str| DurationParseError {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut rest = input;
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(fail("empty duration"));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let int_digits = &rest[..int_end];
        rest = &rest[int_end..];

        let mut frac_digits = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_end = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_digits = &after_dot[..frac_end];
            rest = &after_dot[frac_end..];
        }

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(fail("expected a number"));
        }

        let unit_end = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => NANOS_PER_MINUTE,
            "h" => NANOS_PER_HOUR,
            "" => return Err(fail("missing unit")),
            _ => return Err(fail(&format!("unknown unit \"{}\"", unit))),
        };

        if !int_digits.is_empty() {
            let whole: i128 = int_digits.parse().map_err(|_| fail("overflow"))?;
            total = whole
                .checked_mul(scale)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(|| fail("overflow"))?;
        }

        if !frac_digits.is_empty() {
            let digits = &frac_digits[..frac_digits.len().min(MAX_FRACTION_DIGITS)];
            let numerator: i128 = digits.parse().map_err(|_| fail("overflow"))?;
            let denominator = 10_i128.pow(digits.len() as u32);
            total += numerator * scale / denominator;
        }

        if total > i64::MAX as i128 {
            return Err(fail("overflow"));
        }
    }

    let nanos = if negative { -total } else { total };
    Ok(Duration::nanoseconds(nanos as i64))
}

/// Format a duration in the same notation [`parse_duration`] accepts
pub fn format_duration(duration: Duration) -> String {
    let Some(mut nanos) = duration.num_nanoseconds() else {
        return format!("{}s", duration.num_seconds());
    };
    if nanos == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
        nanos = -nanos;
    }
    let nanos = nanos as i128;

    if nanos < NANOS_PER_SECOND {
        if nanos % NANOS_PER_MILLI == 0 {
            out.push_str(&format!("{}ms", nanos / NANOS_PER_MILLI));
        } else if nanos % NANOS_PER_MICRO == 0 {
            out.push_str(&format!("{}us", nanos / NANOS_PER_MICRO));
        } else {
            out.push_str(&format!("{}ns", nanos));
        }
        return out;
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
    let sub_minute = nanos % NANOS_PER_MINUTE;
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    let seconds = sub_minute / NANOS_PER_SECOND;
    let fraction = sub_minute % NANOS_PER_SECOND;
    if fraction == 0 {
        out.push_str(&format!("{}s", seconds));
    } else {
        let frac = format!("{:09}", fraction);
        out.push_str(&format!("{}.{}s", seconds, frac.trim_end_matches('0')));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::seconds(10));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::milliseconds(300));
        assert_eq!(parse_duration("5m").unwrap(), Duration::minutes(5));
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("15us").unwrap(), Duration::microseconds(15));
        assert_eq!(parse_duration("15µs").unwrap(), Duration::microseconds(15));
        assert_eq!(parse_duration("42ns").unwrap(), Duration::nanoseconds(42));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::minutes(90)
        );
        assert_eq!(
            parse_duration("2h45m10s").unwrap(),
            Duration::seconds(2 * 3600 + 45 * 60 + 10)
        );
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::milliseconds(500));
        assert_eq!(parse_duration("1.s").unwrap(), Duration::seconds(1));
    }

    #[test]
    fn test_parse_sign_and_zero() {
        assert_eq!(parse_duration("0").unwrap(), Duration::zero());
        assert_eq!(parse_duration("-1.5h").unwrap(), Duration::minutes(-90));
        assert_eq!(parse_duration("+3s").unwrap(), Duration::seconds(3));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["not-a-duration", "", "10", "s", "5x", "-", "1..5s", "3 s"] {
            let err = parse_duration(bad).unwrap_err();
            assert_eq!(err.input, bad);
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_duration("9999999999999999999999h").is_err());
        assert!(parse_duration("3000000h").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(10)), "10s");
        assert_eq!(format_duration(Duration::minutes(90)), "1h30m0s");
        assert_eq!(format_duration(Duration::milliseconds(250)), "250ms");
        assert_eq!(format_duration(Duration::milliseconds(1500)), "1.5s");
        assert_eq!(format_duration(Duration::zero()), "0s");
        assert_eq!(
            parse_duration(&format_duration(Duration::seconds(3725))).unwrap(),
            Duration::seconds(3725)
        );
    }
}
