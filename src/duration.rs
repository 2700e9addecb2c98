//! Human-readable duration parsing.
//!
//! Window and refill-interval specifications are written as a decimal
//! magnitude followed by a unit token: `"10s"`, `"2 hrs"`, `"1d"`. Unit
//! spellings are case-insensitive and accept singular or plural forms.
//! Everything normalizes to integer milliseconds.

use crate::error::{RatelimitError, Result};

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Parse a duration expression into integer milliseconds.
///
/// The grammar is a signed decimal magnitude, optional whitespace, and a
/// unit token (`ms`, `s`/`sec`/`seconds`, `m`/`min`/`minutes`,
/// `h`/`hr`/`hours`, `d`/`days`). Pure: same input always yields the same
/// output.
///
/// # Errors
///
/// [`RatelimitError::InvalidDuration`] when the input is empty or does not
/// match the grammar; [`RatelimitError::UnrecognizedUnit`] when the
/// magnitude parses but the unit token is unknown.
///
/// # Example
///
/// ```
/// use kvlimit::duration::parse_duration;
///
/// assert_eq!(parse_duration("10s").unwrap(), 10_000);
/// assert_eq!(parse_duration("2 hrs").unwrap(), 7_200_000);
/// ```
pub fn parse_duration(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RatelimitError::InvalidDuration(input.to_string()));
    }

    // Magnitude is the longest prefix of sign/digit/dot characters.
    let split = trimmed
        .find(|c: char| !matches!(c, '0'..='9' | '+' | '-' | '.'))
        .unwrap_or(trimmed.len());
    let (magnitude_str, unit_str) = trimmed.split_at(split);
    let unit_str = unit_str.trim_start();

    if magnitude_str.is_empty() || unit_str.is_empty() {
        return Err(RatelimitError::InvalidDuration(input.to_string()));
    }

    let magnitude: f64 = magnitude_str
        .parse()
        .map_err(|_| RatelimitError::InvalidDuration(input.to_string()))?;

    let factor = unit_factor(unit_str)
        .ok_or_else(|| RatelimitError::UnrecognizedUnit(unit_str.to_string()))?;

    Ok((magnitude * factor).round() as i64)
}

/// Millisecond factor for a unit token, or `None` if unrecognized.
fn unit_factor(unit: &str) -> Option<f64> {
    let unit = unit.to_ascii_lowercase();
    match unit.as_str() {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Some(1.0),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(MS_PER_SECOND),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(MS_PER_MINUTE),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(MS_PER_HOUR),
        "d" | "day" | "days" => Some(MS_PER_DAY),
        _ => None,
    }
}
