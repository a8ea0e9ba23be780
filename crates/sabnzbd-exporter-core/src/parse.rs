//! Parsers for the human-formatted values SABnzbd puts in its JSON responses.
//!
//! SABnzbd reports most numbers as strings: sizes as `"1005.0 G"`, durations as
//! `"103:23:59:03"`, rates as `"1234.56"`. These are pure functions that turn
//! them into canonical byte counts and [`Duration`]s.

use std::time::Duration;

pub(crate) const KB: f64 = 1024.0;
pub(crate) const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;
const PB: f64 = TB * 1024.0;

/// Error type for value parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub input: String,
    pub message: String,
}

impl ParseError {
    pub fn new(input: &str, message: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse '{}': {}", self.input, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse a plain float string. Empty input is `0.0`.
pub fn parse_float(input: &str) -> Result<f64, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .map_err(|e| ParseError::new(input, format!("invalid number: {}", e)))
}

/// Parse a size string such as `"123.45 KB"`, `"10 G"` or `"512"` into bytes.
///
/// Suffixes are case-sensitive and use binary multipliers:
///
/// | Suffix | Multiplier |
/// |--------|------------|
/// | (none), `B` | 1 |
/// | `KB`, `K` | 1024 |
/// | `MB`, `M` | 1024² |
/// | `GB`, `G` | 1024³ |
/// | `TB`, `T` | 1024⁴ |
/// | `PB`, `P` | 1024⁵ |
///
/// Empty input is `0.0`.
pub fn parse_size(input: &str) -> Result<f64, ParseError> {
    let fields: Vec<&str> = input.split_whitespace().collect();

    let (magnitude, suffix) = match fields.as_slice() {
        [] => return Ok(0.0),
        [magnitude] => (*magnitude, None),
        [magnitude, suffix] => (*magnitude, Some(*suffix)),
        _ => return Err(ParseError::new(input, "invalid size")),
    };

    let value = magnitude
        .parse::<f64>()
        .map_err(|e| ParseError::new(input, format!("invalid size magnitude: {}", e)))?;

    let multiplier = match suffix {
        None | Some("B") => 1.0,
        Some("KB" | "K") => KB,
        Some("MB" | "M") => MB,
        Some("GB" | "G") => GB,
        Some("TB" | "T") => TB,
        Some("PB" | "P") => PB,
        Some(_) => return Err(ParseError::new(input, "invalid size suffix")),
    };

    Ok(value * multiplier)
}

/// Parse a colon-separated duration into a [`Duration`].
///
/// Fields are read right-to-left as seconds, minutes, hours and days, so
/// `"10"`, `"10:01"`, `"13:12:11"` and `"103:23:59:03"` are all accepted. Each
/// field is a plain integer with no upper bound: `"90:00"` is 90 minutes.
///
/// Empty input is a zero duration.
pub fn parse_duration(input: &str) -> Result<Duration, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Duration::ZERO);
    }

    let fields: Vec<&str> = trimmed.split(':').collect();
    if fields.len() > 4 {
        return Err(ParseError::new(input, "invalid duration"));
    }

    // seconds, minutes, hours, days
    const WEIGHTS: [i64; 4] = [1, 60, 60 * 60, 24 * 60 * 60];

    let mut secs: i64 = 0;
    for (field, weight) in fields.iter().rev().zip(WEIGHTS) {
        let value = field.parse::<i64>().map_err(|e| {
            ParseError::new(input, format!("invalid integer '{}' in duration: {}", field, e))
        })?;
        secs = value
            .checked_mul(weight)
            .and_then(|v| secs.checked_add(v))
            .ok_or_else(|| ParseError::new(input, "duration overflow"))?;
    }

    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| ParseError::new(input, "negative duration"))
}
