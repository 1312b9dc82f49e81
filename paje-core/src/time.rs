//! Trace time scalars
//!
//! Trace events carry times and variable values as decimal text. Parsing goes
//! through Rust's `f64` parser, which always uses `.` as the decimal point
//! regardless of the process locale.

use std::fmt;

/// A point in trace time, in the trace's own unit (usually seconds)
pub type Timestamp = f64;

/// Parses a numeric trace field
///
/// # Arguments
///
/// * `raw` - The textual field as received from the trace
///
/// # Examples
///
/// ```rust
/// use paje_core::time::parse_number;
///
/// assert_eq!(parse_number("1.5").unwrap(), 1.5);
/// assert!(parse_number("later").is_err());
/// ```
pub fn parse_number(raw: &str) -> Result<f64, NumberParseError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| NumberParseError::new(raw))
}

/// Error returned when a numeric trace field cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberParseError {
    /// The raw input that failed to parse
    pub input: String,
}

impl NumberParseError {
    /// Creates a new parse error recording the offending input
    pub fn new<I: Into<String>>(input: I) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl fmt::Display for NumberParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not parse number '{}'", self.input)
    }
}

impl std::error::Error for NumberParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0").unwrap(), 0.0);
        assert_eq!(parse_number("2.25").unwrap(), 2.25);
        assert_eq!(parse_number(" 10 ").unwrap(), 10.0);
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert!(parse_number("").is_err());
        assert!(parse_number("1,5").is_err());
        assert!(parse_number("soon").is_err());
    }
}
