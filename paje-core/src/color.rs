//! Normalized RGBA colors for type and value declarations
//!
//! Trace events declare colors as comma and/or space separated floating point
//! tokens. Three tokens form an opaque RGB color, four tokens carry an
//! explicit alpha channel. Any other token count, and any token that does
//! not parse as a float, is rejected.

use std::fmt;

/// A color as declared by a trace, normalized to `[0.0, 1.0]` channels
///
/// # Examples
///
/// ```rust
/// use paje_core::color::Color;
///
/// let gray = Color::parse("0.5 0.5 0.5").unwrap();
/// assert_eq!(gray, Color::opaque(0.5, 0.5, 0.5));
///
/// let translucent = Color::parse("0.5, 0.5, 0.5, 0.25").unwrap();
/// assert_eq!(translucent.a, 0.25);
///
/// assert!(Color::parse("red").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl Color {
    /// Creates a color from explicit channel values
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a fully opaque color from RGB channels
    pub fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parses a color from its textual trace form
    ///
    /// Tokens are separated by commas and/or spaces. Three tokens yield an
    /// opaque color, four tokens a translucent one.
    ///
    /// # Arguments
    ///
    /// * `input` - The raw color field of a trace event, must be non-empty
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let mut channels = Vec::new();
        for token in input.split([',', ' ']).filter(|t| !t.is_empty()) {
            let channel: f32 = token
                .parse()
                .map_err(|_| ColorParseError::new(input))?;
            channels.push(channel);
        }
        match channels[..] {
            [r, g, b] => Ok(Self::opaque(r, g, b)),
            [r, g, b, a] => Ok(Self::new(r, g, b, a)),
            _ => Err(ColorParseError::new(input)),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}, {}", self.r, self.g, self.b, self.a)
    }
}

/// Error returned when a color field cannot be understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError {
    /// The raw input that failed to parse
    pub input: String,
}

impl ColorParseError {
    /// Creates a new parse error recording the offending input
    pub fn new<I: Into<String>>(input: I) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not understand color parameter '{}'", self.input)
    }
}

impl std::error::Error for ColorParseError {}
