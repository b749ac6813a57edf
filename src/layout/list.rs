//! List marker recognition.

use regex::Regex;

use crate::error::Result;
use crate::model::ListMarker;

/// Bullets, dashes and glyph bullets, or a number followed by `.` or `)`.
/// A `number` capture makes the item numbered.
pub const DEFAULT_LIST_MARKER_PATTERN: &str =
    r"^\s*(?:[-*•◦▪–—·○▸►■●□◆➤]|(?P<number>\d{1,9})[.)])(?:\s+|$)";

/// Compiled list marker pattern.
#[derive(Debug, Clone)]
pub struct ListMarkers {
    pattern: Regex,
}

impl ListMarkers {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Split a line into its list marker and the item text.
    ///
    /// The marker must sit at the start of the line. With the default
    /// pattern it must also be followed by whitespace or end the line, so
    /// "-5" or "1.5 million" are not list items.
    pub fn parse<'t>(&self, text: &'t str) -> Option<(ListMarker, &'t str)> {
        let caps = self.pattern.captures(text)?;
        let whole = caps.get(0)?;
        if whole.start() != 0 || whole.as_str().trim().is_empty() {
            return None;
        }
        let marker = match caps.name("number") {
            Some(number) => ListMarker::Numbered(number.as_str().parse().ok()?),
            None => ListMarker::Bullet,
        };
        Some((marker, text[whole.end()..].trim_end()))
    }

    /// Whether `text` is nothing but a list marker, as when the PDF draws the
    /// bullet or number as its own run.
    pub fn is_marker_only(&self, text: &str) -> bool {
        matches!(self.parse(text.trim()), Some((_, rest)) if rest.is_empty())
    }
}
