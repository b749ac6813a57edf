//! Styled text fragments extracted from a page.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fraction of the font size that sits below the baseline.
const DESCENT_RATIO: f32 = 0.2;
/// Fraction of the font size that sits above the baseline.
const ASCENT_RATIO: f32 = 0.8;
/// Average glyph advance, as a fraction of the font size, used when the
/// font carries no width table.
pub(crate) const AVG_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Axis-aligned rectangle in PDF user space (origin bottom-left, Y up).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Create a box from two corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// An sRGB fill colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Build from PDF colour components in `0.0..=1.0`.
    pub fn from_components(r: f32, g: f32, b: f32) -> Self {
        Rgb(to_byte(r), to_byte(g), to_byte(b))
    }

    pub fn from_gray(g: f32) -> Self {
        Self::from_components(g, g, g)
    }

    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::from_components(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }
}

fn to_byte(component: f32) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid colour '{}': expected #RRGGBB", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("invalid colour '{}'", s))
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// A run of text drawn with a single font, size and colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,
    /// Effective font size in points
    pub font_size: f32,
    /// Base font name with any subset prefix removed (e.g. "Helvetica-Bold")
    pub font_name: String,
    /// Fill colour
    pub color: Rgb,
    /// Whether the font appears to be bold
    pub bold: bool,
    /// Position on the page
    pub bbox: BoundingBox,
    /// Page number (1-indexed)
    pub page: u32,
}

impl TextRun {
    /// Create a run starting at `(x, baseline)`.
    ///
    /// The width is estimated from the character count until the parser
    /// supplies a measured width through [`TextRun::with_width`].
    pub fn new(
        text: impl Into<String>,
        x: f32,
        baseline: f32,
        font_size: f32,
        font_name: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let font_name = strip_subset_prefix(&font_name.into()).to_string();
        let bold = is_bold_font(&font_name);
        let width = text.chars().count() as f32 * font_size * AVG_CHAR_WIDTH_RATIO;

        Self {
            bbox: BoundingBox {
                x0: x,
                y0: baseline - font_size * DESCENT_RATIO,
                x1: x + width,
                y1: baseline + font_size * ASCENT_RATIO,
            },
            text,
            font_size,
            font_name,
            color: Rgb::BLACK,
            bold,
            page: 1,
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.bbox.x1 = self.bbox.x0 + width.max(0.0);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn x(&self) -> f32 {
        self.bbox.x0
    }

    pub fn right(&self) -> f32 {
        self.bbox.x1
    }

    pub fn top(&self) -> f32 {
        self.bbox.y1
    }

    pub fn baseline(&self) -> f32 {
        self.bbox.y0 + self.font_size * DESCENT_RATIO
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Remove the six-letter subset tag embedded fonts carry ("ABCDEF+Times").
fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

fn is_bold_font(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("bold") || lower.contains("black") || lower.contains("heavy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_run_geometry() {
        let run = TextRun::new("Hello", 72.0, 700.0, 10.0, "Helvetica");
        assert_eq!(run.x(), 72.0);
        assert!((run.baseline() - 700.0).abs() < 0.001);
        assert!((run.top() - 708.0).abs() < 0.001);
        assert!((run.right() - 97.0).abs() < 0.001);

        let run = run.with_width(40.0);
        assert!((run.right() - 112.0).abs() < 0.001);
    }

    #[test]
    fn test_bold_detection_and_subset_prefix() {
        let run = TextRun::new("x", 0.0, 0.0, 12.0, "ABCDEF+Helvetica-Bold");
        assert_eq!(run.font_name, "Helvetica-Bold");
        assert!(run.bold);

        let run = TextRun::new("x", 0.0, 0.0, 12.0, "Times+Roman");
        assert_eq!(run.font_name, "Times+Roman");
        assert!(!run.bold);
    }

    #[test]
    fn test_rgb_parsing() {
        assert_eq!("#FF8000".parse::<Rgb>().unwrap(), Rgb(255, 128, 0));
        assert_eq!("00ff00".parse::<Rgb>().unwrap(), Rgb(0, 255, 0));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
        assert_eq!(Rgb(1, 2, 255).to_string(), "#0102FF");
    }

    #[test]
    fn test_rgb_from_pdf_components() {
        assert_eq!(Rgb::from_gray(0.0), Rgb::BLACK);
        assert_eq!(Rgb::from_components(1.0, 0.0, 0.0), Rgb(255, 0, 0));
        assert_eq!(Rgb::from_cmyk(0.0, 0.0, 0.0, 1.0), Rgb::BLACK);
        assert_eq!(Rgb::from_cmyk(0.0, 1.0, 1.0, 0.0), Rgb(255, 0, 0));
    }

    #[test]
    fn test_rgb_serde_as_hex_string() {
        let json = serde_json::to_string(&Rgb(0, 0, 255)).unwrap();
        assert_eq!(json, "\"#0000FF\"");
        let back: Rgb = serde_json::from_str("\"#0000ff\"").unwrap();
        assert_eq!(back, Rgb(0, 0, 255));
    }
}
