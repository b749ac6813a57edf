//! Rendering options and configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options for rendering a document to Markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Markdown level used for heading-1 runs; heading-2 is one deeper
    pub heading_base_level: u8,

    /// Spaces per list nesting level
    pub list_indent_width: usize,

    /// Include YAML frontmatter with metadata
    pub include_frontmatter: bool,

    /// Escape special Markdown characters in text
    pub escape_special_chars: bool,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Markdown level of top-level headings (1-5).
    pub fn with_heading_base_level(mut self, level: u8) -> Self {
        self.heading_base_level = level.clamp(1, 5);
        self
    }

    /// Set the number of spaces per list level.
    pub fn with_list_indent(mut self, width: usize) -> Self {
        self.list_indent_width = width;
        self
    }

    /// Enable or disable frontmatter.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Enable or disable escaping.
    pub fn with_escaping(mut self, escape: bool) -> Self {
        self.escape_special_chars = escape;
        self
    }

    /// Markdown heading level for an analyzer heading level (1 or 2).
    pub fn markdown_level(&self, level: u8) -> u8 {
        (self.heading_base_level + level.saturating_sub(1)).min(6)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.heading_base_level) {
            return Err(Error::Config(format!(
                "render.heading_base_level must be between 1 and 5, got {}",
                self.heading_base_level
            )));
        }
        if self.list_indent_width == 0 {
            return Err(Error::Config(
                "render.list_indent_width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            heading_base_level: 3,
            list_indent_width: 4,
            include_frontmatter: false,
            escape_special_chars: true,
        }
    }
}
