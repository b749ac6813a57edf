//! Extracted image assets.

use super::BoundingBox;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An image saved from the PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Page number (1-indexed)
    pub page: u32,
    /// Sequence number on the page (1-indexed)
    pub index: u32,
    /// Placement on the page
    pub bbox: BoundingBox,
    /// Where the file was written, `None` if saving failed
    pub path: Option<PathBuf>,
    /// Link used in Markdown, relative to the output note
    pub link: String,
    /// OCR text, present only when OCR produced something
    pub caption: Option<String>,
}

impl ImageAsset {
    pub fn is_saved(&self) -> bool {
        self.path.is_some()
    }

    pub fn has_caption(&self) -> bool {
        self.caption.as_deref().is_some_and(|c| !c.is_empty())
    }
}
