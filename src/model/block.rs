//! Structural blocks produced by segmentation.

use serde::{Deserialize, Serialize};

/// List item marker as it appeared in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMarker {
    /// `-`, `*`, `•`, `◦` or `▪`
    Bullet,
    /// `1.` or `1)`, number preserved
    Numbered(u32),
}

/// What a block is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// Heading; level 1 is the most prominent
    Heading { level: u8 },
    Paragraph,
    ListItem { depth: u8, marker: ListMarker },
    /// One row of a detected table
    TableRow {
        /// Table id, unique within the page
        table: u32,
        /// Left edge of each column band, shared by every row of the table
        columns: Vec<f32>,
        cells: Vec<String>,
    },
    /// Preformatted lines, joined with `\n` in [`Block::text`]
    Code,
    /// Placeholder for an extracted image
    Image {
        /// Index into [`Document::images`](super::Document::images)
        asset: usize,
    },
    /// Note for content that could not be converted (rendered as an HTML comment)
    Comment,
}

/// A classified unit of document structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub kind: BlockKind,
    /// Text carried by the block (the raw row text for table rows)
    pub text: String,
    /// Top edge on the page in PDF user space, used for reading order
    pub top: f32,
}

impl Block {
    pub fn new(kind: BlockKind, text: impl Into<String>, top: f32) -> Self {
        Self {
            kind,
            text: text.into(),
            top,
        }
    }

    pub fn heading(level: u8, text: impl Into<String>, top: f32) -> Self {
        Self::new(BlockKind::Heading { level }, text, top)
    }

    pub fn paragraph(text: impl Into<String>, top: f32) -> Self {
        Self::new(BlockKind::Paragraph, text, top)
    }

    pub fn list_item(depth: u8, marker: ListMarker, text: impl Into<String>, top: f32) -> Self {
        Self::new(BlockKind::ListItem { depth, marker }, text, top)
    }

    pub fn code(text: impl Into<String>, top: f32) -> Self {
        Self::new(BlockKind::Code, text, top)
    }

    pub fn image(asset: usize, top: f32) -> Self {
        Self::new(BlockKind::Image { asset }, String::new(), top)
    }

    pub fn comment(text: impl Into<String>, top: f32) -> Self {
        Self::new(BlockKind::Comment, text, top)
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, BlockKind::Heading { .. })
    }

    /// Table id when this block is a table row.
    pub fn table_id(&self) -> Option<u32> {
        match self.kind {
            BlockKind::TableRow { table, .. } => Some(table),
            _ => None,
        }
    }
}
