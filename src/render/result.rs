//! Conversion statistics.

use serde::{Deserialize, Serialize};

use crate::model::{BlockKind, Document};

/// Counts collected while converting a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Number of pages converted
    pub page_count: u32,

    /// Number of headings
    pub heading_count: u32,

    /// Number of paragraphs
    pub paragraph_count: u32,

    /// Number of list items
    pub list_item_count: u32,

    /// Number of tables (not rows)
    pub table_count: u32,

    /// Number of code blocks
    pub code_block_count: u32,

    /// Number of images found
    pub image_count: u32,

    /// Number of images that were written to disk
    pub images_saved: u32,

    /// Number of images with an OCR caption
    pub ocr_caption_count: u32,

    /// Number of pages that failed and were replaced by a comment
    pub skipped_pages: u32,

    /// Number of key terms wrapped as wikilinks
    pub linked_terms: u32,

    /// Number of tags appended
    pub tag_count: u32,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the blocks and images of a finished document.
    pub fn from_document(doc: &Document) -> Self {
        let mut report = Self::new();
        for page in &doc.pages {
            report.add_page();
            let mut last_table = None;
            for block in &page.blocks {
                match &block.kind {
                    BlockKind::Heading { .. } => report.heading_count += 1,
                    BlockKind::Paragraph => report.paragraph_count += 1,
                    BlockKind::ListItem { .. } => report.list_item_count += 1,
                    BlockKind::TableRow { table, .. } => {
                        if last_table != Some(*table) {
                            report.table_count += 1;
                        }
                    }
                    BlockKind::Code => report.code_block_count += 1,
                    BlockKind::Image { .. } => {}
                    BlockKind::Comment => report.skipped_pages += 1,
                }
                last_table = block.table_id();
            }
        }
        for asset in &doc.images {
            report.add_image(asset.is_saved(), asset.has_caption());
        }
        report
    }

    pub fn add_page(&mut self) {
        self.page_count += 1;
    }

    pub fn add_image(&mut self, saved: bool, captioned: bool) {
        self.image_count += 1;
        if saved {
            self.images_saved += 1;
        }
        if captioned {
            self.ocr_caption_count += 1;
        }
    }

    pub fn add_links(&mut self, linked: usize, tags: usize) {
        self.linked_terms += linked as u32;
        self.tag_count += tags as u32;
    }

    /// Total number of structural blocks (excluding images).
    pub fn block_count(&self) -> u32 {
        self.heading_count
            + self.paragraph_count
            + self.list_item_count
            + self.table_count
            + self.code_block_count
    }
}
