//! Document-level types.

use super::{ImageAsset, Page};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A converted PDF document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Pages in conversion order
    pub pages: Vec<Page>,

    /// Images referenced by image blocks
    pub images: Vec<ImageAsset>,

    /// Dominant body font size used for classification
    pub body_font_size: f32,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == page_num)
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Register an image and return the index image blocks refer to.
    pub fn add_image(&mut self, asset: ImageAsset) -> usize {
        self.images.push(asset);
        self.images.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Plain text of the entire document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Document metadata from the PDF Info dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages in the file
    pub page_count: u32,

    /// Whether the file was encrypted
    pub encrypted: bool,
}

impl Metadata {
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }

    /// YAML frontmatter block for the note, ending with a blank line.
    pub fn to_yaml_frontmatter(&self) -> String {
        let mut lines = vec!["---".to_string()];

        let fields = [
            ("title", &self.title),
            ("author", &self.author),
            ("subject", &self.subject),
            ("keywords", &self.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                lines.push(format!("{}: \"{}\"", key, escape_yaml(value)));
            }
        }
        if let Some(ref created) = self.created {
            lines.push(format!("created: {}", created.to_rfc3339()));
        }
        lines.push(format!("pages: {}", self.page_count));

        lines.push("---".to_string());
        lines.push(String::new());
        lines.push(String::new());

        lines.join("\n")
    }
}

fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, Block};

    #[test]
    fn test_document_new() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn test_add_image_returns_index() {
        let mut doc = Document::new();
        let asset = ImageAsset {
            page: 1,
            index: 1,
            bbox: BoundingBox::default(),
            path: None,
            link: "img/a.png".into(),
            caption: None,
        };
        assert_eq!(doc.add_image(asset.clone()), 0);
        assert_eq!(doc.add_image(asset), 1);
    }

    #[test]
    fn test_get_page_by_number() {
        let mut doc = Document::new();
        let mut page = Page::letter(3);
        page.add_block(Block::paragraph("three", 700.0));
        doc.add_page(page);
        assert!(doc.get_page(1).is_none());
        assert_eq!(doc.get_page(3).unwrap().plain_text(), "three");
    }

    #[test]
    fn test_metadata_frontmatter() {
        let mut metadata = Metadata::with_version("1.7");
        metadata.title = Some("Pentest \"Report\"".to_string());
        metadata.author = Some("Jane Roe".to_string());
        metadata.subject = Some("   ".to_string());
        metadata.page_count = 10;

        let yaml = metadata.to_yaml_frontmatter();
        assert!(yaml.starts_with("---\n"));
        assert!(yaml.contains("title: \"Pentest \\\"Report\\\"\""));
        assert!(yaml.contains("author: \"Jane Roe\""));
        assert!(!yaml.contains("subject"));
        assert!(yaml.contains("pages: 10"));
        assert!(yaml.ends_with("---\n\n"));
    }
}
