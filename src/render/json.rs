//! Structure dump: the classified document as JSON, for tuning thresholds.

use std::io::Write;

use crate::error::{Error, Result};
use crate::model::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    #[default]
    Pretty,
    Compact,
}

/// Serialize `doc` into a string.
pub fn to_json(doc: &Document, format: JsonFormat) -> Result<String> {
    let mut buf = Vec::new();
    write_json(doc, format, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::Render(e.to_string()))
}

/// Serialize `doc` straight into `writer`.
pub fn write_json<W: Write>(doc: &Document, format: JsonFormat, writer: W) -> Result<()> {
    let written = match format {
        JsonFormat::Pretty => serde_json::to_writer_pretty(writer, doc),
        JsonFormat::Compact => serde_json::to_writer(writer, doc),
    };
    written.map_err(|e| Error::Render(format!("cannot serialize structure: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, ListMarker, Page};

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.metadata.title = Some("Scan results".to_string());
        doc.body_font_size = 11.0;
        let mut page = Page::letter(1);
        page.add_block(Block::heading(1, "Hosts", 700.0));
        page.add_block(Block::list_item(1, ListMarker::Numbered(3), "third", 500.0));
        doc.add_page(page);
        doc
    }

    #[test]
    fn test_pretty_dump() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\": \"Scan results\""));
        assert!(json.contains("\"type\": \"heading\""));
        assert!(json.contains("\"body_font_size\": 11.0"));
    }

    #[test]
    fn test_compact_dump() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"type\":\"list_item\""));
        assert!(json.contains("\"depth\":1"));
    }

    #[test]
    fn test_write_json_matches_string() {
        let mut out = Vec::new();
        write_json(&sample(), JsonFormat::Compact, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            to_json(&sample(), JsonFormat::Compact).unwrap()
        );
    }
}
