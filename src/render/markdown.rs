//! Markdown rendering for converted documents.

use crate::error::Result;
use crate::model::{Block, BlockKind, Document, ImageAsset, ListMarker, Page};

use super::RenderOptions;

/// Convert a document to Markdown.
pub fn to_markdown(doc: &Document, options: &RenderOptions) -> Result<String> {
    MarkdownRenderer::new(options.clone()).render(doc)
}

/// Markdown renderer.
///
/// Blocks are emitted in document order. Every block yields output, so
/// text that could not be structured still reaches the note.
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render a document to Markdown.
    pub fn render(&self, doc: &Document) -> Result<String> {
        let mut sections = Vec::new();
        for page in &doc.pages {
            self.render_page(&mut sections, page, doc);
        }

        let mut output = String::new();
        if self.options.include_frontmatter {
            output.push_str(&doc.metadata.to_yaml_frontmatter());
        }
        if !sections.is_empty() {
            output.push_str(&sections.join("\n\n"));
            output.push('\n');
        }
        Ok(output)
    }

    fn render_page(&self, sections: &mut Vec<String>, page: &Page, doc: &Document) {
        let blocks = &page.blocks;
        let mut i = 0;
        while i < blocks.len() {
            let block = &blocks[i];
            match &block.kind {
                BlockKind::TableRow { table, .. } => {
                    let end = blocks[i..]
                        .iter()
                        .position(|b| b.table_id() != Some(*table))
                        .map_or(blocks.len(), |n| i + n);
                    sections.push(self.render_table(&blocks[i..end]));
                    i = end;
                }
                BlockKind::ListItem { .. } => {
                    let end = blocks[i..]
                        .iter()
                        .position(|b| !matches!(b.kind, BlockKind::ListItem { .. }))
                        .map_or(blocks.len(), |n| i + n);
                    let items: Vec<String> = blocks[i..end]
                        .iter()
                        .map(|b| self.render_list_item(b))
                        .collect();
                    sections.push(items.join("\n"));
                    i = end;
                }
                _ => {
                    sections.push(self.render_block(block, doc));
                    i += 1;
                }
            }
        }
    }

    fn render_block(&self, block: &Block, doc: &Document) -> String {
        match &block.kind {
            BlockKind::Heading { level } => {
                let prefix = "#".repeat(self.options.markdown_level(*level) as usize);
                format!("{} {}", prefix, self.escape(&single_line(&block.text)))
            }
            BlockKind::Paragraph => escape_line_starts(&self.escape(&block.text)),
            BlockKind::Code => fenced(&block.text),
            BlockKind::Image { asset } => render_image(doc.images.get(*asset), *asset),
            BlockKind::Comment => comment(&block.text),
            BlockKind::ListItem { .. } => self.render_list_item(block),
            BlockKind::TableRow { .. } => self.render_table(std::slice::from_ref(block)),
        }
    }

    fn render_list_item(&self, block: &Block) -> String {
        let (depth, marker) = match block.kind {
            BlockKind::ListItem { depth, marker } => (depth, marker),
            _ => (0, ListMarker::Bullet),
        };
        let indent = " ".repeat(self.options.list_indent_width * depth as usize);
        let marker = match marker {
            ListMarker::Bullet => "-".to_string(),
            ListMarker::Numbered(n) => format!("{}.", n),
        };
        format!("{}{} {}", indent, marker, self.escape(&single_line(&block.text)))
    }

    /// Rows of one table; falls back to a code block when rows disagree on
    /// their column count.
    fn render_table(&self, rows: &[Block]) -> String {
        let cells: Vec<&[String]> = rows
            .iter()
            .filter_map(|b| match &b.kind {
                BlockKind::TableRow { cells, .. } => Some(cells.as_slice()),
                _ => None,
            })
            .collect();

        let columns = cells.first().map_or(0, |c| c.len());
        if columns == 0 || cells.iter().any(|c| c.len() != columns) {
            log::debug!("table with uneven rows rendered as code");
            let raw: Vec<&str> = rows.iter().map(|b| b.text.as_str()).collect();
            return fenced(&raw.join("\n"));
        }

        let mut lines = Vec::with_capacity(cells.len() + 1);
        for (i, row) in cells.iter().enumerate() {
            let rendered: Vec<String> = row
                .iter()
                .map(|cell| escape_table_cell(&self.escape(&single_line(cell))))
                .collect();
            lines.push(format!("| {} |", rendered.join(" | ")));
            if i == 0 {
                lines.push(format!("|{}", " --- |".repeat(columns)));
            }
        }
        lines.join("\n")
    }

    fn escape(&self, text: &str) -> String {
        if self.options.escape_special_chars {
            escape_markdown(text)
        } else {
            text.to_string()
        }
    }
}

fn render_image(asset: Option<&ImageAsset>, index: usize) -> String {
    let asset = match asset {
        Some(asset) if asset.is_saved() => asset,
        Some(asset) => {
            return comment(&format!(
                "image {} on page {} could not be extracted",
                asset.index, asset.page
            ))
        }
        None => return comment(&format!("missing image {}", index)),
    };

    let mut out = format!("![]({})", asset.link.replace(' ', "%20"));
    if let Some(caption) = asset.caption.as_deref().filter(|c| !c.trim().is_empty()) {
        for line in caption.lines() {
            out.push('\n');
            if line.trim().is_empty() {
                out.push('>');
            } else {
                out.push_str("> ");
                out.push_str(line.trim_end());
            }
        }
    }
    out
}

/// Fenced code block with a fence longer than any backtick run inside.
fn fenced(content: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    let fence = "`".repeat((longest + 1).max(3));
    format!("{}\n{}\n{}", fence, content.trim_end_matches('\n'), fence)
}

fn comment(text: &str) -> String {
    format!("<!-- {} -->", text.replace("--", "- -"))
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape special Markdown characters.
/// Only characters that could be misinterpreted as Markdown syntax inside a
/// line are escaped.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

/// Paragraph lines must not start a heading or a quote.
fn escape_line_starts(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.starts_with('#') || line.starts_with('>') {
                format!("\\{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoundingBox;
    use std::path::PathBuf;

    fn doc_with(blocks: Vec<Block>) -> Document {
        let mut doc = Document::new();
        let mut page = Page::letter(1);
        for block in blocks {
            page.add_block(block);
        }
        doc.add_page(page);
        doc
    }

    fn row(table: u32, cells: &[&str], top: f32) -> Block {
        Block::new(
            BlockKind::TableRow {
                table,
                columns: vec![72.0, 200.0, 320.0],
                cells: cells.iter().map(|c| c.to_string()).collect(),
            },
            cells.join("   "),
            top,
        )
    }

    fn asset(path: Option<&str>, caption: Option<&str>) -> ImageAsset {
        ImageAsset {
            page: 1,
            index: 1,
            bbox: BoundingBox::default(),
            path: path.map(PathBuf::from),
            link: path.unwrap_or_default().to_string(),
            caption: caption.map(String::from),
        }
    }

    fn render(doc: &Document) -> String {
        to_markdown(doc, &RenderOptions::default()).unwrap()
    }

    #[test]
    fn test_headings_use_base_level() {
        let doc = doc_with(vec![
            Block::heading(1, "Introduction", 700.0),
            Block::heading(2, "Scope", 650.0),
            Block::paragraph("Body text.", 600.0),
        ]);
        assert_eq!(
            render(&doc),
            "### Introduction\n\n#### Scope\n\nBody text.\n"
        );
    }

    #[test]
    fn test_list_items_indent_by_depth() {
        let doc = doc_with(vec![
            Block::list_item(0, ListMarker::Bullet, "first", 700.0),
            Block::list_item(1, ListMarker::Numbered(7), "nested", 680.0),
            Block::paragraph("After.", 600.0),
        ]);
        assert_eq!(render(&doc), "- first\n    7. nested\n\nAfter.\n");
    }

    #[test]
    fn test_table_rows_become_markdown_table() {
        let doc = doc_with(vec![
            row(1, &["Host", "Port", "State"], 700.0),
            row(1, &["web01", "443", "open"], 680.0),
        ]);
        assert_eq!(
            render(&doc),
            "| Host | Port | State |\n| --- | --- | --- |\n| web01 | 443 | open |\n"
        );
    }

    #[test]
    fn test_uneven_table_falls_back_to_code() {
        let doc = doc_with(vec![
            row(1, &["a", "b", "c"], 700.0),
            row(1, &["d", "e"], 680.0),
        ]);
        let md = render(&doc);
        assert!(md.starts_with("```\n"));
        assert!(md.contains("a   b   c\nd   e"));
    }

    #[test]
    fn test_separate_tables_stay_separate() {
        let doc = doc_with(vec![
            row(1, &["a", "b"], 700.0),
            row(1, &["c", "d"], 680.0),
            row(2, &["e", "f"], 600.0),
            row(2, &["g", "h"], 580.0),
        ]);
        assert_eq!(render(&doc).matches("| --- | --- |").count(), 2);
    }

    #[test]
    fn test_code_fence_longer_than_content_backticks() {
        let doc = doc_with(vec![Block::code("echo ```nested```", 700.0)]);
        let md = render(&doc);
        assert!(md.starts_with("````\n"));
        assert!(md.ends_with("\n````\n"));
    }

    #[test]
    fn test_image_with_caption() {
        let mut doc = doc_with(vec![]);
        let index = doc.add_image(asset(Some("doc_images/doc_page1_image1.png"), Some("Fig 1\nNetwork")));
        doc.pages[0].add_block(Block::image(index, 500.0));
        assert_eq!(
            render(&doc),
            "![](doc_images/doc_page1_image1.png)\n> Fig 1\n> Network\n"
        );
    }

    #[test]
    fn test_unsaved_image_is_comment() {
        let mut doc = doc_with(vec![]);
        let index = doc.add_image(asset(None, None));
        doc.pages[0].add_block(Block::image(index, 500.0));
        let md = render(&doc);
        assert!(md.starts_with("<!--"));
        assert!(md.contains("could not be extracted"));
    }

    #[test]
    fn test_escaping() {
        let doc = doc_with(vec![
            Block::paragraph("# not a heading with *stars*", 700.0),
            row(1, &["a|b", "c"], 600.0),
            row(1, &["d", "e"], 580.0),
        ]);
        let md = render(&doc);
        assert!(md.contains("\\# not a heading with \\*stars\\*"));
        assert!(md.contains("| a\\|b | c |"));
    }

    #[test]
    fn test_frontmatter() {
        let mut doc = doc_with(vec![Block::paragraph("Text", 700.0)]);
        doc.metadata.title = Some("Report".into());
        doc.metadata.page_count = 1;
        let md = to_markdown(&doc, &RenderOptions::new().with_frontmatter(true)).unwrap();
        assert!(md.starts_with("---\ntitle: \"Report\"\n"));
        assert!(md.ends_with("---\n\nText\n"));
    }

    #[test]
    fn test_comment_block() {
        let doc = doc_with(vec![Block::comment("page 2 could not be read -- skipped", 0.0)]);
        assert_eq!(render(&doc), "<!-- page 2 could not be read - - skipped -->\n");
    }
}
