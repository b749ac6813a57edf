//! # pdfnote
//!
//! Convert (possibly password-protected) PDFs into Markdown notes for an
//! Obsidian-style knowledge base.
//!
//! Document structure is inferred from font and layout cues: large or
//! coloured runs become headings, marker-led lines become nested lists,
//! aligned columns become tables and monospaced lines become code blocks.
//! Embedded images are saved next to the note and can be captioned with
//! OCR. The rendered note is finally post-processed to wrap key terms in
//! `[[wikilinks]]` and append `#tags`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfnote::{Config, Converter};
//! use std::path::Path;
//!
//! fn main() -> pdfnote::Result<()> {
//!     let config = Config::from_json_file("pdfnote.json")?;
//!     let result = Converter::new()
//!         .with_config(config)
//!         .with_password("secret")
//!         .convert_file(Path::new("report.pdf"), Path::new("report.md"))?;
//!     println!("{} images saved", result.report.images_saved);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod detect;
pub mod error;
pub mod image;
pub mod layout;
pub mod model;
pub mod parser;
pub mod render;
pub mod text;

// Re-export commonly used types
pub use config::{AnalyzerConfig, AutoTerms, Config, SegmenterConfig, TagRule, Vocabulary};
pub use convert::{ConvertResult, Converter};
pub use detect::{is_pdf_bytes, sniff_version, sniff_version_from_path};
pub use error::{Error, Result};
pub use image::{ImageExtractor, OcrEngine, TesseractCli};
pub use layout::{BlockSegmenter, Role, StyleAnalyzer};
pub use model::{Block, BlockKind, Document, ImageAsset, ListMarker, Metadata, Page, TextRun};
pub use parser::{ErrorMode, PageSelection, PageSource, ParseOptions, PdfParser};
pub use render::{ConversionReport, JsonFormat, LinkTagger, MarkdownRenderer, RenderOptions};

use std::path::Path;

/// Convert a PDF file to a note with default settings.
///
/// The note is written to `output`; images go to `<output stem>_images/`.
///
/// # Example
///
/// ```no_run
/// let result = pdfnote::convert_file("report.pdf", "report.md").unwrap();
/// println!("{}", result.content);
/// ```
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<ConvertResult> {
    Converter::new().convert_file(input.as_ref(), output.as_ref())
}

/// Convert a password-protected PDF file to a note.
pub fn convert_file_with_password<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    password: &str,
) -> Result<ConvertResult> {
    Converter::new()
        .with_password(password)
        .convert_file(input.as_ref(), output.as_ref())
}

/// Classify a PDF without writing anything.
pub fn analyze_file<P: AsRef<Path>>(input: P) -> Result<Document> {
    Converter::new().analyze_file(input.as_ref())
}

/// Render PDF bytes to note text, without images.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("report.pdf").unwrap();
/// let markdown = pdfnote::to_markdown_bytes(&data, &pdfnote::Config::default()).unwrap();
/// ```
pub fn to_markdown_bytes(data: &[u8], config: &Config) -> Result<String> {
    config.validate()?;
    let parser = PdfParser::from_bytes(data)?;
    let converter = Converter::new()
        .with_config(config.clone())
        .without_images();
    let doc = converter.convert_source(&parser, None)?;
    Ok(converter.render(&doc)?.0)
}

/// Dump the classified structure of a PDF as JSON.
pub fn to_json<P: AsRef<Path>>(input: P, format: JsonFormat) -> Result<String> {
    let doc = analyze_file(input)?;
    render::to_json(&doc, format)
}
