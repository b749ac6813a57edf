//! Conversion pipeline: an opened PDF in, an Obsidian note out.
//!
//! # Example
//!
//! ```no_run
//! use pdfnote::convert::Converter;
//! use std::path::Path;
//!
//! fn main() -> pdfnote::Result<()> {
//!     let result = Converter::new()
//!         .with_password("secret")
//!         .lenient()
//!         .convert_file(Path::new("report.pdf"), Path::new("report.md"))?;
//!     println!("{} headings", result.report.heading_count);
//!     Ok(())
//! }
//! ```

mod output;

pub use output::{default_image_dir, default_output_path, file_stem, link_prefix, write_atomic};

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::image::{ImageExtractor, OcrEngine};
use crate::layout::{BlockSegmenter, FontStatistics, StyleAnalyzer};
use crate::model::{Block, Document, ImageAsset, Page};
use crate::parser::{ErrorMode, PageContent, PageSelection, PageSource, ParseOptions, PdfParser};
use crate::render::{ConversionReport, LinkSummary, LinkTagger, MarkdownRenderer};

/// Progress callback, called with `(pages done, pages selected)`.
pub type PageCallback = Box<dyn Fn(u32, u32)>;

/// Result of converting a document.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Final note text, after linking and tagging
    pub content: String,

    /// The classified document the note was rendered from
    pub document: Document,

    pub report: ConversionReport,
}

/// Builder and driver for conversions.
pub struct Converter {
    config: Config,
    parse: ParseOptions,
    image_dir: Option<PathBuf>,
    ocr: Option<Box<dyn OcrEngine>>,
    on_page: Option<PageCallback>,
}

impl Converter {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            parse: ParseOptions::default(),
            image_dir: None,
            ocr: None,
            on_page: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.parse = self.parse.with_password(password);
        self
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.parse = self.parse.with_pages(pages);
        self
    }

    /// Replace unreadable pages with a comment instead of failing.
    pub fn lenient(mut self) -> Self {
        self.parse = self.parse.lenient();
        self
    }

    /// Caption saved images with this OCR engine.
    pub fn with_ocr(mut self, engine: impl OcrEngine + 'static) -> Self {
        self.ocr = Some(Box::new(engine));
        self
    }

    /// Save images here instead of next to the output.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Skip images entirely.
    pub fn without_images(mut self) -> Self {
        self.parse = self.parse.with_images(false);
        self
    }

    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.config.render.include_frontmatter = include;
        self
    }

    pub fn on_page<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, u32) + 'static,
    {
        self.on_page = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open and unlock `input` with this converter's parse options.
    pub fn open(&self, input: &Path) -> Result<PdfParser> {
        PdfParser::open_with_options(input, self.parse.clone())
    }

    /// Convert `input` into a note at `output`.
    ///
    /// Nothing is written unless the PDF opens and unlocks. The note is
    /// written atomically once everything else succeeded.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<ConvertResult> {
        self.config.validate()?;
        let parser = self.open(input)?;

        let image_dir = self
            .image_dir
            .clone()
            .unwrap_or_else(|| default_image_dir(output));
        let mut images = ImageExtractor::new(
            &image_dir,
            link_prefix(output, &image_dir),
            file_stem(output),
        );
        if let Some(ref engine) = self.ocr {
            images = images.with_ocr(engine.as_ref());
        }

        let document = self.convert_source(&parser, Some(&mut images))?;
        let (content, summary) = self.render(&document)?;
        write_atomic(output, &content)?;
        log::info!("wrote {}", output.display());

        let mut report = ConversionReport::from_document(&document);
        report.add_links(summary.linked.len(), summary.tags.len());
        Ok(ConvertResult {
            content,
            document,
            report,
        })
    }

    /// Classify `input` without saving images or writing anything.
    pub fn analyze_file(&self, input: &Path) -> Result<Document> {
        self.config.validate()?;
        let parser = self.open(input)?;
        self.convert_source(&parser, None)
    }

    /// Build the classified document for the selected pages of `source`.
    ///
    /// The body font size is measured over every page first, so a page
    /// selection does not change how the selected pages are classified.
    /// Without an extractor, image positions are recorded but nothing is
    /// saved. In strict mode an unreadable selected page fails the call
    /// before any page is built.
    pub fn convert_source<S: PageSource + ?Sized>(
        &self,
        source: &S,
        mut images: Option<&mut ImageExtractor<'_>>,
    ) -> Result<Document> {
        let numbers = source.page_numbers();
        let mut stats = FontStatistics::new();
        let mut selected = Vec::new();
        for number in numbers.iter().copied() {
            let wanted = self.parse.pages.includes(number);
            match source.page(number) {
                Ok(content) => {
                    for run in &content.runs {
                        stats.add_run(run);
                    }
                    if wanted {
                        selected.push((number, Ok(content)));
                    }
                }
                Err(e) if wanted && self.parse.error_mode == ErrorMode::Strict => {
                    log::error!("page {} unreadable: {}", number, e);
                    return Err(e);
                }
                Err(e) if wanted => selected.push((number, Err(e))),
                Err(e) => log::debug!("unselected page {} unreadable: {}", number, e),
            }
        }
        if selected.is_empty() && !numbers.is_empty() {
            if let Some(first) = first_requested(&self.parse.pages) {
                return Err(Error::PageOutOfRange(first, numbers.len() as u32));
            }
        }

        let body_size = stats.body_size();
        log::info!("dominant body font size {:.1}pt", body_size);
        let analyzer = StyleAnalyzer::new(&self.config.analyzer, body_size)?;
        let segmenter = BlockSegmenter::new(&self.config.segmenter)?;

        let mut doc = Document::new();
        doc.metadata = source.metadata().clone();
        doc.body_font_size = body_size;

        let total = selected.len() as u32;
        for (done, (number, content)) in selected.into_iter().enumerate() {
            let page = match content {
                Ok(content) => build_page(
                    content,
                    &analyzer,
                    &segmenter,
                    &mut doc,
                    images.as_deref_mut(),
                ),
                Err(e) => {
                    log::warn!("page {} skipped: {}", number, e);
                    let mut page = Page::letter(number);
                    page.add_block(Block::comment(
                        format!("page {} could not be read: {}", number, e),
                        0.0,
                    ));
                    page
                }
            };
            doc.add_page(page);
            if let Some(ref callback) = self.on_page {
                callback(done as u32 + 1, total);
            }
        }
        Ok(doc)
    }

    /// Render a document and run the link/tag pass over it.
    pub fn render(&self, doc: &Document) -> Result<(String, LinkSummary)> {
        let markdown = MarkdownRenderer::new(self.config.render.clone()).render(doc)?;
        let tagger = LinkTagger::new(&self.config.vocabulary)?;
        Ok(tagger.process_with_summary(&markdown))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Dominant body size over every readable page of `source`.
pub fn font_statistics<S: PageSource + ?Sized>(source: &S) -> FontStatistics {
    let mut stats = FontStatistics::new();
    for number in source.page_numbers() {
        match source.page(number) {
            Ok(content) => {
                for run in &content.runs {
                    stats.add_run(run);
                }
            }
            Err(e) => log::debug!("page {} not measured: {}", number, e),
        }
    }
    stats
}

fn build_page(
    content: PageContent,
    analyzer: &StyleAnalyzer,
    segmenter: &BlockSegmenter,
    doc: &mut Document,
    images: Option<&mut ImageExtractor<'_>>,
) -> Page {
    let mut page = Page::new(content.number, content.width, content.height);
    let classified = analyzer.classify_all(&content.runs);
    for block in segmenter.segment(&classified) {
        page.add_block(block);
    }

    let mut images = images;
    for (i, placed) in content.images.into_iter().enumerate() {
        let index = i as u32 + 1;
        let top = placed.bbox.y1;
        let asset = match images.as_deref_mut() {
            Some(extractor) => extractor.extract(content.number, index, placed),
            None => ImageAsset {
                page: content.number,
                index,
                bbox: placed.bbox,
                path: None,
                link: String::new(),
                caption: None,
            },
        };
        let asset = doc.add_image(asset);
        page.insert_by_position(Block::image(asset, top));
    }

    log::debug!("page {}: {} blocks", page.number, page.blocks.len());
    page
}

fn first_requested(pages: &PageSelection) -> Option<u32> {
    match pages {
        PageSelection::All => None,
        PageSelection::Range(range) => Some(*range.start()),
        PageSelection::Pages(pages) => pages.first().copied(),
    }
}
