//! PDF document parser using lopdf.

use std::path::Path;

use lopdf::encryption::DecryptionError;
use lopdf::Document as LopdfDocument;

use crate::detect::{sniff_version, sniff_version_from_path};
use crate::error::{Error, Result};
use crate::model::Metadata;

use super::content::{page_content_bytes, ContentInterpreter, PageContent};
use super::options::ParseOptions;

/// Letter size, used when a page has no usable /MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// A source of extracted page content.
///
/// [`PdfParser`] is the production implementation; tests can feed the
/// pipeline synthetic pages through the same seam.
pub trait PageSource {
    fn metadata(&self) -> &Metadata;

    /// All page numbers in the document, ascending (1-indexed).
    fn page_numbers(&self) -> Vec<u32>;

    /// Extract runs and images of one page.
    fn page(&self, number: u32) -> Result<PageContent>;
}

/// An opened, unlocked PDF document.
pub struct PdfParser {
    doc: LopdfDocument,
    options: ParseOptions,
    metadata: Metadata,
}

impl PdfParser {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        sniff_version_from_path(path)?;
        let doc = LopdfDocument::load(path)?;
        Self::from_document(doc, options)
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        sniff_version(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Self::from_document(doc, options)
    }

    /// Wrap an already loaded document, decrypting it first if needed.
    pub fn from_document(mut doc: LopdfDocument, options: ParseOptions) -> Result<Self> {
        let encrypted = doc.is_encrypted();
        if encrypted {
            unlock(&mut doc, options.password.as_deref())?;
        }

        let mut metadata = extract_metadata(&doc);
        metadata.encrypted = encrypted;
        log::info!(
            "opened PDF {} with {} pages{}",
            metadata.pdf_version,
            metadata.page_count,
            if encrypted { " (decrypted)" } else { "" }
        );

        Ok(Self {
            doc,
            options,
            metadata,
        })
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn page_count(&self) -> u32 {
        self.metadata.page_count
    }

    pub fn version(&self) -> &str {
        &self.metadata.pdf_version
    }

    fn page_dimensions(&self, page_id: lopdf::ObjectId) -> (f32, f32) {
        let media_box = self
            .doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"MediaBox").ok())
            .and_then(|mb| match mb {
                lopdf::Object::Reference(id) => self.doc.get_object(*id).ok(),
                other => Some(other),
            })
            .and_then(|mb| mb.as_array().ok());

        match media_box {
            Some(arr) if arr.len() >= 4 => {
                let n = |i: usize| arr[i].as_float().ok();
                match (n(0), n(1), n(2), n(3)) {
                    (Some(x0), Some(y0), Some(x1), Some(y1)) => ((x1 - x0).abs(), (y1 - y0).abs()),
                    _ => DEFAULT_PAGE_SIZE,
                }
            }
            _ => DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageSource for PdfParser {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.doc.get_pages().keys().copied().collect()
    }

    fn page(&self, number: u32) -> Result<PageContent> {
        let pages = self.doc.get_pages();
        let page_id = *pages
            .get(&number)
            .ok_or(Error::PageOutOfRange(number, pages.len() as u32))?;

        let (width, height) = self.page_dimensions(page_id);
        let interpreter =
            ContentInterpreter::new(&self.doc, page_id, number, self.options.extract_images)?;
        let content = page_content_bytes(&self.doc, page_id)?;
        let (runs, images) = interpreter.run(&content)?;

        log::debug!(
            "page {}: {} runs, {} images",
            number,
            runs.len(),
            images.len()
        );

        Ok(PageContent {
            number,
            width,
            height,
            runs,
            images,
        })
    }
}

/// Decrypt `doc` in place.
///
/// Without a password the empty user password is tried, which opens files
/// that are encrypted only to restrict permissions.
fn unlock(doc: &mut LopdfDocument, password: Option<&str>) -> Result<()> {
    match (password, doc.decrypt(password.unwrap_or(""))) {
        (_, Ok(())) => Ok(()),
        (None, Err(_)) => Err(Error::PasswordRequired),
        (Some(_), Err(lopdf::Error::Decryption(DecryptionError::IncorrectPassword))) => {
            Err(Error::InvalidPassword)
        }
        (Some(_), Err(e)) => Err(Error::PdfParse(format!("cannot decrypt document: {}", e))),
    }
}

fn extract_metadata(doc: &LopdfDocument) -> Metadata {
    let mut metadata = Metadata::with_version(doc.version.to_string());
    metadata.page_count = doc.get_pages().len() as u32;

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| match info {
            lopdf::Object::Reference(id) => doc.get_dictionary(*id).ok(),
            lopdf::Object::Dictionary(d) => Some(d),
            _ => None,
        });

    if let Some(info) = info {
        metadata.title = get_string_from_dict(info, b"Title");
        metadata.author = get_string_from_dict(info, b"Author");
        metadata.subject = get_string_from_dict(info, b"Subject");
        metadata.keywords = get_string_from_dict(info, b"Keywords");
        metadata.creator = get_string_from_dict(info, b"Creator");
        metadata.producer = get_string_from_dict(info, b"Producer");
        metadata.created = get_string_from_dict(info, b"CreationDate").and_then(|d| parse_pdf_date(&d));
        metadata.modified = get_string_from_dict(info, b"ModDate").and_then(|d| parse_pdf_date(&d));
    }

    metadata
}

/// Read a text string (UTF-16BE with BOM, UTF-8, or Latin-1) from a dictionary.
fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let text = match dict.get(key).ok()? {
        lopdf::Object::String(bytes, _) => {
            if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
                let utf16: Vec<u16> = body
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&utf16).ok()?
            } else {
                String::from_utf8(bytes.clone())
                    .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect())
            }
        }
        lopdf::Object::Name(bytes) => String::from_utf8_lossy(bytes).to_string(),
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let field = |range: std::ops::Range<usize>, default: u32| {
        s.get(range).and_then(|v| v.parse().ok()).unwrap_or(default)
    };

    chrono::NaiveDate::from_ymd_opt(year, field(4..6, 1), field(6..8, 1))
        .and_then(|date| date.and_hms_opt(field(8..10, 0), field(10..12, 0), field(12..14, 0)))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240115103045+09'00'").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
        assert_eq!(date.hour(), 10);
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 1);
        assert!(parse_pdf_date("D:20").is_none());
    }

    #[test]
    fn test_get_string_from_dict() {
        let mut dict = lopdf::Dictionary::new();
        dict.set(
            "Title",
            lopdf::Object::String(
                vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69],
                lopdf::StringFormat::Literal,
            ),
        );
        dict.set("Author", lopdf::Object::string_literal("  "));
        assert_eq!(get_string_from_dict(&dict, b"Title").as_deref(), Some("Hi"));
        assert_eq!(get_string_from_dict(&dict, b"Author"), None);
        assert_eq!(get_string_from_dict(&dict, b"Missing"), None);
    }

    #[test]
    fn test_not_a_pdf() {
        let result = PdfParser::from_bytes(b"hello world");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }
}
