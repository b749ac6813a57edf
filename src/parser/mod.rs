//! PDF parsing: opening, decryption and content stream interpretation.

mod content;
mod options;
mod pdf_parser;

pub use content::{ImageEncoding, PageContent, PlacedImage, RawImage};
pub use options::{ErrorMode, PageSelection, ParseOptions};
pub use pdf_parser::{PageSource, PdfParser};
