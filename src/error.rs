//! Error types for pdfnote.

use std::io;
use thiserror::Error;

/// Result type alias for pdfnote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a PDF.
///
/// Only fatal conditions are represented here. OCR failures and ambiguous
/// layout are absorbed where they happen and never surface to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The document is encrypted and no password was supplied.
    #[error("Document is encrypted; a password is required")]
    PasswordRequired,

    /// The supplied password does not unlock the document.
    #[error("Invalid password")]
    InvalidPassword,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Error decoding or saving an embedded image.
    #[error("Image extraction error: {0}")]
    ImageExtract(String),

    /// The OCR engine failed or could not be started.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error during rendering.
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Whether this error means the document could not be unlocked.
    pub fn is_password_error(&self) -> bool {
        matches!(self, Error::PasswordRequired | Error::InvalidPassword)
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::PasswordRequired,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Config(err.to_string())
    }
}
