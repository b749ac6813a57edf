//! Image extraction and OCR.

mod encode;
mod extractor;
mod ocr;

pub use encode::{encode, EncodedImage};
pub use extractor::ImageExtractor;
pub use ocr::{OcrEngine, TesseractCli};
