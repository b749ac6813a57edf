//! OCR engines.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Recognizes text in a saved image file.
pub trait OcrEngine {
    /// Return the text found in the image (possibly empty).
    fn recognize(&self, image: &Path) -> Result<String>;
}

impl<T: OcrEngine + ?Sized> OcrEngine for Box<T> {
    fn recognize(&self, image: &Path) -> Result<String> {
        (**self).recognize(image)
    }
}

/// Runs the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
    lang: String,
}

impl TesseractCli {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            lang: lang.into(),
        }
    }

    /// Use a specific tesseract binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Whether the binary can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .map_err(|e| Error::Ocr(format!("failed to run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Ocr(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_ocr_error() {
        let engine = TesseractCli::new("eng").with_program("/nonexistent/tesseract-binary");
        assert!(!engine.is_available());
        let err = engine.recognize(Path::new("image.png")).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }

    #[test]
    fn test_boxed_engine() {
        struct Fixed;
        impl OcrEngine for Fixed {
            fn recognize(&self, _image: &Path) -> Result<String> {
                Ok("text".into())
            }
        }
        let boxed: Box<dyn OcrEngine> = Box::new(Fixed);
        assert_eq!(boxed.recognize(Path::new("x.png")).unwrap(), "text");
    }
}
