//! Re-encoding of PDF image data into files.

use std::io::Cursor;

use ::image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};
use crate::parser::{ImageEncoding, RawImage};

/// Image bytes ready to be written, with the matching file extension.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

impl EncodedImage {
    /// Whether an OCR engine can be expected to read this format.
    pub fn is_ocr_readable(&self) -> bool {
        matches!(self.extension, "png" | "jpg")
    }
}

/// Turn image data from the PDF into a file format.
///
/// JPEG and JPEG 2000 streams are complete files already. 8-bit gray and
/// RGB samples become PNG; any other sample layout is written unchanged.
pub fn encode(raw: &RawImage) -> Result<EncodedImage> {
    match raw.encoding {
        ImageEncoding::Jpeg => Ok(EncodedImage {
            bytes: raw.data.clone(),
            extension: "jpg",
        }),
        ImageEncoding::Jpeg2000 => Ok(EncodedImage {
            bytes: raw.data.clone(),
            extension: "jp2",
        }),
        ImageEncoding::Raw => match (raw.bits_per_component, raw.components) {
            (8, Some(1)) | (8, Some(3)) => encode_png(raw),
            _ => {
                log::debug!(
                    "keeping {}x{} image with {} bpc / {:?} components as raw samples",
                    raw.width,
                    raw.height,
                    raw.bits_per_component,
                    raw.components
                );
                Ok(EncodedImage {
                    bytes: raw.data.clone(),
                    extension: "raw",
                })
            }
        },
    }
}

fn encode_png(raw: &RawImage) -> Result<EncodedImage> {
    let channels = raw.components.unwrap_or(1) as usize;
    let needed = raw.width as usize * raw.height as usize * channels;
    if raw.data.len() < needed {
        return Err(Error::ImageExtract(format!(
            "{}x{} image needs {} bytes of samples, stream has {}",
            raw.width,
            raw.height,
            needed,
            raw.data.len()
        )));
    }
    let samples = raw.data[..needed].to_vec();

    let image = if channels == 3 {
        RgbImage::from_raw(raw.width, raw.height, samples).map(DynamicImage::ImageRgb8)
    } else {
        GrayImage::from_raw(raw.width, raw.height, samples).map(DynamicImage::ImageLuma8)
    }
    .ok_or_else(|| Error::ImageExtract("sample buffer does not fit image size".to_string()))?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::ImageExtract(e.to_string()))?;

    Ok(EncodedImage {
        bytes,
        extension: "png",
    })
}
