//! Saving page images and captioning them with OCR.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::ImageAsset;
use crate::parser::PlacedImage;

use super::encode::encode;
use super::ocr::OcrEngine;

/// Writes images into one directory under deterministic names.
///
/// The directory is created on the first image saved, so conversions of
/// image-free documents leave no empty directory behind.
pub struct ImageExtractor<'a> {
    dir: PathBuf,
    link_prefix: String,
    file_prefix: String,
    ocr: Option<&'a dyn OcrEngine>,
    dir_ready: bool,
}

impl<'a> ImageExtractor<'a> {
    /// `link_prefix` is prepended to file names in Markdown links (for
    /// example `"report_images/"`); `file_prefix` starts every file name.
    pub fn new(
        dir: impl Into<PathBuf>,
        link_prefix: impl Into<String>,
        file_prefix: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            link_prefix: link_prefix.into(),
            file_prefix: file_prefix.into(),
            ocr: None,
            dir_ready: false,
        }
    }

    pub fn with_ocr(mut self, engine: &'a dyn OcrEngine) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ocr_enabled(&self) -> bool {
        self.ocr.is_some()
    }

    /// `{prefix}_page{P}_image{N}.{ext}`
    pub fn file_name(&self, page: u32, index: u32, extension: &str) -> String {
        format!(
            "{}_page{}_image{}.{}",
            self.file_prefix, page, index, extension
        )
    }

    /// Save the `index`-th image (1-based) of `page` and caption it.
    ///
    /// Never fails: an image that cannot be decoded or written yields an
    /// asset without a path, and OCR problems only leave the caption empty.
    pub fn extract(&mut self, page: u32, index: u32, placed: PlacedImage) -> ImageAsset {
        let mut asset = ImageAsset {
            page,
            index,
            bbox: placed.bbox,
            path: None,
            link: String::new(),
            caption: None,
        };

        let encoded = match placed.image.and_then(|raw| encode(&raw)) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("page {} image {}: cannot decode: {}", page, index, e);
                return asset;
            }
        };

        let name = self.file_name(page, index, encoded.extension);
        let path = self.dir.join(&name);
        if let Err(e) = self.ensure_dir().and_then(|_| fs::write(&path, &encoded.bytes)) {
            log::warn!("page {} image {}: cannot write {}: {}", page, index, path.display(), e);
            return asset;
        }
        log::debug!("saved {} ({} bytes)", path.display(), encoded.bytes.len());

        if encoded.is_ocr_readable() {
            asset.caption = self.caption(&path);
        }
        asset.link = format!("{}{}", self.link_prefix, name);
        asset.path = Some(path);
        asset
    }

    fn ensure_dir(&mut self) -> std::io::Result<()> {
        if !self.dir_ready {
            fs::create_dir_all(&self.dir)?;
            self.dir_ready = true;
        }
        Ok(())
    }

    fn caption(&self, path: &Path) -> Option<String> {
        let engine = self.ocr?;
        match engine.recognize(path) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    log::warn!("OCR found no text in {}", path.display());
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                log::warn!("OCR failed for {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::model::BoundingBox;
    use crate::parser::{ImageEncoding, RawImage};

    struct StubOcr(Result<String>);

    impl OcrEngine for StubOcr {
        fn recognize(&self, _image: &Path) -> Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(Error::Ocr("stub failure".into())),
            }
        }
    }

    fn gray_image() -> PlacedImage {
        PlacedImage {
            bbox: BoundingBox::new(72.0, 400.0, 272.0, 600.0),
            image: Ok(RawImage {
                data: vec![0, 255, 255, 0],
                encoding: ImageEncoding::Raw,
                width: 2,
                height: 2,
                bits_per_component: 8,
                components: Some(1),
            }),
        }
    }

    #[test]
    fn test_saves_with_deterministic_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("notes_images");
        let mut extractor = ImageExtractor::new(&dir, "notes_images/", "notes");

        let asset = extractor.extract(3, 2, gray_image());
        assert_eq!(asset.link, "notes_images/notes_page3_image2.png");
        let path = asset.path.unwrap();
        assert_eq!(path, dir.join("notes_page3_image2.png"));
        assert!(path.exists());
        assert!(asset.caption.is_none());
    }

    #[test]
    fn test_ocr_caption_trimmed() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubOcr(Ok("  Figure 1: topology \n".into()));
        let mut extractor = ImageExtractor::new(tmp.path(), "", "doc").with_ocr(&stub);
        let asset = extractor.extract(1, 1, gray_image());
        assert_eq!(asset.caption.as_deref(), Some("Figure 1: topology"));
    }

    #[test]
    fn test_empty_or_failed_ocr_leaves_no_caption() {
        let tmp = tempfile::tempdir().unwrap();
        let blank = StubOcr(Ok("   \n".into()));
        let mut empty = ImageExtractor::new(tmp.path(), "", "doc").with_ocr(&blank);
        let asset = empty.extract(1, 1, gray_image());
        assert!(asset.is_saved());
        assert!(asset.caption.is_none());

        let broken = StubOcr(Err(Error::Ocr(String::new())));
        let mut failing = ImageExtractor::new(tmp.path(), "", "doc").with_ocr(&broken);
        let asset = failing.extract(1, 2, gray_image());
        assert!(asset.is_saved());
        assert!(!asset.has_caption());
    }

    #[test]
    fn test_undecodable_image_is_not_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("imgs");
        let mut extractor = ImageExtractor::new(&dir, "imgs/", "doc");
        let placed = PlacedImage {
            bbox: BoundingBox::default(),
            image: Err(Error::ImageExtract("broken".into())),
        };
        let asset = extractor.extract(1, 1, placed);
        assert!(!asset.is_saved());
        assert!(asset.link.is_empty());
        assert!(!dir.exists(), "no directory for nothing saved");
    }
}
