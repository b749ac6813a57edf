//! Document model.
//!
//! The parser produces [`TextRun`]s, the segmenter turns them into
//! [`Block`]s, and a [`Document`] collects the blocks of every page together
//! with the [`ImageAsset`]s the image blocks point to.

mod block;
mod document;
mod image;
mod page;
mod run;

pub use block::{Block, BlockKind, ListMarker};
pub use document::{Document, Metadata};
pub use image::ImageAsset;
pub use page::Page;
pub(crate) use run::AVG_CHAR_WIDTH_RATIO;
pub use run::{BoundingBox, Rgb, TextRun};
