//! Layout analysis: style classification and block segmentation.

mod analyzer;
mod list;
mod segmenter;
mod table;

pub use analyzer::{ClassifiedRun, FontStatistics, Role, StyleAnalyzer, DEFAULT_BODY_SIZE};
pub use list::{ListMarkers, DEFAULT_LIST_MARKER_PATTERN};
pub use segmenter::BlockSegmenter;
