//! Rendering of converted documents: Markdown, wikilinks and tags, JSON.

mod json;
mod linker;
mod markdown;
mod options;
mod result;

pub use json::{to_json, write_json, JsonFormat};
pub use linker::{LinkSummary, LinkTagger};
pub use markdown::{to_markdown, MarkdownRenderer};
pub use options::RenderOptions;
pub use result::ConversionReport;
