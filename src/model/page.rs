//! Page-level types.

use super::Block;
use serde::{Deserialize, Serialize};

/// A single converted page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Blocks in reading order
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            blocks: Vec::new(),
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0)
    }

    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Insert a block at its vertical position, keeping top-to-bottom order.
    ///
    /// A block is placed after every existing block whose top is at or above
    /// its own, so ties keep insertion order.
    pub fn insert_by_position(&mut self, block: Block) {
        let at = self
            .blocks
            .iter()
            .position(|existing| existing.top < block.top)
            .unwrap_or(self.blocks.len());
        self.blocks.insert(at, block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Plain text of every block, one per line.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| !b.text.is_empty())
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
