//! Block segmentation: groups classified runs of one page into blocks.
//!
//! Runs are first assembled into lines by baseline, lines into candidate
//! blocks by role and vertical spacing. Body candidates are then split
//! further into tables, list items and paragraphs.

use crate::config::SegmenterConfig;
use crate::error::Result;
use crate::model::{Block, BlockKind};
use crate::text::join_lines;

use super::analyzer::{ClassifiedRun, Role};
use super::list::ListMarkers;
use super::table::{fit_table, looks_like_list, Cell};

/// Gaps wider than this fraction of the font size separate words.
const WORD_GAP_RATIO: f32 = 0.15;
/// Advance of a monospace glyph as a fraction of the font size.
const MONO_CHAR_RATIO: f32 = 0.6;
/// Average glyph advance used to rebuild spacing in preformatted text.
const PROSE_CHAR_RATIO: f32 = 0.5;

/// A row of runs sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
struct Line<'a> {
    runs: Vec<ClassifiedRun<'a>>,
    baseline: f32,
}

impl<'a> Line<'a> {
    fn new(run: ClassifiedRun<'a>) -> Self {
        Self {
            baseline: run.run.baseline(),
            runs: vec![run],
        }
    }

    fn x(&self) -> f32 {
        self.runs.iter().map(|r| r.run.x()).fold(f32::INFINITY, f32::min)
    }

    fn top(&self) -> f32 {
        self.runs
            .iter()
            .map(|r| r.run.top())
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn font_size(&self) -> f32 {
        self.runs.iter().map(|r| r.run.font_size).fold(0.0, f32::max)
    }

    /// Shared role of all runs; mixed lines read as body text.
    fn role(&self) -> Role {
        let first = self.runs[0].role;
        if self.runs.iter().all(|r| r.role == first) {
            first
        } else {
            Role::Body
        }
    }

    /// Text with a single space wherever runs are visibly apart.
    fn text(&self) -> String {
        let mut out = String::new();
        let mut prev_right: Option<f32> = None;
        for r in &self.runs {
            if let Some(right) = prev_right {
                let gap = r.run.x() - right;
                let spaced = out.ends_with(char::is_whitespace)
                    || r.run.text.starts_with(char::is_whitespace);
                if !spaced && gap > r.run.font_size * WORD_GAP_RATIO {
                    out.push(' ');
                }
            }
            out.push_str(&r.run.text);
            prev_right = Some(r.run.right());
        }
        out.trim().to_string()
    }

    /// Text with horizontal gaps rebuilt as runs of spaces.
    fn spaced_text(&self, origin: f32, char_ratio: f32) -> String {
        let char_width = (self.font_size() * char_ratio).max(1.0);
        let mut out = String::new();
        let mut cursor = origin;
        for r in &self.runs {
            let gap = r.run.x() - cursor;
            let spaces = (gap / char_width).round().max(0.0) as usize;
            let spaces = if out.is_empty() || out.ends_with(' ') {
                spaces
            } else {
                spaces.max(usize::from(gap > r.run.font_size * WORD_GAP_RATIO))
            };
            out.push_str(&" ".repeat(spaces));
            out.push_str(&r.run.text);
            cursor = r.run.right();
        }
        out.trim_end().to_string()
    }

    /// Split into cells at gaps of at least `min_gap` points.
    fn cells(&self, min_gap: f32) -> Vec<Cell> {
        let mut cells: Vec<Cell> = Vec::new();
        let mut current: Vec<ClassifiedRun<'a>> = Vec::new();
        let mut prev_right: Option<f32> = None;

        for r in &self.runs {
            if let Some(right) = prev_right {
                if r.run.x() - right >= min_gap {
                    cells.push(cell_of(&current));
                    current.clear();
                }
            }
            current.push(*r);
            prev_right = Some(r.run.right());
        }
        if !current.is_empty() {
            cells.push(cell_of(&current));
        }
        cells
    }
}

fn cell_of(runs: &[ClassifiedRun<'_>]) -> Cell {
    let line = Line {
        runs: runs.to_vec(),
        baseline: 0.0,
    };
    Cell {
        x: line.x(),
        text: line.text(),
    }
}

/// Lines that belong together: same role, normal line spacing.
#[derive(Debug)]
struct Candidate<'a> {
    role: Role,
    lines: Vec<Line<'a>>,
}

/// Groups classified runs into ordered blocks.
#[derive(Debug, Clone)]
pub struct BlockSegmenter {
    config: SegmenterConfig,
    markers: ListMarkers,
}

impl BlockSegmenter {
    pub fn new(config: &SegmenterConfig) -> Result<Self> {
        Ok(Self {
            markers: ListMarkers::new(&config.list_marker_pattern)?,
            config: config.clone(),
        })
    }

    /// Segment the runs of one page into blocks in reading order.
    ///
    /// Every run with visible text ends up in exactly one block.
    pub fn segment(&self, runs: &[ClassifiedRun<'_>]) -> Vec<Block> {
        let lines = self.group_lines(runs);
        if lines.is_empty() {
            return Vec::new();
        }
        let left_margin = lines.iter().map(Line::x).fold(f32::INFINITY, f32::min);

        let mut blocks = Vec::new();
        let mut table_id = 0u32;
        for candidate in self.group_candidates(lines) {
            match candidate.role {
                Role::Heading1 | Role::Heading2 => {
                    let level = candidate.role.heading_level().unwrap_or(2);
                    let texts: Vec<String> = candidate.lines.iter().map(Line::text).collect();
                    blocks.push(Block::heading(
                        level,
                        join_lines(&texts),
                        candidate.lines[0].top(),
                    ));
                }
                Role::Monospace => blocks.push(code_block(&candidate.lines, MONO_CHAR_RATIO)),
                Role::Body => {
                    self.body_blocks(&candidate.lines, left_margin, &mut table_id, &mut blocks)
                }
            }
        }

        log::debug!("segmented {} runs into {} blocks", runs.len(), blocks.len());
        blocks
    }

    /// Step 1: runs to lines, top to bottom.
    fn group_lines<'a>(&self, runs: &[ClassifiedRun<'a>]) -> Vec<Line<'a>> {
        let mut sorted: Vec<ClassifiedRun<'a>> = runs
            .iter()
            .filter(|r| !r.run.text.trim().is_empty())
            .copied()
            .collect();
        sorted.sort_by(|a, b| {
            b.run
                .baseline()
                .total_cmp(&a.run.baseline())
                .then(a.run.x().total_cmp(&b.run.x()))
        });

        let mut lines: Vec<Line<'a>> = Vec::new();
        for run in sorted {
            let tolerance = self.config.baseline_tolerance * run.run.font_size;
            match lines.last_mut() {
                Some(line) if (line.baseline - run.run.baseline()).abs() <= tolerance => {
                    line.runs.push(run);
                }
                _ => lines.push(Line::new(run)),
            }
        }

        for line in &mut lines {
            line.runs.sort_by(|a, b| a.run.x().total_cmp(&b.run.x()));
        }
        lines
    }

    /// Step 2: adjacent lines with the same role and normal spacing.
    fn group_candidates<'a>(&self, lines: Vec<Line<'a>>) -> Vec<Candidate<'a>> {
        let mut candidates: Vec<Candidate<'a>> = Vec::new();
        for line in lines {
            let role = line.role();
            if let Some(current) = candidates.last_mut() {
                if let Some(prev) = current.lines.last() {
                    let size = prev.font_size().max(line.font_size());
                    let distance = prev.baseline - line.baseline;
                    if current.role == role && distance <= self.config.line_spacing * size {
                        current.lines.push(line);
                        continue;
                    }
                }
            }
            candidates.push(Candidate {
                role,
                lines: vec![line],
            });
        }
        candidates
    }

    /// Steps 3 and 4: tables, list items and paragraphs.
    fn body_blocks(
        &self,
        lines: &[Line<'_>],
        left_margin: f32,
        table_id: &mut u32,
        blocks: &mut Vec<Block>,
    ) {
        let cells: Vec<Vec<Cell>> = lines
            .iter()
            .map(|l| l.cells(self.config.min_column_gap))
            .collect();

        let mut paragraph: Vec<&Line<'_>> = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let stretch = cells[i..].iter().take_while(|c| c.len() >= 2).count();
            if stretch >= self.config.min_table_rows {
                let rows = &cells[i..i + stretch];
                let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
                if !looks_like_list(rows, column_count, &self.markers) {
                    flush_paragraph(&mut paragraph, blocks);
                    let table_lines = &lines[i..i + stretch];
                    match fit_table(rows, self.config.column_tolerance) {
                        Some(table) => {
                            for (line, row) in table_lines.iter().zip(table.rows) {
                                blocks.push(Block::new(
                                    BlockKind::TableRow {
                                        table: *table_id,
                                        columns: table.columns.clone(),
                                        cells: row,
                                    },
                                    line.text(),
                                    line.top(),
                                ));
                            }
                            *table_id += 1;
                        }
                        None => blocks.push(code_block(table_lines, PROSE_CHAR_RATIO)),
                    }
                    i += stretch;
                    continue;
                }
            }

            let line = &lines[i];
            let text = line.text();
            if let Some((marker, rest)) = self.markers.parse(&text) {
                flush_paragraph(&mut paragraph, blocks);
                let mut item_lines = vec![rest.to_string()];
                let item_x = line.x();
                let mut j = i + 1;
                while j < lines.len()
                    && lines[j].x() > item_x + self.config.column_tolerance
                    && self.markers.parse(&lines[j].text()).is_none()
                    && cells[j].len() < 2
                {
                    item_lines.push(lines[j].text());
                    j += 1;
                }
                blocks.push(Block::list_item(
                    self.list_depth(item_x, left_margin),
                    marker,
                    join_lines(&item_lines),
                    line.top(),
                ));
                i = j;
                continue;
            }

            paragraph.push(line);
            i += 1;
        }
        flush_paragraph(&mut paragraph, blocks);
    }

    /// Nesting depth from the indentation past the page's left margin.
    fn list_depth(&self, x: f32, left_margin: f32) -> u8 {
        let levels = ((x - left_margin).max(0.0) / self.config.indent_unit).floor();
        levels.min(self.config.max_depth as f32) as u8
    }
}

fn flush_paragraph(lines: &mut Vec<&Line<'_>>, blocks: &mut Vec<Block>) {
    if lines.is_empty() {
        return;
    }
    let texts: Vec<String> = lines.iter().map(|l| l.text()).collect();
    let text = join_lines(&texts);
    if !text.is_empty() {
        blocks.push(Block::paragraph(text, lines[0].top()));
    }
    lines.clear();
}

/// Preformatted block keeping each line's offset from the leftmost line.
fn code_block(lines: &[Line<'_>], char_ratio: f32) -> Block {
    let origin = lines.iter().map(Line::x).fold(f32::INFINITY, f32::min);
    let text = lines
        .iter()
        .map(|l| l.spaced_text(origin, char_ratio))
        .collect::<Vec<_>>()
        .join("\n");
    Block::code(text, lines.first().map_or(0.0, Line::top))
}
