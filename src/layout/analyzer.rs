//! Font/style analysis: classifies text runs into structural roles.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::model::TextRun;

/// Body size assumed for documents without any text.
pub const DEFAULT_BODY_SIZE: f32 = 12.0;

/// Structural role of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Heading1,
    Heading2,
    Body,
    Monospace,
}

impl Role {
    pub fn heading_level(self) -> Option<u8> {
        match self {
            Role::Heading1 => Some(1),
            Role::Heading2 => Some(2),
            _ => None,
        }
    }
}

/// A run paired with its role.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedRun<'a> {
    pub run: &'a TextRun,
    pub role: Role,
}

/// Character-weighted histogram of font sizes, in tenths of a point.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    histogram: BTreeMap<i32, usize>,
}

impl FontStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs<'a, I: IntoIterator<Item = &'a TextRun>>(runs: I) -> Self {
        let mut stats = Self::new();
        for run in runs {
            stats.add_run(run);
        }
        stats
    }

    pub fn add_run(&mut self, run: &TextRun) {
        let weight = run.text.chars().filter(|c| !c.is_whitespace()).count();
        if weight > 0 && run.font_size > 0.0 {
            *self.histogram.entry(tenths(run.font_size)).or_insert(0) += weight;
        }
    }

    /// Merge another page's statistics into this one.
    pub fn merge(&mut self, other: &FontStatistics) {
        for (size, count) in &other.histogram {
            *self.histogram.entry(*size).or_insert(0) += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// The dominant body font size.
    ///
    /// The size carrying the most characters wins; on a tie the smaller size
    /// is chosen. Documents without text report [`DEFAULT_BODY_SIZE`].
    pub fn body_size(&self) -> f32 {
        // BTreeMap iterates ascending, so keeping only strictly greater
        // counts leaves the smallest size among equals.
        let mut best: Option<(i32, usize)> = None;
        for (&size, &count) in &self.histogram {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((size, count));
            }
        }
        best.map_or(DEFAULT_BODY_SIZE, |(size, _)| size as f32 / 10.0)
    }

    /// `(size, characters)` pairs, ascending by size.
    pub fn sizes(&self) -> impl Iterator<Item = (f32, usize)> + '_ {
        self.histogram
            .iter()
            .map(|(size, count)| (*size as f32 / 10.0, *count))
    }
}

fn tenths(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Classifies runs against thresholds relative to the body size.
#[derive(Debug, Clone)]
pub struct StyleAnalyzer {
    config: AnalyzerConfig,
    body_size: f32,
    monospace: Regex,
}

impl StyleAnalyzer {
    pub fn new(config: &AnalyzerConfig, body_size: f32) -> Result<Self> {
        Ok(Self {
            monospace: Regex::new(&config.monospace_pattern)?,
            config: config.clone(),
            body_size: if body_size > 0.0 {
                body_size
            } else {
                DEFAULT_BODY_SIZE
            },
        })
    }

    pub fn body_size(&self) -> f32 {
        self.body_size
    }

    /// Classify a single run.
    ///
    /// Size rules are checked first, then the font family, then colour and
    /// weight. When the two heading thresholds coincide a qualifying run is
    /// a level-2 heading.
    pub fn classify(&self, run: &TextRun) -> Role {
        let size = tenths(run.font_size);
        let h1 = tenths(self.body_size * self.config.h1_ratio);
        let h2 = tenths(self.body_size * self.config.h2_ratio);

        if h1 > h2 && size >= h1 {
            Role::Heading1
        } else if size >= h2 {
            Role::Heading2
        } else if self.monospace.is_match(&run.font_name) {
            Role::Monospace
        } else if self.config.heading_color == Some(run.color) {
            Role::Heading1
        } else if self.config.bold_as_heading && run.bold {
            Role::Heading2
        } else {
            Role::Body
        }
    }

    pub fn classify_all<'a>(&self, runs: &'a [TextRun]) -> Vec<ClassifiedRun<'a>> {
        runs.iter()
            .map(|run| ClassifiedRun {
                run,
                role: self.classify(run),
            })
            .collect()
    }
}
