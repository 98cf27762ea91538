//! Board-dump extraction.
//!
//! A stuck deal appears in a solver session log as a header line naming the
//! variant, eleven board lines, and a line starting with the stuck marker
//! twelve lines below the header:
//!
//! ```text
//! Canfield ...            <- header
//! Fnd:  Ah                <- 0..=3  foundations, one pile per non-empty line
//! ...
//! Res:  5c6d7h            <- 4      reserve, cards split at colour codes
//! Tab:  9s                <- 5..=8  tableau piles, one per line
//! ...
//! Stk:  2c 3c 4c          <- 9..=10 stock, both lines concatenated
//! ...
//! Stuck ...               <- marker
//! ```
//!
//! Colour escapes are zero-width on a terminal, so removing them keeps the
//! column layout intact. Their positions are remembered as token breaks
//! because reserve cards are told apart by colour alone.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::deal::{Card, DealRecord};
use crate::error::{CoreError, Result};

/// Board lines between the header and the marker line.
pub const BLOCK_LINES: usize = 11;

/// Offset of the marker line from the header line.
pub const MARKER_OFFSET: usize = BLOCK_LINES + 1;

const ESCAPE_PATTERN: &str = r"\x1b\[[0-9;]*m";

fn escape_regex() -> &'static Regex {
    static ESCAPE: OnceLock<Regex> = OnceLock::new();
    ESCAPE.get_or_init(|| Regex::new(ESCAPE_PATTERN).expect("escape pattern is a valid regex"))
}

/// Remove terminal colour/style escapes. Idempotent.
pub fn strip_escapes(line: &str) -> String {
    escape_regex().replace_all(line, "").into_owned()
}

/// A line with escapes removed, plus the byte offsets (into `text`) where
/// an escape used to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedLine {
    pub text: String,
    pub breaks: Vec<usize>,
}

impl StrippedLine {
    pub fn new(line: &str) -> Self {
        let mut text = String::with_capacity(line.len());
        let mut breaks = Vec::new();
        let mut last = 0;
        for found in escape_regex().find_iter(line) {
            text.push_str(&line[last..found.start()]);
            breaks.push(text.len());
            last = found.end();
        }
        text.push_str(&line[last..]);
        Self { text, breaks }
    }

    /// Drop the first `columns` characters, shifting the breaks to match.
    pub fn skip_columns(&self, columns: usize) -> StrippedLine {
        let cut = self
            .text
            .char_indices()
            .nth(columns)
            .map_or(self.text.len(), |(index, _)| index);
        StrippedLine {
            text: self.text[cut..].to_string(),
            breaks: self
                .breaks
                .iter()
                .filter(|b| **b > cut)
                .map(|b| b - cut)
                .collect(),
        }
    }

    /// Whitespace-separated cards.
    pub fn cards(&self) -> Vec<Card> {
        self.text.split_whitespace().map(Card::parse).collect()
    }

    /// Cards separated by whitespace or by a removed escape.
    pub fn cards_split_at_breaks(&self) -> Vec<Card> {
        let mut cards = Vec::new();
        let mut start = 0;
        for end in self.breaks.iter().copied().chain([self.text.len()]) {
            cards.extend(self.text[start..end].split_whitespace().map(Card::parse));
            start = end;
        }
        cards
    }
}

/// Extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Prefix of the header line naming the variant.
    pub variant_prefix: String,

    /// Prefix of the line that marks the deal as stuck.
    pub stuck_marker: String,

    /// Width of the zone label at the start of each board line.
    pub label_width: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            variant_prefix: "Canfield".to_string(),
            stuck_marker: "Stuck".to_string(),
            label_width: 6,
        }
    }
}

/// A deal recovered from a session log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckDeal {
    /// 1-based line number of the header in the log.
    pub header_line: usize,
    pub record: DealRecord,
}

/// Recovers [`DealRecord`]s from board dumps.
#[derive(Debug, Clone, Default)]
pub struct DealStateExtractor {
    config: ExtractorConfig,
}

impl DealStateExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Parse the eleven board lines that follow a header.
    pub fn extract(&self, block: &[&str]) -> Result<DealRecord> {
        if block.len() != BLOCK_LINES {
            return Err(CoreError::MalformedBlock {
                expected: BLOCK_LINES,
                found: block.len(),
            });
        }

        let lines: Vec<StrippedLine> = block
            .iter()
            .map(|line| StrippedLine::new(line).skip_columns(self.config.label_width))
            .collect();

        let foundations = lines[0..4]
            .iter()
            .filter(|line| !line.text.trim().is_empty())
            .map(StrippedLine::cards)
            .collect();
        let reserve = lines[4].cards_split_at_breaks();
        let tableau_piles = lines[5..9].iter().map(StrippedLine::cards).collect();
        let stock = lines[9..11].iter().flat_map(StrippedLine::cards).collect();

        Ok(DealRecord {
            foundations,
            reserve,
            tableau_piles,
            stock,
            waste: None,
        })
    }

    /// Whether `lines[index]` opens a stuck-deal block.
    pub fn is_stuck_header(&self, lines: &[&str], index: usize) -> bool {
        let Some(header) = lines.get(index) else {
            return false;
        };
        if !strip_escapes(header).starts_with(&self.config.variant_prefix) {
            return false;
        }
        lines
            .get(index + MARKER_OFFSET)
            .is_some_and(|marker| strip_escapes(marker).starts_with(&self.config.stuck_marker))
    }

    /// Every stuck deal in `log`, in encounter order.
    pub fn find_stuck_deals(&self, log: &str) -> Vec<StuckDeal> {
        let lines: Vec<&str> = log.lines().collect();
        let mut deals = Vec::new();

        for index in 0..lines.len() {
            if !self.is_stuck_header(&lines, index) {
                continue;
            }
            match self.extract(&lines[index + 1..index + MARKER_OFFSET]) {
                Ok(record) => {
                    debug!(line = index + 1, cards = record.card_count(), "Found stuck deal");
                    deals.push(StuckDeal {
                        header_line: index + 1,
                        record,
                    });
                }
                Err(e) => warn!(line = index + 1, error = %e, "Skipping unreadable board"),
            }
        }

        deals
    }
}
