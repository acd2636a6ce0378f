//! Corpus tooling: sentence filtering for test samples and a
//! Unicode block histogram for choosing them.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::Result;

pub const DEFAULT_MAX_ASCII_RATIO: f64 = 0.90;

const TOP_BLOCKS: usize = 10;

/// Share of code points below U+0080. None for empty text.
pub fn ascii_ratio(text: &str) -> Option<f64> {
    let (ascii, total) = text
        .chars()
        .fold((0usize, 0usize), |(ascii, total), ch| {
            (ascii + ch.is_ascii() as usize, total + 1)
        });
    (total > 0).then(|| ascii as f64 / total as f64)
}

/// A sentence is worth keeping when enough of it is non-ASCII.
pub fn is_interesting(text: &str, max_ascii_ratio: f64) -> bool {
    ascii_ratio(text).is_some_and(|ratio| ratio < max_ascii_ratio)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub kept: u64,
    pub dropped: u64,
}

/// Filter a Tatoeba `sentences.csv` dump (`id \t lang \t text \t ...`).
///
/// Keeps the first three columns of rows whose text passes
/// `is_interesting`; extra columns such as timestamps are dropped.
/// Rows without a text column are skipped.
pub fn clean_tatoeba<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    max_ascii_ratio: f64,
) -> Result<CleanStats> {
    let mut stats = CleanStats::default();
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw);
        let mut columns = line.trim().split('\t');
        match (columns.next(), columns.next(), columns.next()) {
            (Some(id), Some(lang), Some(text)) if is_interesting(text, max_ascii_ratio) => {
                writeln!(output, "{id}\t{lang}\t{text}")?;
                stats.kept += 1;
            }
            _ => stats.dropped += 1,
        }
    }
    output.flush()?;
    debug!("kept {} sentences, dropped {}", stats.kept, stats.dropped);
    Ok(stats)
}

/// One row of the block histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub start: u32,
    pub hits: u64,
    /// Distinct code points of the block seen at least once.
    pub used: usize,
}

impl fmt::Display for BlockSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}..{:04X} range: {:>10} hits ({} out of 128 actually used)",
            self.start,
            self.start + 0x7F,
            self.hits,
            self.used
        )
    }
}

/// Code point counts per 128-aligned block.
#[derive(Debug, Clone, Default)]
pub struct BlockStats {
    blocks: BTreeMap<u32, u64>,
    seen: HashSet<u32>,
}

impl BlockStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_text(&mut self, text: &str) {
        for ch in text.chars() {
            let cp = ch as u32;
            *self.blocks.entry(cp >> 7).or_insert(0) += 1;
            self.seen.insert(cp);
        }
    }

    pub fn total(&self) -> u64 {
        self.blocks.values().sum()
    }

    /// The `n` busiest blocks, most hits first. Ties keep block order.
    pub fn top(&self, n: usize) -> Vec<BlockSummary> {
        let mut rows: Vec<BlockSummary> = self
            .blocks
            .iter()
            .map(|(&block, &hits)| {
                let start = block << 7;
                BlockSummary {
                    start,
                    hits,
                    used: (start..start + 0x80).filter(|cp| self.seen.contains(cp)).count(),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.hits.cmp(&a.hits));
        rows.truncate(n);
        rows
    }

    pub fn write_report<W: Write>(&self, mut out: W) -> Result<()> {
        for row in self.top(TOP_BLOCKS) {
            writeln!(out, "{row}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_counts_code_points() {
        assert_eq!(ascii_ratio(""), None);
        assert_eq!(ascii_ratio("abcd"), Some(1.0));
        assert_eq!(ascii_ratio("ab日本"), Some(0.5));
    }

    #[test]
    fn interesting_threshold() {
        assert!(!is_interesting("", DEFAULT_MAX_ASCII_RATIO));
        assert!(!is_interesting("Hello there", DEFAULT_MAX_ASCII_RATIO));
        assert!(is_interesting("Привет", DEFAULT_MAX_ASCII_RATIO));
        // 9 of 10 ASCII sits exactly on the threshold
        assert!(!is_interesting("abcdefghié", DEFAULT_MAX_ASCII_RATIO));
        assert!(is_interesting("abcdefghé", DEFAULT_MAX_ASCII_RATIO));
    }

    #[test]
    fn clean_keeps_three_columns() {
        let input = "1\teng\tI am here.\t2010-01-01\n\
                     2\trus\tЯ здесь.\t2010-01-02\n\
                     3\tjpn\n\
                     4\tjpn\t私はここにいる。  \n";
        let mut out = Vec::new();
        let stats = clean_tatoeba(input.as_bytes(), &mut out, DEFAULT_MAX_ASCII_RATIO).unwrap();
        assert_eq!(stats, CleanStats { kept: 2, dropped: 2 });
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2\trus\tЯ здесь.\n4\tjpn\t私はここにいる。\n"
        );
    }

    #[test]
    fn block_histogram() {
        let mut stats = BlockStats::new();
        stats.add_text("аааб ab");
        assert_eq!(stats.total(), 7);

        let top = stats.top(10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], BlockSummary { start: 0x400, hits: 4, used: 2 });
        assert_eq!(top[1], BlockSummary { start: 0, hits: 3, used: 3 });
        assert_eq!(stats.top(1).len(), 1);
    }

    #[test]
    fn summary_row_format() {
        let row = BlockSummary { start: 0x400, hits: 42, used: 7 };
        assert_eq!(
            row.to_string(),
            "0400..047F range:         42 hits (7 out of 128 actually used)"
        );
    }
}
