// src/encoder.rs
//! Streaming scanner: raw bytes in, coded units out.
//! O(n) time, O(1) memory: one partial UTF-8 sequence, one pending word and
//! a binary buffer capped near BIN_FLUSH_AT.
//!
//! Segmentation per input byte:
//!   - well-formed UTF-8 characters are coded by `encode_char` (ASCII
//!     literal, active-block byte, explicit form, or char-table reference)
//!   - ASCII letter runs are held back as a pending word (words format) and
//!     replaced by a word reference when the word table already holds them
//!   - anything else opens a binary run; following bytes join it until a
//!     well-formed multi-byte character of the active block shows up
//!
//! Codepage detection:
//!   The first time two consecutive cleanly-decoded characters share a
//!   non-ASCII 128-code-point block, the active block switches to it. This
//!   happens at most once per stream.

use std::io::{self, Write};

use tracing::debug;

use crate::model::{char_slot, is_word_byte, CharTable, WordTable, WordTracker, MAX_WORD_LEN};
use crate::opcode::{needs_escape, unit_len, Format, Unit, BIN_FLUSH_AT, BLOCK_SIZE, DEFAULT_BLOCK};
use crate::unitwriter::UnitWriter;
use crate::utf8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub format: Format,
}

impl Options {
    pub fn proto1() -> Self {
        Self { format: Format::Proto1 }
    }
}

/// Unit counts for one encoded stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub literals: u64,
    pub escapes: u64,
    pub in_block: u64,
    pub explicit_chars: u64,
    pub char_refs: u64,
    pub word_refs: u64,
    pub block_switches: u64,
    pub binary_runs: u64,
    pub binary_bytes: u64,
}

impl EncodeStats {
    fn record(&mut self, unit: &Unit) {
        match unit {
            Unit::Literal(_) => self.literals += 1,
            Unit::Escaped(_) => self.escapes += 1,
            Unit::InBlock(_) => self.in_block += 1,
            Unit::Char(_) | Unit::CharLearn(_) => self.explicit_chars += 1,
            Unit::CharRef(_) => self.char_refs += 1,
            Unit::SwitchBlock(_) => self.block_switches += 1,
            Unit::Binary(_) => self.binary_runs += 1,
            Unit::WordRef(_) => self.word_refs += 1,
        }
    }

    /// Output size relative to input, 1.0 when nothing was read.
    pub fn ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            return 1.0;
        }
        self.output_bytes as f64 / self.input_bytes as f64
    }
}

/// A multi-byte UTF-8 sequence still waiting for continuation bytes.
#[derive(Debug, Clone, Copy)]
struct Sequence {
    len: usize,
    need: usize,
    cp: u32,
    /// Binary buffer length before the lead byte was appended.
    snapshot: usize,
}

/// Forward transform over a byte sink.
///
/// Feed input through [`Write`]; call [`Encoder::finish`] to flush the
/// pending word and binary buffer. Output does not depend on how the input
/// is chunked.
pub struct Encoder<W: Write> {
    out: UnitWriter<W>,
    format: Format,
    started: bool,
    block: u32,
    block_detected: bool,
    prev_block: Option<u32>,
    chars: CharTable,
    words: WordTable,
    tracker: WordTracker,
    word: Vec<u8>,
    spilled: bool,
    binary: Vec<u8>,
    seq: Option<Sequence>,
    stats: EncodeStats,
}

impl<W: Write> Encoder<W> {
    pub fn new(inner: W, options: Options) -> Self {
        Self {
            out: UnitWriter::new(inner),
            format: options.format,
            started: false,
            block: DEFAULT_BLOCK,
            block_detected: false,
            prev_block: None,
            chars: CharTable::default(),
            words: WordTable::default(),
            tracker: WordTracker::default(),
            word: Vec::with_capacity(MAX_WORD_LEN),
            spilled: false,
            binary: Vec::with_capacity(BIN_FLUSH_AT + 4),
            seq: None,
            stats: EncodeStats::default(),
        }
    }

    pub fn stats(&self) -> &EncodeStats {
        &self.stats
    }

    /// Flush everything still buffered and return the sink.
    pub fn finish(mut self) -> io::Result<(W, EncodeStats)> {
        // A sequence cut short by end of input is already in the binary buffer.
        self.seq = None;
        self.finish_word()?;
        if self.format.has_words() {
            self.tracker.end(&mut self.words);
        }
        self.flush_binary()?;
        self.stats.output_bytes = self.out.written();
        log_unit_diagnostics(&self.stats);
        self.out.get_mut().flush()?;
        Ok((self.out.into_inner(), self.stats))
    }

    fn push_byte(&mut self, byte: u8) -> io::Result<()> {
        if !self.started {
            self.out.write_header(self.format)?;
            self.started = true;
        }
        self.stats.input_bytes += 1;
        match self.seq.take() {
            Some(seq) => self.continue_sequence(seq, byte),
            None => self.start_token(byte),
        }
    }

    fn start_token(&mut self, byte: u8) -> io::Result<()> {
        if self.binary.len() >= BIN_FLUSH_AT {
            self.flush_binary()?;
        }
        let snapshot = self.binary.len();

        if self.format.has_words() && snapshot == 0 && is_word_byte(byte) {
            self.observe_block(byte as u32)?;
            self.tracker.observe(byte, &mut self.words);
            return self.push_word_byte(byte);
        }

        self.finish_word()?;
        if self.format.has_words() {
            self.tracker.observe(byte, &mut self.words);
        }
        self.binary.push(byte);

        match utf8::sequence_len(byte) {
            Some(1) => self.complete(byte as u32, 1, snapshot),
            Some(len) => {
                self.seq = Some(Sequence {
                    len,
                    need: len - 1,
                    cp: utf8::lead_bits(byte, len),
                    snapshot,
                });
                Ok(())
            }
            // stray continuation byte or over-long lead: stays binary
            None => Ok(()),
        }
    }

    fn continue_sequence(&mut self, mut seq: Sequence, byte: u8) -> io::Result<()> {
        if self.format.has_words() {
            self.tracker.observe(byte, &mut self.words);
        }
        self.binary.push(byte);
        if !utf8::is_continuation(byte) {
            return Ok(());
        }

        seq.cp = (seq.cp << 6) | (byte & 0x3F) as u32;
        seq.need -= 1;
        if seq.need > 0 {
            self.seq = Some(seq);
            return Ok(());
        }
        if !utf8::is_shortest_form(seq.cp, seq.len) {
            return Ok(());
        }
        self.complete(seq.cp, seq.len, seq.snapshot)
    }

    /// A well-formed character whose bytes sit at `binary[snapshot..]`.
    fn complete(&mut self, cp: u32, len: usize, snapshot: usize) -> io::Result<()> {
        if snapshot == 0 {
            self.observe_block(cp)?;
        }
        // Once binary, stay binary until a character the active block can
        // carry in one byte comes along.
        if snapshot == 0 || (len > 1 && self.in_block(cp)) {
            self.binary.truncate(snapshot);
            self.flush_binary()?;
            self.encode_char(cp)?;
        }
        Ok(())
    }

    fn observe_block(&mut self, cp: u32) -> io::Result<()> {
        if self.block_detected {
            return Ok(());
        }
        let block = cp & !(BLOCK_SIZE - 1);
        if block != 0 && self.prev_block == Some(block) {
            debug!(
                "Codepage detected: U+{:04X}..U+{:04X} at input offset {}",
                block,
                block + BLOCK_SIZE - 1,
                self.stats.input_bytes
            );
            if self.block != block {
                self.emit(Unit::SwitchBlock(block))?;
            }
            self.block = block;
            self.block_detected = true;
        }
        self.prev_block = Some(block);
        Ok(())
    }

    fn in_block(&self, cp: u32) -> bool {
        cp >= self.block && cp < self.block + BLOCK_SIZE
    }

    fn encode_char(&mut self, cp: u32) -> io::Result<()> {
        let unit = if cp < 0x80 {
            let byte = cp as u8;
            if needs_escape(byte, self.format) {
                Unit::Escaped(byte)
            } else {
                Unit::Literal(byte)
            }
        } else if self.in_block(cp) {
            Unit::InBlock((cp - self.block) as u8)
        } else if cp < 0x800 {
            Unit::Char(cp)
        } else {
            let slot = char_slot(cp);
            match self.chars.get(slot) {
                Some(occupant) if occupant == cp => Unit::CharRef(slot),
                Some(_) => Unit::Char(cp),
                None => {
                    self.chars.insert(cp);
                    Unit::CharLearn(cp)
                }
            }
        };
        self.emit(unit)
    }

    fn push_word_byte(&mut self, byte: u8) -> io::Result<()> {
        if !self.spilled && self.word.len() < MAX_WORD_LEN {
            self.word.push(byte);
            return Ok(());
        }
        // Too long to ever be stored: spell the rest of the run out.
        if !self.spilled {
            self.spell_word()?;
            self.spilled = true;
        }
        self.emit(Unit::Literal(byte))
    }

    fn finish_word(&mut self) -> io::Result<()> {
        self.spilled = false;
        if self.word.is_empty() {
            return Ok(());
        }
        // The pending letters must be the whole run the decoder will see.
        let slot = match self.tracker.eligible() {
            Some(run) if run == self.word.as_slice() => self.words.find(run),
            _ => None,
        };
        match slot {
            Some(slot) => {
                self.word.clear();
                self.emit(Unit::WordRef(slot))
            }
            None => self.spell_word(),
        }
    }

    fn spell_word(&mut self) -> io::Result<()> {
        let word = std::mem::take(&mut self.word);
        for &byte in &word {
            self.emit(Unit::Literal(byte))?;
        }
        self.word = word;
        self.word.clear();
        Ok(())
    }

    fn flush_binary(&mut self) -> io::Result<()> {
        if self.binary.is_empty() {
            return Ok(());
        }
        self.stats.record(&Unit::Binary(self.binary.len()));
        self.stats.binary_bytes += self.binary.len() as u64;
        self.out.write_binary(&self.binary)?;
        self.binary.clear();
        Ok(())
    }

    fn emit(&mut self, unit: Unit) -> io::Result<()> {
        self.stats.record(&unit);
        self.out.write_unit(unit)
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.push_byte(byte)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.get_mut().flush()
    }
}

fn log_unit_diagnostics(stats: &EncodeStats) {
    if stats.input_bytes == 0 {
        return;
    }
    let coded = stats.literals + stats.escapes + stats.in_block + stats.explicit_chars
        + stats.char_refs + stats.word_refs;
    let word_ref_bytes = stats.word_refs as i64 * unit_len(&Unit::WordRef(0)) as i64;
    debug!(
        "Unit diagnostics: {} units | {} in-block | {} explicit | {} char refs | \
         {} word refs ({} B) | {} binary runs ({} B) | {} -> {} bytes ({:.3})",
        coded, stats.in_block, stats.explicit_chars, stats.char_refs,
        stats.word_refs, word_ref_bytes, stats.binary_runs, stats.binary_bytes,
        stats.input_bytes, stats.output_bytes, stats.ratio()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_with(input: &[u8], options: Options) -> Vec<u8> {
        let mut enc = Encoder::new(Vec::new(), options);
        enc.write_all(input).unwrap();
        enc.finish().unwrap().0
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(encode_with(b"", Options::default()).is_empty());
    }

    #[test]
    fn reserved_ascii_is_escaped() {
        assert_eq!(encode_with(b"ab\x1Fc", Options::proto1()), b"~1ab\x1C\x1Fc");
        assert_eq!(encode_with(b"\x1A", Options::proto1()), b"~1\x1A");
        assert_eq!(encode_with(b"\x1A", Options::default()), b"~2\x1C\x1A");
    }

    #[test]
    fn cyrillic_switches_block() {
        // д is sent explicitly, а confirms the block and is sent as one byte.
        let out = encode_with("да".as_bytes(), Options::proto1());
        assert_eq!(out, [b'~', b'1', 0x12, 0x34, 0x16, 0x00, 0x08, 0xB0]);
    }

    #[test]
    fn cjk_claims_then_references_char_slot() {
        let out = encode_with("中a中".as_bytes(), Options::proto1());
        assert_eq!(out, [b'~', b'1', 0x17, 0x4E, 0x2D, b'a', 0x0E, 0x5B]);

        let out = encode_with("中中".as_bytes(), Options::proto1());
        assert_eq!(out, [b'~', b'1', 0x17, 0x4E, 0x2D, 0x16, 0x00, 0x9C, 0xAD]);
    }

    #[test]
    fn latin1_default_block() {
        assert_eq!(encode_with("é".as_bytes(), Options::proto1()), [b'~', b'1', 0xE9]);
    }

    #[test]
    fn binary_absorbs_following_ascii() {
        let out = encode_with(b"\xFFabcde", Options::proto1());
        assert_eq!(out, [b'~', b'1', 0x1D, 0x20, 0xFF, b'a', b'b', b'c', b'd', b'e']);
    }

    #[test]
    fn in_block_char_ends_binary_run() {
        let out = encode_with(b"\xFF\xC3\xA9", Options::proto1());
        assert_eq!(out, [b'~', b'1', 0x1C, 0xFF, 0xE9]);
    }

    #[test]
    fn repeated_word_becomes_reference() {
        let slot = crate::model::word_slot(b"the");
        let out = encode_with(b"the the the", Options::default());
        assert_eq!(out, [b'~', b'2', b't', b'h', b'e', b' ', 0x1A, slot, b' ', 0x1A, slot]);
    }

    #[test]
    fn long_letter_runs_are_spelled() {
        let run = vec![b'z'; MAX_WORD_LEN + 3];
        let mut input = run.clone();
        input.push(b' ');
        input.extend_from_slice(&run);
        let out = encode_with(&input, Options::default());
        let mut expected = b"~2".to_vec();
        expected.extend_from_slice(&input);
        assert_eq!(out, expected);
    }

    #[test]
    fn chunking_does_not_change_output() {
        let input = "Съешь же ещё этих мягких французских булок the the 😀".as_bytes();
        let whole = encode_with(input, Options::default());
        let mut enc = Encoder::new(Vec::new(), Options::default());
        for chunk in input.chunks(3) {
            enc.write_all(chunk).unwrap();
        }
        assert_eq!(enc.finish().unwrap().0, whole);
    }

    #[test]
    fn stats_track_sizes() {
        let mut enc = Encoder::new(Vec::new(), Options::default());
        enc.write_all(b"word word").unwrap();
        let (out, stats) = enc.finish().unwrap();
        assert_eq!(stats.input_bytes, 9);
        assert_eq!(stats.output_bytes, out.len() as u64);
        assert_eq!(stats.word_refs, 1);
    }
}
