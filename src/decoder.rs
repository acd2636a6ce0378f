//! Reconstructs the original bytes from a unit stream.
//!
//! Char table, active block and word table are rebuilt in lockstep with
//! the encoder from the bytes emitted so far.

use std::io::{Read, Write};

use crate::error::{Result, TextfoldError};
use crate::model::{is_word_byte, CharTable, WordTable, WordTracker, MAX_WORD_LEN};
use crate::opcode::{Format, Unit, DEFAULT_BLOCK};
use crate::unitreader::{Step, UnitReader};
use crate::utf8;

const FLUSH_AT: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub format: Option<Format>,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

struct Decoder<W: Write> {
    out: W,
    pending: Vec<u8>,
    format: Format,
    block: u32,
    chars: CharTable,
    words: WordTable,
    tracker: WordTracker,
    after_word_ref: bool,
    written: u64,
}

impl<W: Write> Decoder<W> {
    fn new(out: W, format: Format) -> Self {
        Self {
            out,
            pending: Vec::with_capacity(FLUSH_AT + 8),
            format,
            block: DEFAULT_BLOCK,
            chars: CharTable::default(),
            words: WordTable::default(),
            tracker: WordTracker::default(),
            after_word_ref: false,
            written: 0,
        }
    }

    fn apply(&mut self, unit: Unit, offset: u64) -> Result<()> {
        match unit {
            Unit::Literal(byte) | Unit::Escaped(byte) => self.emit(byte, offset),
            Unit::InBlock(index) => self.emit_char(self.block + index as u32, offset),
            Unit::Char(cp) => self.emit_char(cp, offset),
            Unit::CharLearn(cp) => {
                self.chars.insert(cp);
                self.emit_char(cp, offset)
            }
            Unit::CharRef(slot) => {
                let cp = self.chars.get(slot).ok_or_else(|| {
                    TextfoldError::malformed(offset, format!("char slot {slot} is empty"))
                })?;
                self.emit_char(cp, offset)
            }
            Unit::SwitchBlock(start) => {
                self.block = start;
                Ok(())
            }
            Unit::Binary(_) => Ok(()),
            Unit::WordRef(slot) => self.emit_word(slot, offset),
        }
    }

    fn emit_word(&mut self, slot: u8, offset: u64) -> Result<()> {
        if self.tracker.in_word() {
            return Err(TextfoldError::malformed(
                offset,
                "word reference continues a letter run",
            ));
        }
        let mut word = [0u8; MAX_WORD_LEN];
        let len = match self.words.get(slot) {
            Some(stored) => {
                word[..stored.len()].copy_from_slice(stored);
                stored.len()
            }
            None => {
                return Err(TextfoldError::malformed(
                    offset,
                    format!("word slot {slot} is empty"),
                ))
            }
        };
        for &byte in &word[..len] {
            self.emit(byte, offset)?;
        }
        self.after_word_ref = true;
        Ok(())
    }

    fn emit_char(&mut self, cp: u32, offset: u64) -> Result<()> {
        let mut buf = [0u8; 4];
        for &byte in utf8::encode_utf8(cp, &mut buf) {
            self.emit(byte, offset)?;
        }
        Ok(())
    }

    fn emit(&mut self, byte: u8, offset: u64) -> Result<()> {
        if self.format.has_words() {
            if is_word_byte(byte) {
                if self.after_word_ref {
                    return Err(TextfoldError::malformed(
                        offset,
                        "letters directly follow a word reference",
                    ));
                }
            } else {
                self.after_word_ref = false;
            }
            self.tracker.observe(byte, &mut self.words);
        }
        self.pending.push(byte);
        if self.pending.len() >= FLUSH_AT {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.write_all(&self.pending)?;
        self.written += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }

    fn finish(mut self) -> Result<u64> {
        self.flush()?;
        self.out.flush()?;
        Ok(self.written)
    }
}

/// Decode `input` into `output`.
///
/// Bytes are written as they are reconstructed; on error the output holds
/// a prefix of the original and the error says where decoding stopped.
pub fn decode_stream<R: Read, W: Write>(input: R, output: W) -> Result<DecodeStats> {
    let mut reader = UnitReader::new(input);
    let Some(format) = reader.read_header()? else {
        return Ok(DecodeStats::default());
    };

    let mut decoder = Decoder::new(output, format);
    while let Some(step) = reader.next_step()? {
        match step {
            Step::Unit(unit) => decoder.apply(unit, reader.unit_offset())?,
            Step::Payload(byte) => decoder.emit(byte, reader.offset())?,
        }
    }

    Ok(DecodeStats {
        format: Some(format),
        input_bytes: reader.offset(),
        output_bytes: decoder.finish()?,
    })
}
