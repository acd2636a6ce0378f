// src/unitreader.rs
//! Reads a coded stream back into units.
//! Parsing only: table lookups and block state belong to the decoder.
//!
//! States: Idle → ReadingUnit → Idle, plus Payload while a binary run is
//! being copied. End of input is only clean in Idle.

use std::io;

use bitstream_io::{BigEndian, ByteRead, ByteReader};

use crate::error::{Result, TextfoldError};
use crate::opcode::*;

/// One parsed step of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Unit(Unit),
    /// A verbatim byte of the current binary run.
    Payload(u8),
}

pub struct UnitReader<R: io::Read> {
    reader: ByteReader<R, BigEndian>,
    format: Format,
    offset: u64,
    unit_offset: u64,
    remaining: usize,
    first_payload: Option<u8>,
}

impl<R: io::Read> UnitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: ByteReader::endian(inner, BigEndian),
            format: Format::default(),
            offset: 0,
            unit_offset: 0,
            remaining: 0,
            first_payload: None,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Offset of the lead byte of the last unit returned.
    pub fn unit_offset(&self) -> u64 {
        self.unit_offset
    }

    /// Consume the stream header. None means the stream is empty.
    pub fn read_header(&mut self) -> Result<Option<Format>> {
        let Some(magic) = self.read_byte()? else {
            return Ok(None);
        };
        if magic != MAGIC {
            return Err(TextfoldError::malformed(
                0,
                "not a preprocessed text stream (bad magic byte)",
            ));
        }
        let Some(version) = self.read_byte()? else {
            return Err(TextfoldError::malformed(1, "truncated stream header"));
        };
        let format = Format::from_version_byte(version).ok_or_else(|| {
            TextfoldError::malformed(1, format!("unknown format version 0x{version:02X}"))
        })?;
        self.format = format;
        Ok(Some(format))
    }

    pub fn next_step(&mut self) -> Result<Option<Step>> {
        if let Some(byte) = self.first_payload.take() {
            return Ok(Some(Step::Payload(byte)));
        }
        if self.remaining > 0 {
            let Some(byte) = self.read_byte()? else {
                return Err(TextfoldError::IncompleteToken {
                    offset: self.offset,
                    missing: self.remaining,
                });
            };
            self.remaining -= 1;
            return Ok(Some(Step::Payload(byte)));
        }

        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };
        self.unit_offset = self.offset - 1;
        let unit = match operand_len(lead, self.format) {
            None if lead >= LEAD_IN_BLOCK => Unit::InBlock(lead - LEAD_IN_BLOCK),
            None => Unit::Literal(lead),
            Some(_) => self.read_coded(lead)?,
        };
        Ok(Some(Step::Unit(unit)))
    }

    fn read_coded(&mut self, lead: u8) -> Result<Unit> {
        match lead {
            LEAD_CHAR2_FIRST..=LEAD_CHAR2_LAST => {
                let low = self.operand_u8(lead)?;
                let value = (((lead - LEAD_CHAR2_FIRST) as u32) << 8) | low as u32;
                // 0x00..0x7F is never a two-byte character, so it names a slot
                Ok(if value < 0x80 {
                    Unit::CharRef(value as u8)
                } else {
                    Unit::Char(value)
                })
            }
            LEAD_CHAR3 => {
                let value = self.operand_u16(lead)? as u32;
                if value >= 0x800 {
                    return Ok(Unit::Char(value));
                }
                let start = value * BLOCK_SIZE;
                if value == 0 || start + BLOCK_SIZE - 1 > MAX_CODE_POINT {
                    return Err(TextfoldError::malformed(
                        self.unit_offset,
                        format!("block switch to invalid start U+{start:04X}"),
                    ));
                }
                Ok(Unit::SwitchBlock(start))
            }
            LEAD_CHAR3_LEARN => {
                let value = self.operand_u16(lead)? as usize;
                if value >= 0x800 {
                    return Ok(Unit::CharLearn(value as u32));
                }
                let len = BIN_MEDIUM_MAX + 1 + value;
                self.remaining = len;
                Ok(Unit::Binary(len))
            }
            LEAD_CHAR4 | LEAD_CHAR4_LEARN => {
                let high = self.operand_u8(lead)? as u32;
                let low = self.operand_u16(lead)? as u32;
                let cp = (high << 16) | low;
                if !(0x1_0000..=MAX_CODE_POINT).contains(&cp) {
                    return Err(TextfoldError::malformed(
                        self.unit_offset,
                        format!("four-byte form carries out-of-range U+{cp:04X}"),
                    ));
                }
                Ok(if lead == LEAD_CHAR4 {
                    Unit::Char(cp)
                } else {
                    Unit::CharLearn(cp)
                })
            }
            LEAD_WORD_REF => Ok(Unit::WordRef(self.operand_u8(lead)?)),
            _ => {
                let short = (lead - (LEAD_BIN_FIRST - 1)) as usize;
                let operand = self.operand_u8(lead)?;
                if (BIN_MEDIUM_OPERAND_FIRST..=BIN_MEDIUM_OPERAND_LAST).contains(&operand) {
                    let len = (operand - (BIN_MEDIUM_OPERAND_FIRST - 1)) as usize * 4 + short;
                    self.remaining = len;
                    Ok(Unit::Binary(len))
                } else {
                    // the operand is already the first payload byte
                    self.first_payload = Some(operand);
                    self.remaining = short - 1;
                    Ok(Unit::Binary(short))
                }
            }
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.reader.read::<u8>() {
            Ok(byte) => {
                self.offset += 1;
                Ok(Some(byte))
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn operand_u8(&mut self, lead: u8) -> Result<u8> {
        self.read_byte()?.ok_or_else(|| self.truncated(lead))
    }

    fn operand_u16(&mut self, lead: u8) -> Result<u16> {
        match self.reader.read::<u16>() {
            Ok(value) => {
                self.offset += 2;
                Ok(value)
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(self.truncated(lead)),
            Err(e) => Err(e.into()),
        }
    }

    fn truncated(&self, lead: u8) -> TextfoldError {
        TextfoldError::malformed(
            self.unit_offset,
            format!("stream ends inside code 0x{lead:02X}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(input: &[u8]) -> Result<Vec<Step>> {
        let mut reader = UnitReader::new(input);
        reader.read_header()?;
        let mut out = Vec::new();
        while let Some(step) = reader.next_step()? {
            out.push(step);
        }
        Ok(out)
    }

    #[test]
    fn empty_stream_has_no_header() {
        let mut reader = UnitReader::new(&b""[..]);
        assert_eq!(reader.read_header().unwrap(), None);
    }

    #[test]
    fn short_binary_run_carries_first_byte_in_operand() {
        let got = steps(b"~1\x1D\xFFa").unwrap();
        assert_eq!(
            got,
            [Step::Unit(Unit::Binary(2)), Step::Payload(0xFF), Step::Payload(b'a')]
        );
    }

    #[test]
    fn medium_binary_run() {
        let got = steps(b"~1\x1D\x20\xFFabcde").unwrap();
        assert_eq!(got[0], Step::Unit(Unit::Binary(6)));
        assert_eq!(got.len(), 7);
    }

    #[test]
    fn word_lead_depends_on_format() {
        assert_eq!(steps(b"~1\x1A").unwrap(), [Step::Unit(Unit::Literal(0x1A))]);
        assert_eq!(steps(b"~2\x1A\x07").unwrap(), [Step::Unit(Unit::WordRef(7))]);
    }

    #[test]
    fn truncated_operand_is_malformed() {
        match steps(b"~1ab\x17\x4E") {
            Err(TextfoldError::MalformedStream { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_payload_is_incomplete() {
        match steps(b"~1\x1F\xFFab") {
            Err(TextfoldError::IncompleteToken { offset, missing }) => {
                assert_eq!(offset, 6);
                assert_eq!(missing, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_header() {
        assert!(matches!(
            steps(b"xy"),
            Err(TextfoldError::MalformedStream { offset: 0, .. })
        ));
        assert!(matches!(
            steps(b"~9"),
            Err(TextfoldError::MalformedStream { offset: 1, .. })
        ));
        assert!(matches!(
            steps(b"~"),
            Err(TextfoldError::MalformedStream { offset: 1, .. })
        ));
    }
}
