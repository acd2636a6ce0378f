// src/unitwriter.rs
//! Writes coded units to a byte sink using the fixed code vocabulary.
//! Multi-byte operands are big-endian.

use std::io;

use bitstream_io::{BigEndian, ByteWrite, ByteWriter};

use crate::opcode::*;

pub struct UnitWriter<W: io::Write> {
    writer: ByteWriter<W, BigEndian>,
    written: u64,
}

impl<W: io::Write> UnitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ByteWriter::endian(inner, BigEndian),
            written: 0,
        }
    }

    /// Bytes emitted so far, header included.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.writer.writer()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_writer()
    }

    pub fn write_header(&mut self, format: Format) -> io::Result<()> {
        self.byte(MAGIC)?;
        self.byte(format.version_byte())
    }

    pub fn write_unit(&mut self, unit: Unit) -> io::Result<()> {
        match unit {
            Unit::Literal(byte) => self.byte(byte),
            Unit::Escaped(byte) => {
                self.byte(LEAD_BIN_FIRST)?;
                self.byte(byte)
            }
            Unit::InBlock(offset) => self.byte(LEAD_IN_BLOCK | offset),
            Unit::Char(cp) => match cp {
                0..=0x7FF => {
                    self.byte(LEAD_CHAR2_FIRST + (cp >> 8) as u8)?;
                    self.byte(cp as u8)
                }
                0x800..=0xFFFF => {
                    self.byte(LEAD_CHAR3)?;
                    self.u16(cp as u16)
                }
                _ => {
                    self.byte(LEAD_CHAR4)?;
                    self.u24(cp)
                }
            },
            Unit::CharLearn(cp) => {
                if cp <= 0xFFFF {
                    self.byte(LEAD_CHAR3_LEARN)?;
                    self.u16(cp as u16)
                } else {
                    self.byte(LEAD_CHAR4_LEARN)?;
                    self.u24(cp)
                }
            }
            Unit::CharRef(slot) => {
                self.byte(LEAD_CHAR2_FIRST)?;
                self.byte(slot)
            }
            Unit::SwitchBlock(start) => {
                self.byte(LEAD_CHAR3)?;
                self.u16((start / BLOCK_SIZE) as u16)
            }
            Unit::Binary(len) => self.binary_header(len),
            Unit::WordRef(slot) => {
                self.byte(LEAD_WORD_REF)?;
                self.byte(slot)
            }
        }
    }

    /// Write `payload` as binary runs. Runs longer than one header can
    /// describe are split.
    pub fn write_binary(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut rest = payload;
        while !rest.is_empty() {
            // A short run whose first byte is printable would read back as a
            // medium-length operand; pass that byte through as a literal.
            if rest.len() <= BIN_SHORT_MAX
                && (BIN_MEDIUM_OPERAND_FIRST..=BIN_MEDIUM_OPERAND_LAST).contains(&rest[0])
            {
                self.byte(rest[0])?;
                rest = &rest[1..];
                continue;
            }
            let (run, tail) = rest.split_at(rest.len().min(BIN_LONG_MAX));
            self.binary_header(run.len())?;
            self.bytes(run)?;
            rest = tail;
        }
        Ok(())
    }

    fn binary_header(&mut self, len: usize) -> io::Result<()> {
        match len {
            0 => Ok(()),
            1..=BIN_SHORT_MAX => self.byte(LEAD_BIN_FIRST - 1 + len as u8),
            len if len <= BIN_MEDIUM_MAX => {
                let len = len - (BIN_SHORT_MAX + 1);
                let rem = len % 4;
                self.byte(LEAD_BIN_FIRST + rem as u8)?;
                self.byte(BIN_MEDIUM_OPERAND_FIRST + (len / 4) as u8)
            }
            len if len <= BIN_LONG_MAX => {
                self.byte(LEAD_CHAR3_LEARN)?;
                self.u16((len - (BIN_MEDIUM_MAX + 1)) as u16)
            }
            len => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("binary run of {len} bytes exceeds {BIN_LONG_MAX}"),
            )),
        }
    }

    fn byte(&mut self, byte: u8) -> io::Result<()> {
        self.writer.write::<u8>(byte)?;
        self.written += 1;
        Ok(())
    }

    fn u16(&mut self, value: u16) -> io::Result<()> {
        self.writer.write::<u16>(value)?;
        self.written += 2;
        Ok(())
    }

    fn u24(&mut self, value: u32) -> io::Result<()> {
        self.byte((value >> 16) as u8)?;
        self.u16(value as u16)
    }

    fn bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_bytes(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }
}
