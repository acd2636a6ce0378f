//! Fixed code vocabulary, known to both encoder and decoder.
//! Never transmitted (except the format byte, which goes in the stream header).
//! Single source of truth for lead bytes, operand widths and run limits.

/// Stream header: `~` followed by the format byte.
pub const MAGIC: u8 = b'~';
pub const HEADER_LEN: usize = 2;

/// Wire format selected by the encoder, recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Code-point folding only. Readable by the original prototype decoder.
    Proto1,
    /// Proto1 plus adaptive word references.
    #[default]
    Words,
}

impl Format {
    pub fn version_byte(self) -> u8 {
        match self {
            Format::Proto1 => b'1',
            Format::Words => b'2',
        }
    }

    pub fn from_version_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Format::Proto1),
            b'2' => Some(Format::Words),
            _ => None,
        }
    }

    pub fn has_words(self) -> bool {
        self == Format::Words
    }
}

/// One coded unit. Binary payload bytes are not units; they follow a
/// `Binary` header verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// ASCII byte passed through unchanged.
    Literal(u8),
    /// Reserved ASCII byte, written as a one-byte binary run.
    Escaped(u8),
    /// Code point at this offset from the active block start.
    InBlock(u8),
    /// Explicit code point, no char-table update.
    Char(u32),
    /// Explicit 3/4-byte code point that claims its char-table slot.
    CharLearn(u32),
    /// Char-table slot reference.
    CharRef(u8),
    /// Switch the active block to this start.
    SwitchBlock(u32),
    /// Binary run header.
    Binary(usize),
    /// Word-table slot reference.
    WordRef(u8),
}

// ── Lead bytes ────────────────────────────────────────────────────────────────
pub const LEAD_CHAR2_FIRST: u8 = 0x0E;
pub const LEAD_CHAR2_LAST:  u8 = 0x15;
pub const LEAD_CHAR3:       u8 = 0x16;
pub const LEAD_CHAR3_LEARN: u8 = 0x17;
pub const LEAD_CHAR4:       u8 = 0x18;
pub const LEAD_CHAR4_LEARN: u8 = 0x19;
pub const LEAD_WORD_REF:    u8 = 0x1A;
pub const LEAD_BIN_FIRST:   u8 = 0x1C;
pub const LEAD_BIN_LAST:    u8 = 0x1F;
pub const LEAD_IN_BLOCK:    u8 = 0x80;

// ── Binary run limits ─────────────────────────────────────────────────────────
/// Runs up to this length cost a single header byte.
pub const BIN_SHORT_MAX: usize = 4;
/// Runs up to this length cost two header bytes.
pub const BIN_MEDIUM_MAX: usize = 388;
/// Longest run a single header can describe (three header bytes).
pub const BIN_LONG_MAX: usize = 2436;
/// The encoder flushes its binary buffer once it reaches this size.
pub const BIN_FLUSH_AT: usize = 2400;

/// Medium-run length operands live in printable ASCII.
pub const BIN_MEDIUM_OPERAND_FIRST: u8 = 0x20;
pub const BIN_MEDIUM_OPERAND_LAST:  u8 = 0x7F;

// ── Code point ranges ─────────────────────────────────────────────────────────
pub const BLOCK_SIZE: u32 = 0x80;
pub const DEFAULT_BLOCK: u32 = 0x80; // Latin-1 supplement
pub const MAX_CODE_POINT: u32 = 0x1F_FFFF;

/// True if an ASCII byte collides with a lead byte and must be escaped.
pub fn needs_escape(byte: u8, format: Format) -> bool {
    match byte {
        LEAD_CHAR2_FIRST..=LEAD_CHAR4_LEARN | LEAD_BIN_FIRST..=LEAD_BIN_LAST => true,
        LEAD_WORD_REF => format.has_words(),
        _ => false,
    }
}

/// Operand bytes following a lead byte in `Idle`, or None for single-byte units.
pub fn operand_len(lead: u8, format: Format) -> Option<usize> {
    match lead {
        LEAD_CHAR2_FIRST..=LEAD_CHAR2_LAST => Some(1),
        LEAD_CHAR3 | LEAD_CHAR3_LEARN => Some(2),
        LEAD_CHAR4 | LEAD_CHAR4_LEARN => Some(3),
        LEAD_WORD_REF if format.has_words() => Some(1),
        LEAD_BIN_FIRST..=LEAD_BIN_LAST => Some(1),
        _ => None,
    }
}

/// Header bytes needed for a binary run of `len` bytes.
pub fn binary_header_len(len: usize) -> usize {
    match len {
        0 => 0,
        1..=BIN_SHORT_MAX => 1,
        len if len <= BIN_MEDIUM_MAX => 2,
        _ => 3,
    }
}

/// Encoded size of a unit in bytes (binary payload excluded).
pub fn unit_len(unit: &Unit) -> usize {
    match unit {
        Unit::Literal(_) | Unit::InBlock(_) => 1,
        Unit::Escaped(_) | Unit::CharRef(_) | Unit::WordRef(_) => 2,
        Unit::Char(cp) | Unit::CharLearn(cp) => match *cp {
            0..=0x7FF => 2,
            0x800..=0xFFFF => 3,
            _ => 4,
        },
        Unit::SwitchBlock(_) => 3,
        Unit::Binary(len) => binary_header_len(*len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_lead_is_reserved_only_with_words() {
        assert!(needs_escape(LEAD_WORD_REF, Format::Words));
        assert!(!needs_escape(LEAD_WORD_REF, Format::Proto1));
        assert_eq!(operand_len(LEAD_WORD_REF, Format::Proto1), None);
        assert!(!needs_escape(0x1B, Format::Words));
        assert!(!needs_escape(b'\n', Format::Words));
    }

    #[test]
    fn binary_header_sizes() {
        assert_eq!(binary_header_len(4), 1);
        assert_eq!(binary_header_len(5), 2);
        assert_eq!(binary_header_len(388), 2);
        assert_eq!(binary_header_len(389), 3);
        assert_eq!(binary_header_len(BIN_LONG_MAX), 3);
    }
}
