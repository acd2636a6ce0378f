//! Minimal UTF-8 helpers shared by both directions.
//!
//! Code points are plain `u32` rather than `char`: the filter must carry
//! surrogates and values up to 0x1FFFFF through unchanged, since they
//! re-encode to exactly the bytes they were read from.

/// Smallest code point each sequence length may carry; shorter values are overlong.
const MIN_CODE: [u32; 5] = [0, 0, 0x80, 0x800, 0x1_0000];

/// Sequence length announced by a lead byte, or None for continuation
/// bytes and leads of five or more bytes.
pub fn sequence_len(lead: u8) -> Option<usize> {
    match lead.leading_ones() {
        0 => Some(1),
        n @ 2..=4 => Some(n as usize),
        _ => None,
    }
}

/// Payload bits carried by the lead byte of a `len`-byte sequence.
pub fn lead_bits(lead: u8, len: usize) -> u32 {
    if len == 1 {
        lead as u32
    } else {
        (lead as u32) & (0x7F >> len)
    }
}

pub fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

pub fn is_shortest_form(cp: u32, len: usize) -> bool {
    cp >= MIN_CODE[len]
}

/// Shortest UTF-8 form of `cp` (which may exceed U+10FFFF), written into `buf`.
pub fn encode_utf8(cp: u32, buf: &mut [u8; 4]) -> &[u8] {
    let len = match cp {
        0..=0x7F => {
            buf[0] = cp as u8;
            1
        }
        0x80..=0x7FF => {
            buf[0] = 0xC0 | (cp >> 6) as u8;
            buf[1] = 0x80 | (cp & 0x3F) as u8;
            2
        }
        0x800..=0xFFFF => {
            buf[0] = 0xE0 | (cp >> 12) as u8;
            buf[1] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            buf[2] = 0x80 | (cp & 0x3F) as u8;
            3
        }
        _ => {
            buf[0] = 0xF0 | (cp >> 18) as u8;
            buf[1] = 0x80 | ((cp >> 12) & 0x3F) as u8;
            buf[2] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            buf[3] = 0x80 | (cp & 0x3F) as u8;
            4
        }
    };
    &buf[..len]
}
