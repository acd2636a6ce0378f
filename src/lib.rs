// src/lib.rs
//! textfold: a reversible filter that makes UTF-8 text more compressible
//! by LZMA and friends.
pub mod opcode;
pub mod utf8;
pub mod model;
pub mod unitwriter;
pub mod unitreader;
pub mod encoder;
pub mod decoder;
pub mod error;
pub mod harness;
pub mod corpus;

use std::io::{self, Read, Write};

pub use decoder::{decode_stream, DecodeStats};
pub use encoder::{EncodeStats, Encoder, Options};
pub use error::{Result, TextfoldError};
pub use opcode::Format;

const COPY_CHUNK: usize = 64 * 1024;

/// Stream layout:
///   Bytes 0..2:   `~` and the format byte (`1` prototype, `2` with words)
///   Bytes 2..:    coded units, see `opcode`
/// The empty input encodes to the empty stream.
///
/// Every input is encodable, and writing into a `Vec` cannot fail, so this
/// never returns `Err`.
pub fn encode(input: &[u8]) -> Result<Vec<u8>> {
    encode_with(input, Options::default())
}

pub fn encode_with(input: &[u8], options: Options) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::with_capacity(input.len() + 2), options);
    encoder.write_all(input)?;
    let (output, _) = encoder.finish()?;
    Ok(output)
}

pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len());
    decode_stream(input, &mut output)?;
    Ok(output)
}

/// Encode everything `input` yields into `output`.
pub fn encode_stream<R: Read, W: Write>(
    mut input: R,
    output: W,
    options: Options,
) -> Result<EncodeStats> {
    let mut encoder = Encoder::new(output, options);
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        encoder.write_all(&buf[..n])?;
    }
    let (_, stats) = encoder.finish()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_accepts_every_byte_value() {
        let all: Vec<u8> = (0u8..=255).collect();
        for options in [Options::default(), Options::proto1()] {
            for byte in 0u8..=255 {
                assert!(encode_with(&[byte], options).is_ok());
            }
            let encoded = encode_with(&all, options).unwrap();
            assert_eq!(decode(&encoded).unwrap(), all);
        }
    }
}
