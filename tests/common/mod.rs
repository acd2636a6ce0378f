//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use xz2::write::XzEncoder;

/// Deterministic pseudo-random bytes (numerical recipes LCG).
pub fn lcg_bytes(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}

/// Mixed-script text exercising blocks, char slots and words.
pub fn sample_text() -> String {
    [
        "The quick brown fox jumps over the lazy dog, and the dog sleeps.\n",
        "Съешь же ещё этих мягких французских булок, да выпей же чаю.\n",
        "日本語のテキストと中文文本混在。中文文本再次出现。\n",
        "Ελληνικά γράμματα και emoji 😀🎉 between words.\n",
        "the the the international international internationalization\n",
    ]
    .concat()
}

/// Write `contents` xz-compressed as `dir/name`.
pub fn write_xz_sample(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).expect("Failed to create sample");
    let mut encoder = XzEncoder::new(file, 6);
    encoder.write_all(contents).expect("Failed to write sample");
    encoder.finish().expect("Failed to finish sample");
    path
}
