//! Reversibility and compression-gain harness.
//!
//! For every `*.xz` sample under a directory:
//!   1. digest(original) must equal digest(decode(encode(original)))
//!   2. digest(encode(original)) must differ from it
//!   3. compress the original and the encoded stream with the same
//!      compressor and report the size delta
//!
//! Digest and compressor are injected, so the engine never links either.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::encoder::Options;
use crate::error::{Result, TextfoldError};

/// SHA-256 of `"test\n"`.
const SELF_CHECK_DIGEST: &str = "f2ca1bb6c7e907d06dafe4687e579fce76b37e4e93b7605022da52e6ccc26fd2";

/// liblzma's extreme flag (`xz -e`).
const LZMA_PRESET_EXTREME: u32 = 0x8000_0000;

pub const REPORT_HEADER: &str =
    "| Test sample                              | normal compression | compression after filter | delta  |\n\
     | ---------------------------------------- | ------------------ | ------------------------ | ------ |";

pub trait ContentHasher {
    fn name(&self) -> &str;
    /// Lowercase hex digest.
    fn digest(&self, data: &[u8]) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn name(&self) -> &str {
        "sha256"
    }

    fn digest(&self, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }
}

/// Refuse to run with a hasher that does not produce SHA-256 of a known input.
pub fn self_check(hasher: &dyn ContentHasher) -> Result<()> {
    let got = hasher.digest(b"test\n");
    if got != SELF_CHECK_DIGEST {
        return Err(TextfoldError::HasherSelfCheck { got });
    }
    Ok(())
}

pub trait Compressor {
    fn name(&self) -> String;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// In-process xz through liblzma.
#[derive(Debug, Clone, Copy)]
pub struct XzCompressor {
    pub preset: u32,
    pub extreme: bool,
}

impl Default for XzCompressor {
    /// Same settings as `xz -c -6e`.
    fn default() -> Self {
        Self { preset: 6, extreme: true }
    }
}

impl Compressor for XzCompressor {
    fn name(&self) -> String {
        format!("xz -{}{}", self.preset, if self.extreme { "e" } else { "" })
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let level = if self.extreme {
            self.preset | LZMA_PRESET_EXTREME
        } else {
            self.preset
        };
        let mut encoder = XzEncoder::new(Vec::new(), level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }
}

/// Any external program that compresses stdin to stdout, e.g. `brotli --best -c`.
#[derive(Debug, Clone)]
pub struct CommandCompressor {
    program: String,
    args: Vec<String>,
}

impl CommandCompressor {
    /// Split a command line on whitespace. No shell quoting.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Compressor for CommandCompressor {
    fn name(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| TextfoldError::Compressor(format!("cannot start {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TextfoldError::Compressor("stdin not captured".into()))?;
        // Feed stdin from another thread so a full stdout pipe cannot deadlock us.
        let input = data.to_vec();
        let feeder = thread::spawn(move || stdin.write_all(&input));

        let output = child.wait_with_output()?;
        feeder
            .join()
            .map_err(|_| TextfoldError::Compressor("stdin feeder panicked".into()))??;

        if !output.status.success() {
            return Err(TextfoldError::Compressor(format!(
                "{} exited with {}",
                self.name(),
                output.status
            )));
        }
        Ok(output.stdout)
    }
}

/// Digests of the three streams compared by the round-trip check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub expected: String,
    pub encoded: String,
    pub decoded: String,
}

pub fn verify_round_trip(
    sample: &str,
    data: &[u8],
    hasher: &dyn ContentHasher,
    options: Options,
) -> Result<Verification> {
    let encoded = crate::encode_with(data, options)?;
    let decoded = crate::decode(&encoded)?;

    let verification = Verification {
        expected: hasher.digest(data),
        encoded: hasher.digest(&encoded),
        decoded: hasher.digest(&decoded),
    };
    if verification.decoded != verification.expected {
        return Err(TextfoldError::RoundTripMismatch {
            sample: sample.to_owned(),
        });
    }
    if verification.encoded == verification.decoded {
        return Err(TextfoldError::FilterIdentity {
            sample: sample.to_owned(),
        });
    }
    debug!("{}: {} {}", sample, hasher.name(), verification.decoded);
    Ok(verification)
}

/// Compressed sizes of one sample with and without the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeReport {
    pub sample: String,
    pub normal: usize,
    pub filtered: usize,
}

impl SizeReport {
    /// Percentage change of the filtered size; negative means the filter helped.
    pub fn delta_percent(&self) -> f64 {
        if self.normal == 0 {
            return 0.0;
        }
        (self.filtered as f64 / self.normal as f64) * 100.0 - 100.0
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delta = self.delta_percent();
        write!(
            f,
            "| {:<40} | {:>18} | {:>24} | {}{:.2}% |",
            self.sample,
            self.normal,
            self.filtered,
            if delta >= 0.0 { "+" } else { "" },
            delta
        )
    }
}

pub fn measure(
    sample: &str,
    data: &[u8],
    compressor: &dyn Compressor,
    options: Options,
) -> Result<SizeReport> {
    let encoded = crate::encode_with(data, options)?;
    Ok(SizeReport {
        sample: sample.to_owned(),
        normal: compressor.compress(data)?.len(),
        filtered: compressor.compress(&encoded)?.len(),
    })
}

/// All `*.xz` files under `dir`, sorted by path.
pub fn discover_samples(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| TextfoldError::SampleRead {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "xz") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Decompressed contents of an `.xz` sample.
pub fn load_sample(path: &Path) -> Result<Vec<u8>> {
    let read = || -> std::io::Result<Vec<u8>> {
        let file = std::fs::File::open(path)?;
        let mut data = Vec::new();
        XzDecoder::new(file).read_to_end(&mut data)?;
        Ok(data)
    };
    read().map_err(|source| TextfoldError::SampleRead {
        path: path.to_path_buf(),
        source,
    })
}

pub fn sample_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Verify and measure every sample under `dir`, writing the report table.
/// Stops at the first sample that fails verification.
pub fn run_samples<W: Write>(
    dir: &Path,
    hasher: &dyn ContentHasher,
    compressor: &dyn Compressor,
    options: Options,
    mut out: W,
) -> Result<Vec<SizeReport>> {
    self_check(hasher)?;
    let samples = discover_samples(dir)?;
    info!(
        "{} samples under {} (compressor: {})",
        samples.len(),
        dir.display(),
        compressor.name()
    );

    writeln!(out, "{REPORT_HEADER}")?;
    let mut reports = Vec::with_capacity(samples.len());
    for path in &samples {
        let name = sample_name(path);
        let data = load_sample(path)?;
        verify_round_trip(&name, &data, hasher, options)?;
        let report = measure(&name, &data, compressor, options)?;
        if report.filtered > report.normal {
            warn!("{}: filter made the compressed sample larger", name);
        }
        writeln!(out, "{report}")?;
        reports.push(report);
    }
    out.flush()?;
    Ok(reports)
}
