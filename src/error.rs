use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextfoldError {
    // --- Stream ---
    #[error("Malformed stream at byte offset {offset}: {reason}")]
    MalformedStream { offset: u64, reason: String },

    #[error("Incomplete token at byte offset {offset}: stream ended {missing} byte(s) short")]
    IncompleteToken { offset: u64, missing: usize },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    // --- Harness ---
    #[error("Failed to read sample {}: {source}", path.display())]
    SampleRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Reversibility test failed for {sample}")]
    RoundTripMismatch { sample: String },

    #[error("Filter left {sample} unchanged")]
    FilterIdentity { sample: String },

    #[error("Hasher self check failed: got {got}")]
    HasherSelfCheck { got: String },

    #[error("Compressor failed: {0}")]
    Compressor(String),
}

impl TextfoldError {
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::MalformedStream {
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TextfoldError>;
