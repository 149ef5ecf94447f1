use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong in a `zso` encode or decode pass.
///
/// Each variant corresponds to one taxonomy entry from the core design: I/O
/// faults keep the failing path, format faults describe what was wrong with
/// the header, and the two encoding constraints (`AlignmentOverflow`,
/// `InvalidBlockSize`/`InvalidLevel`) name the parameter a caller must change
/// to retry successfully.
#[derive(Error, Debug)]
pub enum ZsoError {
    #[error("cannot open input file {path}: {source}")]
    CannotOpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create output file {path}: {source}")]
    CannotCreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed ZSO header: {0}")]
    MalformedHeader(String),

    #[error("unsupported ZSO version {0} (only 0 and 1 are accepted)")]
    UnsupportedVersion(u8),

    #[error("block {0} failed to decompress to the expected block size")]
    BlockCorruption(u64),

    #[error(
        "alignment overflow at block {0}: compressed offset needs bit 31 for its own address; retry with a larger align"
    )]
    AlignmentOverflow(u64),

    #[error("invalid block size {0}: must be a positive multiple of 2048")]
    InvalidBlockSize(u32),

    #[error("invalid compression level {0}: encoder requires level >= 1")]
    InvalidLevel(u32),

    #[error("I/O error during {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ZsoError {
    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        ZsoError::Io { op, source }
    }
}

pub type Result<T> = std::result::Result<T, ZsoError>;
