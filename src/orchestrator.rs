//! Opens the input and output files and drives one of them through the
//! encoder or decoder. Guarantees both handles are released on every exit
//! path and surfaces the first error raised, tagged with the failing path.

use std::fs::File;
use std::path::Path;

use crate::decoder;
use crate::encoder::{self, EncodeOptions};
use crate::error::{Result, ZsoError};
use crate::progress::{DecodeProgress, EncodeProgress};

/// Opens `src_path` and `dst_path` and encodes the former into the latter.
///
/// Both files are closed (via `Drop`) as soon as this function returns,
/// whether it returns `Ok` or an error.
pub fn run_encode(
    src_path: &Path,
    dst_path: &Path,
    options: &EncodeOptions,
    progress: Option<&dyn EncodeProgress>,
) -> Result<()> {
    let mut src = File::open(src_path).map_err(|source| ZsoError::CannotOpenInput {
        path: src_path.to_path_buf(),
        source,
    })?;
    let mut dst = File::create(dst_path).map_err(|source| ZsoError::CannotCreateOutput {
        path: dst_path.to_path_buf(),
        source,
    })?;

    encoder::encode(&mut src, &mut dst, options, progress)
}

/// Opens `src_path` and `dst_path` and decodes the former into the latter.
pub fn run_decode(
    src_path: &Path,
    dst_path: &Path,
    progress: Option<&dyn DecodeProgress>,
) -> Result<()> {
    let mut src = File::open(src_path).map_err(|source| ZsoError::CannotOpenInput {
        path: src_path.to_path_buf(),
        source,
    })?;
    let mut dst = File::create(dst_path).map_err(|source| ZsoError::CannotCreateOutput {
        path: dst_path.to_path_buf(),
        source,
    })?;

    decoder::decode(&mut src, &mut dst, progress)
}
