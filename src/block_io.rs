//! Positioned reads on the input, contiguous writes on the output, and
//! padding emission — the small amount of I/O plumbing shared by the
//! encoder and decoder.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Seeks to `pos` and reads exactly `buf.len()` bytes from `reader`.
pub fn read_exact_at<R: Read + Seek>(reader: &mut R, pos: u64, buf: &mut [u8]) -> io::Result<()> {
    reader.seek(SeekFrom::Start(pos))?;
    reader.read_exact(buf)
}

/// Seeks to `pos` and reads up to `max_len` bytes from `reader`, stopping
/// early at EOF instead of erroring. `max_len` is only ever an upper bound
/// on the real payload (alignment padding can inflate it), so callers that
/// need to recover the true length on their own must not use `read_exact`
/// here.
pub fn read_at_most_at<R: Read + Seek>(
    reader: &mut R,
    pos: u64,
    max_len: u64,
) -> io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(pos))?;
    let mut buf = Vec::new();
    reader.take(max_len).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Writes `len` copies of `byte` to `writer` in a single call.
pub fn write_padding<W: Write>(writer: &mut W, byte: u8, len: u64) -> io::Result<()> {
    if len == 0 {
        return Ok(());
    }
    let padding = vec![byte; len as usize];
    writer.write_all(&padding)
}
