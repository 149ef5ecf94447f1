//! ZSO decoding: header/index validation, per-block positioned fetch, LZ4
//! decompression with the trailing-padding retry quirk, and the fatal
//! length check that guards against silent corruption.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt};
use lz4::block::decompress;

use crate::block_io::{read_at_most_at, read_exact_at};
use crate::error::{Result, ZsoError};
use crate::format::{unpack_index_entry, Header};
use crate::progress::DecodeProgress;

/// Decompresses `compressed` into exactly `block_size` bytes.
///
/// The stored compressed length is only an upper bound: alignment padding
/// can follow the real LZ4 payload at a block boundary with no sentinel of
/// its own. If decompression rejects the full slice, trailing bytes are
/// truncated one at a time and decompression retried, until either a clean
/// decode of `block_size` bytes is obtained or the slice runs out.
fn lz4_decompress_block(compressed: &[u8], block_size: usize) -> Result<Vec<u8>> {
    let mut len = compressed.len();
    loop {
        match decompress(&compressed[..len], Some(block_size as i32)) {
            Ok(data) => return Ok(data),
            Err(_) if len > 0 => len -= 1,
            Err(e) => return Err(ZsoError::io("lz4 decompress", e)),
        }
    }
}

/// Decodes a ZSO file from `src` into the original raw image, written to `dst`.
pub fn decode<R: Read + Seek, W: Write>(
    src: &mut R,
    dst: &mut W,
    progress: Option<&dyn DecodeProgress>,
) -> Result<()> {
    let mut header_bytes = [0u8; 24];
    src.read_exact(&mut header_bytes)
        .map_err(|e| ZsoError::io("read header", e))?;
    let header = Header::decode(&header_bytes)?;

    let total_block = header.total_block();
    let block_size = header.block_size as usize;

    tracing::debug!(
        total_bytes = header.total_bytes,
        block_size = header.block_size,
        total_block,
        align = header.align,
        version = header.version,
        "starting zso decode"
    );

    let mut index = Vec::with_capacity(total_block as usize + 1);
    for _ in 0..=total_block {
        let entry = src
            .read_u32::<LittleEndian>()
            .map_err(|e| ZsoError::io("read index entry", e))?;
        index.push(entry);
    }

    let file_len = src
        .seek(SeekFrom::End(0))
        .map_err(|e| ZsoError::io("seek to end of input", e))?;

    for i in 0..total_block {
        let (shifted, is_plain) = unpack_index_entry(index[i as usize]);
        let read_pos = u64::from(shifted) << header.align;

        let decoded = if is_plain {
            let mut raw = vec![0u8; block_size];
            read_exact_at(src, read_pos, &mut raw).map_err(|e| ZsoError::io("read block", e))?;
            raw
        } else {
            let (next_shifted, _) = unpack_index_entry(index[i as usize + 1]);
            let tentative_size = u64::from(next_shifted - shifted) << header.align;
            // The sentinel-derived size is only an upper bound: for the last
            // block especially, alignment padding can make it overshoot the
            // bytes the file actually has left. Clamp to what remains so the
            // read never spans past EOF; the shrink-retry below recovers the
            // real compressed length either way.
            let max_read_size = tentative_size.min(file_len.saturating_sub(read_pos));

            let raw = read_at_most_at(src, read_pos, max_read_size)
                .map_err(|e| ZsoError::io("read block", e))?;
            lz4_decompress_block(&raw, block_size)?
        };

        if decoded.len() != block_size {
            return Err(ZsoError::BlockCorruption(i));
        }

        dst.write_all(&decoded)
            .map_err(|e| ZsoError::io("write decoded block", e))?;

        if let Some(progress) = progress {
            progress.on_block(i, total_block);
        }
    }

    tracing::info!(total_block, "zso decode complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode, EncodeOptions};
    use std::io::Cursor;

    #[test]
    fn rejects_malformed_header() {
        let mut bytes = vec![0u8; 24];
        bytes[0..4].copy_from_slice(&0u32.to_le_bytes());
        let mut src = Cursor::new(bytes);
        let mut dst = Vec::new();
        let err = decode(&mut src, &mut dst, None).unwrap_err();
        assert!(matches!(err, ZsoError::MalformedHeader(_)));
    }

    #[test]
    fn decode_is_idempotent() {
        let data = vec![0x7Eu8; 2048 * 3];
        let mut src = Cursor::new(data.clone());
        let mut encoded = Cursor::new(Vec::new());
        encode(&mut src, &mut encoded, &EncodeOptions::default(), None).unwrap();
        let bytes = encoded.into_inner();

        let mut first = Vec::new();
        decode(&mut Cursor::new(bytes.clone()), &mut first, None).unwrap();
        let mut second = Vec::new();
        decode(&mut Cursor::new(bytes), &mut second, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, data);
    }

    #[test]
    fn tolerates_trailing_alignment_padding_between_blocks() {
        // Highly compressible blocks stay in the non-plain path, so their
        // stored length is derived from the next entry's offset. With
        // align = 1 every block starts on a 2-byte boundary, which can leave
        // a single pad byte counted as part of the previous block's
        // "compressed length" — the decoder must shrink-and-retry past it.
        let data = vec![0u8; 2048 * 3];
        let options = EncodeOptions {
            align_override: Some(1),
            ..EncodeOptions::default()
        };
        let mut src = Cursor::new(data.clone());
        let mut encoded = Cursor::new(Vec::new());
        encode(&mut src, &mut encoded, &options, None).unwrap();

        let mut decoded = Vec::new();
        encoded.set_position(0);
        decode(&mut encoded, &mut decoded, None).unwrap();
        assert_eq!(decoded, data);
    }
}
