//! Sans-IO parsing primitives for ustar headers.
//!
//! These functions work on byte slices without any I/O traits; the frontends in
//! [`crate::sync`] feed them blocks read from a byte source.

use std::borrow::Cow;

use crate::encode::checksum;
use crate::error::{Result, TarError};
use crate::header::{is_zero_block, layout, trim_nul, EntryMetadata, EntryType, BLOCK_SIZE};

/// Outcome of decoding a single header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// An all-zero block, marking the end of the archive.
    EndMarker,
    Header(EntryMetadata),
}

// ============================================================================
// FIELD DECODERS
// ============================================================================

/// Decode an octal numeric field.
///
/// Leading spaces are skipped, then digits are read up to the first NUL or space.
/// Whatever follows that terminator is ignored, as plenty of archives in the wild
/// leave junk there. An empty field decodes to 0.
pub fn decode_octal(field: &[u8]) -> Result<u64> {
    let start = field
        .iter()
        .position(|b| *b != b' ')
        .unwrap_or(field.len());
    let digits = &field[start..];
    let end = digits
        .iter()
        .position(|b| *b == 0 || *b == b' ')
        .unwrap_or(digits.len());

    digits[..end].iter().try_fold(0u64, |acc, &b| {
        if !(b'0'..=b'7').contains(&b) {
            return Err(TarError::InvalidOctalField(b));
        }
        acc.checked_mul(8)
            .map(|v| v + u64::from(b - b'0'))
            .ok_or(TarError::InvalidOctalField(b))
    })
}

fn decode_text(field: &[u8]) -> Cow<'_, str> {
    let bytes = trim_nul(field);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let lossy = String::from_utf8_lossy(bytes);
            tracing::warn!(name = %lossy, "header text field is not valid UTF-8");
            lossy
        }
    }
}

/// Decode the name of a GNU long-name body: the bytes up to the first NUL.
pub(crate) fn decode_long_name(body: &[u8]) -> String {
    decode_text(body).into_owned()
}

// ============================================================================
// CHECKSUM
// ============================================================================

/// Verify the stored checksum against both the unsigned and the signed byte sum.
pub fn verify_checksum(block: &[u8; BLOCK_SIZE]) -> Result<()> {
    let stored = decode_octal(&block[layout::CHECKSUM])?;
    let (unsigned, signed) = checksum(block);

    if stored == unsigned || (signed >= 0 && stored == signed as u64) {
        Ok(())
    } else {
        Err(TarError::BadChecksum {
            stored,
            unsigned,
            signed,
        })
    }
}

// ============================================================================
// HEADER DECODERS
// ============================================================================

/// Decode a header block, verifying its checksum.
pub fn decode_header(block: &[u8; BLOCK_SIZE]) -> Result<Decoded> {
    if is_zero_block(block) {
        return Ok(Decoded::EndMarker);
    }
    verify_checksum(block)?;
    decode_header_unchecked(block)
}

/// Decode a header block without looking at its checksum.
pub fn decode_header_unchecked(block: &[u8; BLOCK_SIZE]) -> Result<Decoded> {
    if is_zero_block(block) {
        return Ok(Decoded::EndMarker);
    }

    let mut name = decode_text(&block[layout::NAME]).into_owned();
    if block[layout::MAGIC].starts_with(b"ustar") {
        let prefix = decode_text(&block[layout::PREFIX]);
        if !prefix.is_empty() {
            name = format!("{}/{}", prefix, name);
        }
    }

    // 8-byte fields hold at most 8 octal digits, well within u32.
    let meta = EntryMetadata {
        name,
        size: decode_octal(&block[layout::SIZE])?,
        mtime: Some(decode_octal(&block[layout::MTIME])?),
        entry_type: EntryType::from_byte(block[layout::TYPEFLAG]),
        mode: decode_octal(&block[layout::MODE])? as u32,
        uid: decode_octal(&block[layout::UID])? as u32,
        gid: decode_octal(&block[layout::GID])? as u32,
        owner_name: decode_text(&block[layout::UNAME]).into_owned(),
        group_name: decode_text(&block[layout::GNAME]).into_owned(),
        link_name: decode_text(&block[layout::LINKNAME]).into_owned(),
    };

    tracing::debug!(name = %meta.name, size = meta.size, entry_type = ?meta.entry_type, "decoded header");

    Ok(Decoded::Header(meta))
}
