//! Sans-IO encoding primitives for ustar headers.
//!
//! These functions write into fixed-size byte fields without any I/O traits.
//! Every field encoder fails instead of truncating when its value does not fit.

use crate::clock::Clock;
use crate::error::{Result, TarError};
use crate::header::{
    layout, EntryMetadata, HeaderBlock, BLOCK_SIZE, MAGIC_BYTES, MAX_NAME_LEN, VERSION_BYTES,
};

// ============================================================================
// FIELD ENCODERS
// ============================================================================

/// Encode `value` as `field.len() - 1` zero-padded octal digits followed by a NUL.
pub fn encode_octal(field: &mut [u8], value: u64) -> Result<()> {
    let width = field.len();
    if width == 0 {
        return Err(TarError::FieldOverflow { value, width });
    }

    let digits = width - 1;
    // 22 octal digits cover any u64.
    if digits < 22 && value >> (3 * digits) != 0 {
        return Err(TarError::FieldOverflow { value, width });
    }

    let mut rest = value;
    for slot in field[..digits].iter_mut().rev() {
        *slot = b'0' + (rest & 0o7) as u8;
        rest >>= 3;
    }
    field[digits] = 0;
    Ok(())
}

/// Copy `text` into a NUL-padded field, keeping room for at least one NUL.
fn encode_text(field: &mut [u8], text: &str) -> Result<()> {
    let bytes = text.as_bytes();
    if bytes.len() >= field.len() || bytes.contains(&0) {
        return Err(TarError::InvalidName(text.to_string()));
    }
    field[..bytes.len()].copy_from_slice(bytes);
    field[bytes.len()..].fill(0);
    Ok(())
}

/// Check that `name` can be stored directly in the header's name field.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.as_bytes().contains(&0) {
        return Err(TarError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ============================================================================
// CHECKSUM
// ============================================================================

/// Byte sums of a header block with the checksum field read as eight ASCII spaces.
///
/// Returns the unsigned sum and the sum of the bytes interpreted as `i8`, since some
/// historical writers computed the latter.
pub fn checksum(block: &[u8; BLOCK_SIZE]) -> (u64, i64) {
    block
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if layout::CHECKSUM.contains(&i) {
                b' '
            } else {
                *b
            }
        })
        .fold((0u64, 0i64), |(unsigned, signed), b| {
            (unsigned + u64::from(b), signed + i64::from(b as i8))
        })
}

// ============================================================================
// HEADER ENCODER
// ============================================================================

/// Encode `meta` into a header block. The checksum is written last.
///
/// `clock` supplies the modification time when `meta.mtime` is `None`.
pub fn encode_header<C: Clock + ?Sized>(meta: &EntryMetadata, clock: &C) -> Result<HeaderBlock> {
    validate_name(&meta.name)?;

    let mut header = HeaderBlock::zeroed();
    let block = &mut header.0;

    encode_text(&mut block[layout::NAME], &meta.name)?;
    encode_octal(&mut block[layout::MODE], u64::from(meta.mode))?;
    encode_octal(&mut block[layout::UID], u64::from(meta.uid))?;
    encode_octal(&mut block[layout::GID], u64::from(meta.gid))?;
    encode_octal(&mut block[layout::SIZE], meta.size)?;
    let mtime = meta.mtime.unwrap_or_else(|| clock.now());
    encode_octal(&mut block[layout::MTIME], mtime)?;
    block[layout::TYPEFLAG] = meta.entry_type.as_byte();
    encode_text(&mut block[layout::LINKNAME], &meta.link_name)?;
    block[layout::MAGIC].copy_from_slice(MAGIC_BYTES);
    block[layout::VERSION].copy_from_slice(VERSION_BYTES);
    encode_text(&mut block[layout::UNAME], &meta.owner_name)?;
    encode_text(&mut block[layout::GNAME], &meta.group_name)?;

    let (sum, _) = checksum(block);
    encode_octal(&mut block[layout::CHECKSUM], sum)?;

    tracing::debug!(name = %meta.name, size = meta.size, mtime, checksum = sum, "encoded header");

    Ok(header)
}
