//! The ustar header block layout and the logical view of an entry.

use std::ops::Range;

/// Size of a single archive block. Headers, content and padding are all aligned to it.
pub const BLOCK_SIZE: usize = 512;

/// Longest name that fits the header's own name field (one byte is kept for the NUL).
pub const MAX_NAME_LEN: usize = 99;

/// Name of the synthetic entry carrying a GNU long name.
pub const LONG_LINK_NAME: &str = "././@LongLink";

pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const DEFAULT_DIR_MODE: u32 = 0o755;
pub const DEFAULT_GROUP_NAME: &str = "users";

pub(crate) const MAGIC_BYTES: &[u8] = b"ustar\0";
pub(crate) const VERSION_BYTES: &[u8] = b" \0";

pub(crate) const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// Byte ranges of every field in a header block.
pub mod layout {
    use super::Range;

    pub const NAME: Range<usize> = 0..100;
    pub const MODE: Range<usize> = 100..108;
    pub const UID: Range<usize> = 108..116;
    pub const GID: Range<usize> = 116..124;
    pub const SIZE: Range<usize> = 124..136;
    pub const MTIME: Range<usize> = 136..148;
    pub const CHECKSUM: Range<usize> = 148..156;
    pub const TYPEFLAG: usize = 156;
    pub const LINKNAME: Range<usize> = 157..257;
    pub const MAGIC: Range<usize> = 257..263;
    pub const VERSION: Range<usize> = 263..265;
    pub const UNAME: Range<usize> = 265..297;
    pub const GNAME: Range<usize> = 297..329;
    pub const DEVMAJOR: Range<usize> = 329..337;
    pub const DEVMINOR: Range<usize> = 337..345;
    pub const PREFIX: Range<usize> = 345..500;
    pub const PAD: Range<usize> = 500..512;

    const FIELDS: [Range<usize>; 17] = [
        NAME,
        MODE,
        UID,
        GID,
        SIZE,
        MTIME,
        CHECKSUM,
        TYPEFLAG..TYPEFLAG + 1,
        LINKNAME,
        MAGIC,
        VERSION,
        UNAME,
        GNAME,
        DEVMAJOR,
        DEVMINOR,
        PREFIX,
        PAD,
    ];

    // Fields must tile the block exactly: contiguous, starting at 0, ending at BLOCK_SIZE.
    const _: () = {
        let mut i = 0;
        let mut end = 0;
        while i < FIELDS.len() {
            assert!(FIELDS[i].start == end);
            end = FIELDS[i].end;
            i += 1;
        }
        assert!(end == super::BLOCK_SIZE);
    };
}

/// A single raw 512-byte header block.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderBlock(pub(crate) [u8; BLOCK_SIZE]);

impl HeaderBlock {
    pub(crate) fn zeroed() -> HeaderBlock {
        HeaderBlock(ZERO_BLOCK)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        is_zero_block(&self.0)
    }
}

impl From<[u8; BLOCK_SIZE]> for HeaderBlock {
    fn from(bytes: [u8; BLOCK_SIZE]) -> Self {
        HeaderBlock(bytes)
    }
}

impl AsRef<[u8]> for HeaderBlock {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for HeaderBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HeaderBlock")
            .field(&String::from_utf8_lossy(trim_nul(&self.0[layout::NAME])))
            .finish()
    }
}

#[inline]
pub(crate) fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|b| *b == 0)
}

/// Bytes of a NUL-padded text field up to (not including) the first NUL.
pub(crate) fn trim_nul(field: &[u8]) -> &[u8] {
    match field.iter().position(|b| *b == 0) {
        Some(i) => &field[..i],
        None => field,
    }
}

/// Number of zero bytes following `size` content bytes up to the next block boundary.
#[inline]
pub fn padding_len(size: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    (block - size % block) % block
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Directory,
    /// GNU `'L'` entry whose content is the name of the entry that follows it.
    LongNameMarker,
    Other(u8),
}

impl EntryType {
    pub fn from_byte(b: u8) -> EntryType {
        match b {
            0 | b'0' => EntryType::File,
            b'5' => EntryType::Directory,
            b'L' => EntryType::LongNameMarker,
            c => EntryType::Other(c),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            EntryType::File => b'0',
            EntryType::Directory => b'5',
            EntryType::LongNameMarker => b'L',
            EntryType::Other(c) => c,
        }
    }

    /// Whether entries of this type are followed by `size` bytes of content in the archive.
    #[inline]
    pub fn has_content(self) -> bool {
        !matches!(self, EntryType::Directory)
    }
}

/// The logical, decoded view of a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub name: String,
    pub size: u64,
    /// Seconds since the Unix epoch. `None` lets the writer's clock decide.
    pub mtime: Option<u64>,
    pub entry_type: EntryType,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub owner_name: String,
    pub group_name: String,
    pub link_name: String,
}

impl EntryMetadata {
    pub fn file<S: Into<String>>(name: S, size: u64) -> EntryMetadata {
        EntryMetadata {
            name: name.into(),
            size,
            mtime: None,
            entry_type: EntryType::File,
            mode: DEFAULT_FILE_MODE,
            uid: 0,
            gid: 0,
            owner_name: String::new(),
            group_name: DEFAULT_GROUP_NAME.to_string(),
            link_name: String::new(),
        }
    }

    pub fn directory<S: Into<String>>(name: S) -> EntryMetadata {
        EntryMetadata {
            entry_type: EntryType::Directory,
            mode: DEFAULT_DIR_MODE,
            ..EntryMetadata::file(name, 0)
        }
    }

    pub(crate) fn long_name_marker(len: u64) -> EntryMetadata {
        EntryMetadata {
            entry_type: EntryType::LongNameMarker,
            mode: 0,
            mtime: Some(0),
            ..EntryMetadata::file(LONG_LINK_NAME, len)
        }
    }

    pub fn with_mtime(mut self, mtime: u64) -> EntryMetadata {
        self.mtime = Some(mtime);
        self
    }

    pub fn with_mode(mut self, mode: u32) -> EntryMetadata {
        self.mode = mode;
        self
    }

    pub fn with_group_name<S: Into<String>>(mut self, group_name: S) -> EntryMetadata {
        self.group_name = group_name.into();
        self
    }

    /// Bytes of content the archive stores after this entry's header, excluding padding.
    #[inline]
    pub fn content_len(&self) -> u64 {
        if self.entry_type.has_content() {
            self.size
        } else {
            0
        }
    }
}
