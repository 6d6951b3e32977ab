use std::io::{self, ErrorKind, Read};

use crate::core::{ArchiveReader, ChecksumPolicy, Step};
use crate::error::{Result, TarError};
use crate::header::{padding_len, EntryMetadata, EntryType, BLOCK_SIZE};

/// Sync reader for ustar archives.
///
/// This is a frontend that wraps the sans-IO [`ArchiveReader`] core. Entries
/// are produced lazily, front to back, by [`TarReader::next_entry`].
pub struct TarReader<R: Read> {
    core: ArchiveReader,
    source: R,
    /// Unread content bytes of the entry handed out last.
    remaining: u64,
    /// Padding after that entry's content.
    padding: u64,
}

impl<R: Read> std::fmt::Debug for TarReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarReader")
            .field("core", &self.core)
            .field("remaining", &self.remaining)
            .field("padding", &self.padding)
            .finish_non_exhaustive()
    }
}

/// Read until `buf` is full or the source is exhausted, returning the bytes read.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TarError::SourceUnavailable(e)),
        }
    }
    Ok(filled)
}

impl<R: Read> TarReader<R> {
    /// Bind a reader to `source`. How checksum mismatches are treated has to be chosen
    /// explicitly, as real-world archives are not always conformant.
    pub fn new(source: R, policy: ChecksumPolicy) -> Self {
        TarReader {
            core: ArchiveReader::new(policy),
            source,
            remaining: 0,
            padding: 0,
        }
    }

    /// Release the source. Its position is wherever reading stopped.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Advance to the next entry, skipping whatever is left of the previous one.
    ///
    /// Returns `Ok(None)` once the end-of-archive marker has been read. After an
    /// error the reader yields `Ok(None)` from then on.
    pub fn next_entry(&mut self) -> Result<Option<Entry<'_, R>>> {
        if self.core.is_done() {
            return Ok(None);
        }

        match self.advance() {
            Ok(Some(meta)) => Ok(Some(Entry { meta, reader: self })),
            Ok(None) => Ok(None),
            Err(e) => {
                self.core.abort();
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<EntryMetadata>> {
        self.skip_current()?;

        loop {
            let block = self.read_block()?;

            match self.core.decode_block(&block)? {
                Step::End => {
                    self.consume_trailer();
                    return Ok(None);
                }
                Step::LongNameBody { len } => {
                    let mut body = vec![0u8; len as usize];
                    if read_full(&mut self.source, &mut body)? < body.len() {
                        return Err(TarError::TruncatedArchive);
                    }
                    self.skip(padding_len(len))?;
                    self.core.long_name_body(&body)?;
                }
                Step::Entry(meta) => {
                    self.remaining = meta.content_len();
                    self.padding = padding_len(self.remaining);
                    tracing::debug!(name = %meta.name, entry_type = ?meta.entry_type, size = meta.size, "reading entry");
                    return Ok(Some(meta));
                }
            }
        }
    }

    fn read_block(&mut self) -> Result<[u8; BLOCK_SIZE]> {
        let mut block = [0u8; BLOCK_SIZE];
        if read_full(&mut self.source, &mut block)? < BLOCK_SIZE {
            return Err(TarError::TruncatedArchive);
        }
        Ok(block)
    }

    /// The second zero block is read if it's there; its absence is fine.
    fn consume_trailer(&mut self) {
        let mut block = [0u8; BLOCK_SIZE];
        match read_full(&mut self.source, &mut block) {
            Ok(n) if n == BLOCK_SIZE && block.iter().all(|b| *b == 0) => {}
            Ok(n) => tracing::debug!(bytes = n, "archive ends with a single zero block"),
            Err(e) => tracing::debug!(error = %e, "could not read past end-of-archive marker"),
        }
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let skipped = io::copy(&mut (&mut self.source).take(n), &mut io::sink())
            .map_err(TarError::SourceUnavailable)?;
        if skipped < n {
            return Err(TarError::TruncatedArchive);
        }
        Ok(())
    }

    fn skip_current(&mut self) -> Result<()> {
        let n = self.remaining + self.padding;
        self.remaining = 0;
        self.padding = 0;
        self.skip(n)
    }

    fn read_content(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        loop {
            match self.source.read(&mut buf[..want]) {
                Ok(0) => return Err(TarError::TruncatedArchive),
                Ok(n) => {
                    self.remaining -= n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TarError::SourceUnavailable(e)),
            }
        }
    }
}

/// An entry of the archive, borrowed from the [`TarReader`] that produced it.
///
/// Reading from an `Entry` yields exactly its content bytes. Whatever is left
/// unread is skipped when the reader advances.
pub struct Entry<'a, R: Read> {
    meta: EntryMetadata,
    reader: &'a mut TarReader<R>,
}

impl<'a, R: Read> Entry<'a, R> {
    #[inline]
    pub fn metadata(&self) -> &EntryMetadata {
        &self.meta
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[inline]
    pub fn entry_type(&self) -> EntryType {
        self.meta.entry_type
    }

    /// Declared size from the header.
    #[inline]
    pub fn size(&self) -> u64 {
        self.meta.size
    }

    /// Content bytes not read yet.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.reader.remaining
    }

    pub(crate) fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader.read_content(buf)
    }

    /// Copy the rest of the content into memory.
    pub fn read_content(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.remaining().min(1024 * 1024) as usize);
        let mut buf = [0u8; 8 * 1024];
        loop {
            let n = self.read_chunk(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    pub fn into_metadata(self) -> EntryMetadata {
        self.meta
    }
}

impl<R: Read> Read for Entry<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_chunk(buf).map_err(io::Error::from)
    }
}

impl<R: Read> std::fmt::Debug for Entry<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("meta", &self.meta)
            .field("remaining", &self.reader.remaining)
            .finish()
    }
}
