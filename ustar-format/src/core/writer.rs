//! Sans-IO archive writer state machine.
//!
//! `ArchiveWriter` produces the header and trailer bytes of an archive and
//! tracks how far the archive has grown. Frontends write those bytes, the
//! entry content and the padding to their sink.

use crate::clock::{Clock, SystemClock};
use crate::encode::encode_header;
use crate::error::{Result, TarError};
use crate::header::{padding_len, EntryMetadata, BLOCK_SIZE, MAX_NAME_LEN, ZERO_BLOCK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Open,
    Finished,
    /// An entry was left incomplete in the sink; the archive cannot be continued.
    Failed,
}

/// Sans-IO archive writer state machine.
///
/// # Example
///
/// ```ignore
/// let mut writer = ArchiveWriter::new();
///
/// // Header blocks (and a GNU long-name preamble, if needed)
/// let preamble = writer.begin_entry(&EntryMetadata::file("hello.txt", 5))?;
/// // Frontend writes preamble, then 5 content bytes, then the padding...
/// let padding = ArchiveWriter::padding(5);
///
/// // End-of-archive marker
/// let trailer = writer.finish()?;
/// ```
#[derive(Debug)]
pub struct ArchiveWriter<C = SystemClock> {
    clock: C,
    state: WriterState,
    /// Bytes the frontend has been told to emit so far.
    position: u64,
}

impl ArchiveWriter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for ArchiveWriter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ArchiveWriter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            state: WriterState::Open,
            position: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> WriterState {
        self.state
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == WriterState::Finished
    }

    /// Archive length once the frontend has written everything handed out so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    fn ensure_open(&self) -> Result<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Finished => Err(TarError::WriterAlreadyFinished),
            WriterState::Failed => Err(TarError::WriterFailed),
        }
    }

    /// Mark the archive as broken after the frontend failed to emit an entry or
    /// the trailer in full.
    ///
    /// Every later call fails with [`TarError::WriterFailed`].
    pub fn fail(&mut self) {
        self.state = WriterState::Failed;
    }

    /// Encode everything that precedes the content of `meta`.
    ///
    /// Names longer than the header's name field are carried by a GNU `'L'`
    /// entry whose content is the full name; the real header then holds a
    /// truncated copy. The frontend must follow the returned bytes with exactly
    /// `meta.content_len()` content bytes and [`ArchiveWriter::padding`].
    pub fn begin_entry(&mut self, meta: &EntryMetadata) -> Result<Vec<u8>> {
        self.ensure_open()?;

        let mut out = Vec::with_capacity(BLOCK_SIZE);

        if meta.name.len() > MAX_NAME_LEN && !meta.name.as_bytes().contains(&0) {
            let mut body = meta.name.as_bytes().to_vec();
            body.push(0);
            let body_len = body.len() as u64;

            let marker = EntryMetadata::long_name_marker(body_len);
            out.extend_from_slice(encode_header(&marker, &self.clock)?.as_bytes());
            out.extend_from_slice(&body);
            out.extend_from_slice(Self::padding(body_len));

            let short = EntryMetadata {
                name: truncate_name(&meta.name).to_string(),
                ..meta.clone()
            };
            out.extend_from_slice(encode_header(&short, &self.clock)?.as_bytes());

            tracing::debug!(name = %meta.name, "using GNU long name");
        } else {
            out.extend_from_slice(encode_header(meta, &self.clock)?.as_bytes());
        }

        let content_len = meta.content_len();
        self.position += out.len() as u64 + content_len + padding_len(content_len);

        Ok(out)
    }

    /// Zero bytes that follow `content_len` bytes of content.
    #[inline]
    pub fn padding(content_len: u64) -> &'static [u8] {
        &ZERO_BLOCK[..padding_len(content_len) as usize]
    }

    /// Close the archive, returning the end-of-archive marker.
    pub fn finish(&mut self) -> Result<[u8; 2 * BLOCK_SIZE]> {
        self.ensure_open()?;
        self.state = WriterState::Finished;
        self.position += 2 * BLOCK_SIZE as u64;
        Ok([0u8; 2 * BLOCK_SIZE])
    }
}

/// The longest prefix of `name` that fits the name field without splitting a character.
fn truncate_name(name: &str) -> &str {
    let mut end = MAX_NAME_LEN.min(name.len());
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
