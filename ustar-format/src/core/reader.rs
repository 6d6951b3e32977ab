//! Sans-IO archive reader state machine.
//!
//! `ArchiveReader` turns header blocks into [`Step`]s. It never touches the
//! byte source: the frontend reads blocks, feeds them in, and acts on the
//! step it gets back (yield an entry, fetch a long-name body, or stop).

use crate::error::{Result, TarError};
use crate::header::{EntryMetadata, EntryType, BLOCK_SIZE};
use crate::parse::{self, Decoded};

/// Upper bound on the size of a GNU long-name body.
pub const MAX_LONG_NAME_LEN: u64 = 64 * 1024;

/// What to do when a header's checksum doesn't match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumPolicy {
    /// Fail with [`TarError::BadChecksum`].
    Strict,
    /// Log a warning and use the header anyway.
    Warn,
}

/// What the frontend has to do after feeding a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// End of archive. Nothing further will be yielded.
    End,
    /// Read `len` bytes of long-name body (plus padding) and hand them to
    /// [`ArchiveReader::long_name_body`] before feeding the next block.
    LongNameBody { len: u64 },
    /// An entry whose `content_len()` bytes and padding follow in the source.
    Entry(EntryMetadata),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    AwaitingLongNameBody { len: u64 },
    /// A long name has been read; the next header is the entry it belongs to.
    AwaitingLongNamedEntry(String),
    Done,
}

/// Sans-IO archive reader state machine.
///
/// Errors are terminal: once a call fails, every later block yields [`Step::End`].
#[derive(Debug)]
pub struct ArchiveReader {
    policy: ChecksumPolicy,
    state: State,
}

impl ArchiveReader {
    pub fn new(policy: ChecksumPolicy) -> Self {
        Self {
            policy,
            state: State::Normal,
        }
    }

    #[inline]
    pub fn policy(&self) -> ChecksumPolicy {
        self.policy
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Feed the next header block.
    pub fn decode_block(&mut self, block: &[u8; BLOCK_SIZE]) -> Result<Step> {
        let state = std::mem::replace(&mut self.state, State::Done);

        let pending_name = match state {
            State::Done => return Ok(Step::End),
            State::AwaitingLongNameBody { len } => {
                tracing::error!(len, "header fed while a long-name body was expected");
                return Err(TarError::TruncatedArchive);
            }
            State::Normal => None,
            State::AwaitingLongNamedEntry(name) => Some(name),
        };

        let decoded = match parse::decode_header(block) {
            Err(TarError::BadChecksum {
                stored,
                unsigned,
                signed,
            }) if self.policy == ChecksumPolicy::Warn => {
                tracing::warn!(stored, unsigned, signed, "ignoring header checksum mismatch");
                parse::decode_header_unchecked(block)?
            }
            other => other?,
        };

        let mut meta = match decoded {
            Decoded::EndMarker => {
                if let Some(name) = pending_name {
                    tracing::error!(%name, "long name is not followed by an entry");
                    return Err(TarError::TruncatedArchive);
                }
                return Ok(Step::End);
            }
            Decoded::Header(meta) => meta,
        };

        if meta.entry_type == EntryType::LongNameMarker {
            if meta.size > MAX_LONG_NAME_LEN {
                return Err(TarError::LongNameTooLarge(meta.size));
            }
            if let Some(name) = pending_name {
                tracing::warn!(%name, "long name replaced by another long name");
            }
            self.state = State::AwaitingLongNameBody { len: meta.size };
            return Ok(Step::LongNameBody { len: meta.size });
        }

        if let Some(name) = pending_name {
            meta.name = name;
        }

        self.state = State::Normal;
        Ok(Step::Entry(meta))
    }

    /// Stop decoding. Used by frontends when the source fails.
    pub fn abort(&mut self) {
        self.state = State::Done;
    }

    /// Hand over the body announced by [`Step::LongNameBody`].
    pub fn long_name_body(&mut self, body: &[u8]) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::AwaitingLongNameBody { len } if len == body.len() as u64 => {
                self.state = State::AwaitingLongNamedEntry(parse::decode_long_name(body));
                Ok(())
            }
            _ => Err(TarError::TruncatedArchive),
        }
    }
}
