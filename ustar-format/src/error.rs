use std::io;

/// Everything that can go wrong while encoding, writing or reading an archive.
#[derive(Debug, thiserror::Error)]
pub enum TarError {
    #[error("Invalid entry name `{0}` (must be non-empty, shorter than 100 bytes and free of NUL)")]
    InvalidName(String),

    #[error("Invalid octal field: unexpected byte 0x{0:02x}")]
    InvalidOctalField(u8),

    #[error("Value {value} does not fit in a {width}-byte octal field")]
    FieldOverflow { value: u64, width: usize },

    #[error("Header checksum mismatch (stored {stored}, computed {unsigned} unsigned / {signed} signed)")]
    BadChecksum {
        stored: u64,
        unsigned: u64,
        signed: i64,
    },

    #[error("Archive is truncated (the source ended inside a header, entry or padding).")]
    TruncatedArchive,

    #[error("Archive writer is already finished")]
    WriterAlreadyFinished,

    #[error("Archive writer failed while writing an entry; the archive is incomplete")]
    WriterFailed,

    #[error("Entry content ended early: expected {expected} bytes, got {actual}")]
    ContentLengthMismatch { expected: u64, actual: u64 },

    #[error("GNU long name of {0} bytes exceeds the supported maximum")]
    LongNameTooLarge(u64),

    #[error("Failed to write to archive sink")]
    SinkUnavailable(#[source] io::Error),

    #[error("Failed to read from archive source")]
    SourceUnavailable(#[source] io::Error),
}

impl From<TarError> for io::Error {
    fn from(e: TarError) -> Self {
        match e {
            TarError::SinkUnavailable(inner) | TarError::SourceUnavailable(inner) => inner,
            TarError::TruncatedArchive | TarError::ContentLengthMismatch { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, e)
            }
            TarError::InvalidName(_) | TarError::FieldOverflow { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, e)
            }
            TarError::WriterAlreadyFinished | TarError::WriterFailed => {
                io::Error::new(io::ErrorKind::Other, e)
            }
            TarError::InvalidOctalField(_)
            | TarError::BadChecksum { .. }
            | TarError::LongNameTooLarge(_) => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

pub type Result<T> = std::result::Result<T, TarError>;
