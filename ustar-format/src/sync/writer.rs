use std::io::{ErrorKind, Read, Write};

use crate::clock::{Clock, SystemClock};
use crate::core::{ArchiveWriter, WriterState};
use crate::error::{Result, TarError};
use crate::header::EntryMetadata;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Sync writer for ustar archives.
///
/// This is a frontend that wraps the sans-IO [`ArchiveWriter`] core, bound to
/// a byte sink for its whole lifetime. [`TarWriter::finish`] must be called
/// before the sink is closed, or the archive lacks its end-of-archive marker.
///
/// Dropping an unfinished writer only logs a warning. Callers that hand the
/// archive on should check [`TarWriter::is_finished`] first: `false` means the
/// archive has no trailer, or that an earlier append failed partway through
/// (see [`TarError::WriterFailed`]).
pub struct TarWriter<W: Write, C: Clock = SystemClock> {
    pub(crate) core: ArchiveWriter<C>,
    sink: W,
}

impl<W: Write, C: Clock> Drop for TarWriter<W, C> {
    fn drop(&mut self) {
        if self.core.state() == WriterState::Failed {
            tracing::warn!(
                position = self.core.position(),
                "TarWriter dropped after a failed append. The archive is incomplete."
            );
        } else if !self.core.is_finished() {
            tracing::warn!(
                position = self.core.position(),
                "TarWriter dropped without calling finish(). \
                 The archive has no end-of-archive marker and may be rejected by strict readers."
            );
        }
    }
}

impl<W: Write> TarWriter<W, SystemClock> {
    pub fn new(sink: W) -> Self {
        Self::with_clock(sink, SystemClock)
    }
}

impl<W: Write, C: Clock> TarWriter<W, C> {
    /// Bind a writer to `sink`, taking modification times from `clock` for
    /// entries that don't specify one.
    pub fn with_clock(sink: W, clock: C) -> Self {
        TarWriter {
            core: ArchiveWriter::with_clock(clock),
            sink,
        }
    }

    #[inline]
    fn write_sink(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink
            .write_all(bytes)
            .map_err(TarError::SinkUnavailable)
    }

    /// Append an entry described by `meta`, streaming exactly
    /// `meta.content_len()` bytes from `content`.
    ///
    /// Once the header has reached the sink, any failure leaves the writer in
    /// the failed state: later appends and [`TarWriter::finish`] return
    /// [`TarError::WriterFailed`].
    pub fn append<R: Read>(&mut self, meta: &EntryMetadata, content: R) -> Result<()> {
        let preamble = self.core.begin_entry(meta)?;

        if let Err(e) = self.write_entry(&preamble, meta.content_len(), content) {
            tracing::error!(name = %meta.name, error = %e, "entry left incomplete in archive");
            self.core.fail();
            return Err(e);
        }

        tracing::debug!(name = %meta.name, size = meta.content_len(), "appended entry");
        Ok(())
    }

    fn write_entry<R: Read>(&mut self, preamble: &[u8], expected: u64, mut content: R) -> Result<()> {
        self.write_sink(preamble)?;

        let mut copied = 0u64;
        let mut buf = vec![0u8; COPY_BUFFER_SIZE.min(expected as usize)];

        while copied < expected {
            let want = buf.len().min((expected - copied) as usize);
            let n = match content.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(TarError::ContentLengthMismatch {
                        expected,
                        actual: copied,
                    })
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TarError::SourceUnavailable(e)),
            };
            self.write_sink(&buf[..n])?;
            copied += n as u64;
        }

        self.write_sink(ArchiveWriter::<C>::padding(expected))
    }

    /// Append a regular file named `name` with `size` bytes read from `content`.
    pub fn append_entry<R: Read>(&mut self, name: &str, content: R, size: u64) -> Result<()> {
        self.append(&EntryMetadata::file(name, size), content)
    }

    /// Append a regular file holding `data`.
    pub fn append_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.append_entry(name, data, data.len() as u64)
    }

    /// Append a directory entry.
    pub fn append_dir(&mut self, name: &str) -> Result<()> {
        self.append(&EntryMetadata::directory(name), std::io::empty())
    }

    /// Write the end-of-archive marker and flush the sink.
    ///
    /// Calling this twice fails with [`TarError::WriterAlreadyFinished`].
    pub fn finish(&mut self) -> Result<()> {
        let trailer = self.core.finish()?;
        let result = self
            .write_sink(&trailer)
            .and_then(|_| self.sink.flush().map_err(TarError::SinkUnavailable));
        if result.is_err() {
            self.core.fail();
        }
        result
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.core.is_finished()
    }

    /// Number of bytes written to the sink so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.core.position()
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }
}
