//! Sans-IO core state machines for ustar archive reading and writing.
//!
//! This module provides pure state machines that work with byte buffers
//! without performing any I/O. Frontends own the byte sink or source and
//! move bytes in and out of these cores:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Frontends                              │
//! │  - TarWriter (std::io::Write)           │
//! │  - TarReader (std::io::Read)            │
//! ├─────────────────────────────────────────┤
//! │  Sans-IO Core (this module)             │
//! │  - ArchiveWriter                        │
//! │  - ArchiveReader                        │
//! ├─────────────────────────────────────────┤
//! │  Header codec (encode / parse)          │
//! └─────────────────────────────────────────┘
//! ```

#[cfg(feature = "reader")]
mod reader;
#[cfg(feature = "writer")]
mod writer;

#[cfg(feature = "reader")]
pub use reader::{ArchiveReader, ChecksumPolicy, Step, MAX_LONG_NAME_LEN};
#[cfg(feature = "writer")]
pub use writer::{ArchiveWriter, WriterState};
