//! Herein lies the brains of the `ustar` archive format.
//!
//! Use [TarWriter][TarWriter] to write archives, and [TarReader][TarReader] to read them.
//! The header codec lives in [encode] and [parse]; the sans-IO state machines
//! both frontends are built on live in [core][crate::core].

pub mod clock;
pub mod core;
pub mod encode;
mod error;
pub mod fs;
pub mod header;
pub mod parse;
#[cfg(any(feature = "reader", feature = "writer"))]
pub mod sync;

#[cfg(feature = "reader")]
pub use self::core::ChecksumPolicy;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, TarError};
#[cfg(feature = "reader")]
pub use fs::{extract_all, ExtractError, ExtractStats};
pub use header::{padding_len, EntryMetadata, EntryType, HeaderBlock, BLOCK_SIZE};
pub use parse::Decoded;
#[cfg(feature = "reader")]
pub use sync::{Entry, TarReader};
#[cfg(feature = "writer")]
pub use sync::TarWriter;
