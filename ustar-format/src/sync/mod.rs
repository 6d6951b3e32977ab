//! Sync (std) frontends for reading and writing ustar archives.

#[cfg(feature = "reader")]
mod reader;
#[cfg(all(test, feature = "reader", feature = "writer"))]
mod tests;
#[cfg(feature = "writer")]
mod writer;

#[cfg(feature = "reader")]
pub use reader::{Entry, TarReader};
#[cfg(feature = "writer")]
pub use writer::TarWriter;
