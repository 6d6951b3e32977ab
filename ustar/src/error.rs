use std::path::PathBuf;

use ustar_format::{ExtractError, TarError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open archive `{}`", .path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create archive `{}`", .path.display())]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read archive `{}`", .path.display())]
    ReadArchive {
        path: PathBuf,
        #[source]
        source: TarError,
    },

    #[error("Cannot add file to archive `{}`", .path.display())]
    AddFile {
        path: PathBuf,
        #[source]
        source: TarError,
    },

    #[error("Cannot finish archive `{}`", .path.display())]
    FinishArchive {
        path: PathBuf,
        #[source]
        source: TarError,
    },

    #[error("Cannot handle path `{}`", .path.display())]
    InvalidPath { path: PathBuf },

    #[error("Cannot process directory entry below `{}`", .path.display())]
    ProcessDirEntry {
        path: PathBuf,
        #[source]
        source: jwalk::Error,
    },

    #[error("Cannot create directory `{}`", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot extract files")]
    Extract {
        #[source]
        source: ExtractError,
    },

    #[error("No files specified to add to archive")]
    NoFilesSpecified,
}
