//! Filesystem helpers: adding files from disk and extracting archives onto it.

use std::io::{Read, Write};
use std::path::Path;
#[cfg(feature = "reader")]
use std::path::{Component, PathBuf};
use std::time::SystemTime;

#[cfg(feature = "writer")]
use crate::clock::Clock;
#[cfg(feature = "reader")]
use crate::error::TarError;
#[cfg(feature = "writer")]
use crate::header::EntryMetadata;
#[cfg(feature = "reader")]
use crate::header::EntryType;
#[cfg(feature = "reader")]
use crate::sync::TarReader;
#[cfg(feature = "writer")]
use crate::sync::TarWriter;

/// Modification time of `meta` in seconds since the Unix epoch.
pub fn mtime_of(meta: &std::fs::Metadata) -> Option<u64> {
    meta.modified()
        .ok()?
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

#[cfg(unix)]
pub fn mode_of(meta: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
pub fn mode_of(_meta: &std::fs::Metadata) -> Option<u32> {
    None
}

#[cfg(feature = "writer")]
impl<W: Write, C: Clock> TarWriter<W, C> {
    /// Append the file or directory at `path` under `name_in_archive`.
    ///
    /// Size, modification time and (on unix) permissions come from the
    /// filesystem. Directories are added as a single entry, without their contents.
    pub fn append_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        name_in_archive: &str,
    ) -> crate::Result<()> {
        let path = path.as_ref();
        let fs_meta = std::fs::metadata(path).map_err(crate::TarError::SourceUnavailable)?;

        let mut meta = if fs_meta.is_dir() {
            EntryMetadata::directory(name_in_archive)
        } else {
            EntryMetadata::file(name_in_archive, fs_meta.len())
        };
        meta.mtime = mtime_of(&fs_meta);
        if let Some(mode) = mode_of(&fs_meta) {
            meta.mode = mode;
        }

        if fs_meta.is_dir() {
            self.append(&meta, std::io::empty())
        } else {
            let file = std::fs::File::open(path).map_err(crate::TarError::SourceUnavailable)?;
            self.append(&meta, std::io::BufReader::new(file))
        }
    }
}

#[cfg(feature = "reader")]
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Creating directory failed. Path: '{}'", .1.display())]
    CreateDirectory(#[source] std::io::Error, PathBuf),

    #[error("Creating file failed. Path: '{}'", .1.display())]
    CreateFile(#[source] std::io::Error, PathBuf),

    #[error("Writing file failed. Path: '{}'", .1.display())]
    WriteFile(#[source] std::io::Error, PathBuf),

    #[error("Refusing to extract entry outside of the destination. Name: '{0}'")]
    UnsafePath(String),

    #[error("Reading archive failed")]
    Archive(#[from] TarError),
}

/// Totals of a completed extraction.
#[cfg(feature = "reader")]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: u64,
    pub directories: u64,
    pub skipped: u64,
    pub bytes: u64,
}

/// Resolve an entry name below `dest`, refusing absolute names and `..` components.
#[cfg(feature = "reader")]
fn safe_join(dest: &Path, name: &str) -> Option<PathBuf> {
    let mut out = dest.to_path_buf();
    let mut pushed = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if pushed {
        Some(out)
    } else {
        None
    }
}

#[cfg(feature = "reader")]
fn set_mtime(file: &std::fs::File, mtime: Option<u64>, path: &Path) {
    if let Some(secs) = mtime {
        let time = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs);
        if let Err(e) = file.set_modified(time) {
            tracing::debug!(path = %path.display(), error = %e, "could not set modification time");
        }
    }
}

/// Extract every remaining entry of `reader` into `dest`.
///
/// Directories and regular files are created; other entry types are skipped.
#[cfg(feature = "reader")]
pub fn extract_all<R: Read, P: AsRef<Path>>(
    reader: &mut TarReader<R>,
    dest: P,
) -> Result<ExtractStats, ExtractError> {
    let dest = dest.as_ref();
    let mut stats = ExtractStats::default();

    while let Some(mut entry) = reader.next_entry()? {
        let target = safe_join(dest, entry.name())
            .ok_or_else(|| ExtractError::UnsafePath(entry.name().to_string()))?;

        match entry.entry_type() {
            EntryType::Directory => {
                std::fs::create_dir_all(&target)
                    .map_err(|e| ExtractError::CreateDirectory(e, target.clone()))?;
                stats.directories += 1;
            }
            EntryType::File => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| ExtractError::CreateDirectory(e, parent.to_path_buf()))?;
                }
                let file = std::fs::File::create(&target)
                    .map_err(|e| ExtractError::CreateFile(e, target.clone()))?;
                let mut out = std::io::BufWriter::new(file);

                let mut buf = vec![0u8; 64 * 1024];
                loop {
                    let n = entry.read_chunk(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    out.write_all(&buf[..n])
                        .map_err(|e| ExtractError::WriteFile(e, target.clone()))?;
                    stats.bytes += n as u64;
                }

                let file = out
                    .into_inner()
                    .map_err(|e| ExtractError::WriteFile(e.into_error(), target.clone()))?;
                set_mtime(&file, entry.metadata().mtime, &target);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(entry.metadata().mode & 0o7777);
                    if let Err(e) = file.set_permissions(perms) {
                        tracing::debug!(path = %target.display(), error = %e, "could not set permissions");
                    }
                }
                stats.files += 1;
            }
            other => {
                tracing::info!(name = %entry.name(), entry_type = ?other, "skipping unsupported entry type");
                stats.skipped += 1;
            }
        }
    }

    tracing::debug!(?stats, dest = %dest.display(), "extraction finished");
    Ok(stats)
}

#[cfg(all(test, feature = "reader", feature = "writer"))]
mod tests {
    use super::*;
    use crate::core::ChecksumPolicy;

    #[test]
    fn safe_join_rejects_escapes() {
        let dest = Path::new("/tmp/out");
        assert_eq!(
            safe_join(dest, "a/./b.txt"),
            Some(PathBuf::from("/tmp/out/a/b.txt"))
        );
        assert_eq!(safe_join(dest, "../etc/passwd"), None);
        assert_eq!(safe_join(dest, "a/../../b"), None);
        assert_eq!(safe_join(dest, "/etc/passwd"), None);
        assert_eq!(safe_join(dest, "."), None);
    }

    #[test]
    fn extract_refuses_unsafe_names() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        writer.append_bytes("../escape.txt", b"nope").unwrap();
        writer.finish().unwrap();
        drop(writer);

        let tmp = tempfile::tempdir().unwrap();
        let mut reader = TarReader::new(&buf[..], ChecksumPolicy::Strict);
        assert!(matches!(
            extract_all(&mut reader, tmp.path()),
            Err(ExtractError::UnsafePath(_))
        ));
        assert!(!tmp.path().parent().unwrap().join("escape.txt").exists());
    }

    #[test]
    fn append_path_and_extract() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("nested")).unwrap();
        std::fs::write(src.path().join("nested/data.txt"), b"on disk").unwrap();

        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        writer
            .append_path(src.path().join("nested"), "nested")
            .unwrap();
        writer
            .append_path(src.path().join("nested/data.txt"), "nested/data.txt")
            .unwrap();
        writer.finish().unwrap();
        drop(writer);

        let dest = tempfile::tempdir().unwrap();
        let mut reader = TarReader::new(&buf[..], ChecksumPolicy::Strict);
        let stats = extract_all(&mut reader, dest.path()).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(stats.directories, 1);
        assert_eq!(stats.bytes, 7);
        assert_eq!(
            std::fs::read(dest.path().join("nested/data.txt")).unwrap(),
            b"on disk"
        );
    }

    #[test]
    fn missing_source_file() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        assert!(matches!(
            writer.append_path("/definitely/not/here", "x"),
            Err(TarError::SourceUnavailable(_))
        ));
        writer.finish().unwrap();
    }
}
