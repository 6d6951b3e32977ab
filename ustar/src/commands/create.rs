use std::fs::File;
use std::io::BufWriter;
use std::path::{Component, Path, PathBuf};

use ustar_format::TarWriter;

use crate::error::{Error, Result};

/// Archive name of `path`, relative to `base` and joined with `/`.
///
/// Returns `Ok(None)` for the base itself.
fn archive_name(base: &Path, path: &Path) -> Result<Option<String>> {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(s) => parts.push(s),
                None => {
                    return Err(Error::InvalidPath {
                        path: path.to_path_buf(),
                    })
                }
            },
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidPath {
                    path: path.to_path_buf(),
                })
            }
        }
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join("/")))
    }
}

/// Every path below (and including) `root`, directories before their contents.
fn collect_paths(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut out = vec![];
    for entry in jwalk::WalkDir::new(root).sort(true) {
        let entry = entry.map_err(|source| Error::ProcessDirEntry {
            path: root.to_path_buf(),
            source,
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() || file_type.is_file() {
            out.push(entry.path());
        } else {
            tracing::warn!(path = %entry.path().display(), "skipping unsupported file type");
        }
    }
    Ok(out)
}

pub fn run(archive: PathBuf, paths: Vec<PathBuf>, verbose: bool) -> Result<()> {
    if paths.is_empty() {
        return Err(Error::NoFilesSpecified);
    }

    let file = File::create(&archive).map_err(|source| Error::CreateArchive {
        path: archive.clone(),
        source,
    })?;
    let archive_canonical = std::fs::canonicalize(&archive).ok();
    let mut writer = TarWriter::new(BufWriter::new(file));

    for root in paths.iter() {
        let base = root.parent().unwrap_or_else(|| Path::new(""));

        for path in collect_paths(root)? {
            if archive_canonical.is_some() && std::fs::canonicalize(&path).ok() == archive_canonical
            {
                eprintln!("Cowardly refusing to archive self; skipping.");
                continue;
            }

            let name = match archive_name(base, &path)? {
                Some(name) => name,
                None => continue,
            };
            if verbose {
                println!("{}", name);
            }

            writer
                .append_path(&path, &name)
                .map_err(|source| Error::AddFile {
                    path: path.clone(),
                    source,
                })?;
        }
    }

    writer.finish().map_err(|source| Error::FinishArchive {
        path: archive.clone(),
        source,
    })?;

    tracing::debug!(archive = %archive.display(), bytes = writer.position(), "archive created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_relative_to_the_parent() {
        let base = Path::new("/data/photos").parent().unwrap();
        assert_eq!(
            archive_name(base, Path::new("/data/photos/2020/a.jpg")).unwrap(),
            Some("photos/2020/a.jpg".to_string())
        );
        assert_eq!(
            archive_name(Path::new(""), Path::new("./notes.txt")).unwrap(),
            Some("notes.txt".to_string())
        );
        assert_eq!(archive_name(Path::new(""), Path::new(".")).unwrap(), None);
    }

    #[test]
    fn create_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("sub/one.txt"), b"one").unwrap();
        std::fs::write(src.join("two.txt"), b"two").unwrap();

        let archive = dir.path().join("out.tar");
        run(archive.clone(), vec![src], false).unwrap();

        let file = File::open(&archive).unwrap();
        let mut reader = ustar_format::TarReader::new(file, ustar_format::ChecksumPolicy::Strict);
        let mut names = vec![];
        while let Some(entry) = reader.next_entry().unwrap() {
            names.push(entry.name().to_string());
        }
        assert_eq!(names, vec!["src", "src/sub", "src/sub/one.txt", "src/two.txt"]);
    }
}
