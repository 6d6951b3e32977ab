use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use ustar_format::{ChecksumPolicy, EntryMetadata, EntryType, TarReader};

use crate::error::{Error, Result};

macro_rules! add {
    ($ident:ident, $value:tt => $s:ident) => {
        if $ident {
            $s.push($value);
        } else {
            $s.push('-');
        }
    };
}

#[inline(always)]
fn format_mode(mode: u32) -> String {
    let or = (mode & 0o400) > 0;
    let ow = (mode & 0o200) > 0;
    let ox = (mode & 0o100) > 0;
    let gr = (mode & 0o040) > 0;
    let gw = (mode & 0o020) > 0;
    let gx = (mode & 0o010) > 0;
    let ar = (mode & 0o004) > 0;
    let aw = (mode & 0o002) > 0;
    let ax = (mode & 0o001) > 0;

    let mut s = String::new();
    add!(or, 'r' => s);
    add!(ow, 'w' => s);
    add!(ox, 'x' => s);
    add!(gr, 'r' => s);
    add!(gw, 'w' => s);
    add!(gx, 'x' => s);
    add!(ar, 'r' => s);
    add!(aw, 'w' => s);
    add!(ax, 'x' => s);

    s
}

#[inline(always)]
fn time(mtime: Option<u64>) -> String {
    mtime
        .map(|x| std::time::UNIX_EPOCH + std::time::Duration::new(x, 0))
        .map(|x| {
            let datetime: chrono::DateTime<chrono::Utc> = x.into();
            datetime.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|| "-".into())
}

fn kind(entry_type: EntryType) -> String {
    match entry_type {
        EntryType::File => "<file>".into(),
        EntryType::Directory => "<directory>".into(),
        EntryType::LongNameMarker => "<longname>".into(),
        EntryType::Other(b) if b.is_ascii_graphic() => format!("<type {}>", b as char),
        EntryType::Other(b) => format!("<type {:#04x}>", b),
    }
}

fn format_row(meta: &EntryMetadata) -> String {
    use humansize::{file_size_opts as options, FileSize};

    let length = match meta.entry_type {
        EntryType::Directory => "-".to_string(),
        _ => meta
            .size
            .file_size(options::BINARY)
            .unwrap_or_else(|e| e),
    };

    let mut name = meta.name.clone();
    if meta.entry_type == EntryType::Directory && !name.ends_with('/') {
        name.push('/');
    }

    format!(
        "{:12}  {:>12}   {:<20}   {:<9}   {}",
        kind(meta.entry_type),
        length,
        time(meta.mtime),
        format_mode(meta.mode),
        name,
    )
}

pub fn run(archive: PathBuf, policy: ChecksumPolicy) -> Result<()> {
    let file = File::open(&archive).map_err(|source| Error::OpenArchive {
        path: archive.clone(),
        source,
    })?;
    let mut reader = TarReader::new(BufReader::new(file), policy);

    println!("Type          Length         Modified               Mode        Path");
    println!("------------  -------------  ---------------------  ----------  --------");

    loop {
        let entry = reader.next_entry().map_err(|source| Error::ReadArchive {
            path: archive.clone(),
            source,
        })?;
        match entry {
            Some(entry) => println!("{}", format_row(entry.metadata())),
            None => break,
        }
    }

    Ok(())
}
