use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use ustar_format::{ChecksumPolicy, ExtractStats, TarReader};

use crate::error::{Error, Result};

pub fn run(
    archive: PathBuf,
    output: PathBuf,
    policy: ChecksumPolicy,
    verbose: bool,
) -> Result<ExtractStats> {
    let file = File::open(&archive).map_err(|source| Error::OpenArchive {
        path: archive.clone(),
        source,
    })?;

    std::fs::create_dir_all(&output).map_err(|source| Error::CreateDirectory {
        path: output.clone(),
        source,
    })?;

    let mut reader = TarReader::new(BufReader::new(file), policy);
    let stats = ustar_format::extract_all(&mut reader, &output)
        .map_err(|source| Error::Extract { source })?;

    if verbose {
        println!(
            "Extracted {} files and {} directories ({} bytes), skipped {} entries",
            stats.files, stats.directories, stats.bytes, stats.skipped
        );
    }

    Ok(stats)
}
