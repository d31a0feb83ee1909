//! Archiver: bzip2 every category document, then bundle them into one tarball.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use bzip2::Compression;
use tracing::{debug, info, instrument};

use crate::error::{PflError, Result};

/// Compress `path` into `<path>.bz2` and remove the original.
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    let mut target = path.as_os_str().to_owned();
    target.push(".bz2");
    let target = PathBuf::from(target);

    let mut input = BufReader::new(File::open(path)?);
    let mut encoder = BzEncoder::new(BufWriter::new(File::create(&target)?), Compression::best());
    let written = io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.flush()?;
    fs::remove_file(path)?;

    debug!(source = %path.display(), target = %target.display(), bytes = written, "Compressed document");
    Ok(target)
}

/// Tarball location for a scratch directory: `<scratch_dir>.tar`, next to it.
pub fn archive_path_for(scratch_dir: &Path) -> PathBuf {
    let mut name = scratch_dir.as_os_str().to_owned();
    name.push(".tar");
    PathBuf::from(name)
}

/// Result of [`archive`]: the tarball plus the compressed members on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub members: Vec<PathBuf>,
}

/// Compress each document individually and tar the results (by file name) into `dest`.
#[instrument(skip(documents), fields(documents = documents.len()))]
pub fn archive(documents: &[PathBuf], dest: &Path) -> Result<Archive> {
    let mut builder = tar::Builder::new(BufWriter::new(File::create(dest)?));
    let mut members = Vec::with_capacity(documents.len());

    for document in documents {
        let compressed = compress_file(document)?;
        let name = compressed
            .file_name()
            .ok_or_else(|| PflError::Io(io::Error::other(format!("no file name: {}", compressed.display()))))?;
        builder.append_path_with_name(&compressed, name)?;
        members.push(compressed);
    }

    builder.into_inner()?.flush()?;
    info!(archive = %dest.display(), members = members.len(), "[ARCHIVE] Created upload archive");
    Ok(Archive {
        path: dest.to_path_buf(),
        members,
    })
}
