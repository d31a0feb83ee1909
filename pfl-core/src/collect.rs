//! XML Collector: one document per (repository, category) into a scratch directory.
//!
//! A run walks the grouped candidates once, in order:
//! open a [`CategoryDocument`] for each category, append every package that has
//! installed files, then close it. Documents look like:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <pfl xmlns="http://www.portagefilelist.de/xsd/collect">
//! 	<category name="dev-libs">
//! 		<package arch="amd64" name="foo" timestamp="1700000000" version="1.0" repo="gentoo">
//! 			<files>
//! 				<file type="obj">/usr/bin/foo</file>
//! 			</files>
//! 			<uses>
//! 				<use>ssl</use>
//! 			</uses>
//! 		</package>
//! 	</category>
//! </pfl>
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;
use tracing::{debug, info, warn};

use crate::atom::Cpv;
use crate::candidates::Candidates;
use crate::contract::PackageDatabase;
use crate::describe::{describe, PackageContents};
use crate::error::{PflError, Result};

pub const XML_NAMESPACE: &str = "http://www.portagefilelist.de/xsd/collect";

const SCRATCH_PREFIX: &str = "pfl-";

/// What a collection pass left in the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOutcome {
    pub scratch_dir: PathBuf,
    /// One XML document per (repository, category), in write order.
    pub files: Vec<PathBuf>,
    /// Number of candidate packages considered.
    pub count: usize,
    /// Candidates left out because they installed no files or could not be read.
    pub skipped: usize,
}

/// An open per-category document.
pub struct CategoryDocument {
    out: BufWriter<File>,
    path: PathBuf,
}

impl CategoryDocument {
    pub fn create(scratch_dir: &Path, category: &str) -> Result<Self> {
        let (file, path) = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(".xml")
            .tempfile_in(scratch_dir)?
            .keep()
            .map_err(|e| PflError::Io(e.error))?;

        let mut document = Self {
            out: BufWriter::new(file),
            path,
        };
        document.write(0, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        document.line(0, &format!(r#"<pfl xmlns="{XML_NAMESPACE}">"#))?;
        document.line(1, &format!(r#"<category name="{}">"#, escape(category)))?;
        debug!(path = %document.path.display(), category, "Opened category document");
        Ok(document)
    }

    fn write(&mut self, depth: usize, text: &str) -> Result<()> {
        for _ in 0..depth {
            self.out.write_all(b"\t")?;
        }
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn line(&mut self, depth: usize, text: &str) -> Result<()> {
        self.out.write_all(b"\n")?;
        self.write(depth, text)
    }

    pub fn write_package(&mut self, repo: &str, cpv: &Cpv, contents: &PackageContents) -> Result<()> {
        self.line(
            2,
            &format!(
                r#"<package arch="{}" name="{}" timestamp="{}" version="{}" repo="{}">"#,
                escape(contents.arch()),
                escape(cpv.name.as_str()),
                contents.merge_time,
                escape(cpv.version.as_str()),
                escape(repo),
            ),
        )?;

        self.line(3, "<files>")?;
        for (path, kind) in &contents.files {
            self.line(
                4,
                &format!(
                    r#"<file type="{}">{}</file>"#,
                    escape(kind.as_str()),
                    escape(path.as_str())
                ),
            )?;
        }
        self.line(3, "</files>")?;

        let uses = contents.matched_uses();
        if !uses.is_empty() {
            self.line(3, "<uses>")?;
            for flag in &uses {
                self.line(4, &format!("<use>{}</use>", escape(flag.as_str())))?;
            }
            self.line(3, "</uses>")?;
        }

        self.line(2, "</package>")
    }

    /// Close the category and root elements and flush to disk.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.line(1, "</category>")?;
        self.line(0, "</pfl>\n")?;
        self.out.flush()?;
        Ok(self.path)
    }
}

/// Write every candidate into per-category documents under a fresh `pfl-*`
/// directory inside `scratch_base`.
///
/// Returns `None` without touching the filesystem when there are no candidates.
pub fn collect_into_xml<D: PackageDatabase + ?Sized>(
    db: &D,
    candidates: &Candidates,
    scratch_base: &Path,
) -> Result<Option<CollectOutcome>> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let scratch_dir = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(scratch_base)?
        .keep();
    info!(scratch_dir = %scratch_dir.display(), "[COLLECT] Created scratch directory");

    let mut outcome = CollectOutcome {
        scratch_dir,
        files: Vec::new(),
        count: candidates.count,
        skipped: 0,
    };
    let mut working_on = 0;

    for (repo, categories) in &candidates.grouped {
        for (category, packages) in categories {
            let mut document = CategoryDocument::create(&outcome.scratch_dir, category)?;

            for (name, versions) in packages {
                for version in versions {
                    working_on += 1;
                    let cpv = Cpv::new(category, name, version);
                    info!("working on ({} of {}) {}::{}", working_on, candidates.count, cpv, repo);

                    let contents = match describe(db, &cpv) {
                        Ok(contents) => contents,
                        Err(PflError::EmptyManifest(_)) => {
                            debug!(%cpv, "[COLLECT] No installed files, skipping");
                            outcome.skipped += 1;
                            continue;
                        }
                        Err(e) => {
                            warn!(%cpv, error = %e, "[COLLECT] Failed to describe package, skipping");
                            outcome.skipped += 1;
                            continue;
                        }
                    };
                    document.write_package(repo, &cpv, &contents)?;
                }
            }

            outcome.files.push(document.finish()?);
        }
    }

    info!(
        documents = outcome.files.len(),
        skipped = outcome.skipped,
        "[COLLECT] Collection finished"
    );
    Ok(Some(outcome))
}
