//! Content Describer: what one installed package put on disk and how it was built.

use std::collections::BTreeMap;

use crate::atom::Cpv;
use crate::contract::PackageDatabase;
use crate::error::{PflError, Result};

/// Architecture reported when no enabled flag names a keyword.
pub const NO_ARCH: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageContents {
    /// Installed paths and their entry kind, sorted by path.
    pub files: BTreeMap<String, String>,
    pub use_flags: Vec<String>,
    pub iuse_flags: Vec<String>,
    pub keywords: Vec<String>,
    pub merge_time: i64,
}

impl PackageContents {
    /// Enabled flags the package actually declares, without duplicates.
    pub fn matched_uses(&self) -> Vec<String> {
        let mut matched: Vec<String> = Vec::new();
        for flag in &self.use_flags {
            let declared = self
                .iuse_flags
                .iter()
                .any(|iuse| iuse.trim_start_matches(['+', '-']) == flag.as_str());
            if declared && !matched.contains(flag) {
                matched.push(flag.clone());
            }
        }
        matched
    }

    /// Architecture the package was built for.
    ///
    /// USE carries the arch flag (`amd64`, `arm64`, ...). Scanning USE in order,
    /// the last flag found bare or `~`-prefixed in KEYWORDS wins.
    pub fn arch(&self) -> &str {
        let mut arch: &str = NO_ARCH;
        for flag in &self.use_flags {
            let unstable = format!("~{flag}");
            if self.keywords.iter().any(|kw| kw == flag || *kw == unstable) {
                arch = flag.as_str();
            }
        }
        arch
    }
}

fn split_words(value: String) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Describe one installed package; an empty manifest yields [`PflError::EmptyManifest`].
pub fn describe<D: PackageDatabase + ?Sized>(db: &D, cpv: &Cpv) -> Result<PackageContents> {
    let files: BTreeMap<String, String> = db
        .contents(cpv)?
        .into_iter()
        .map(|entry| (entry.path, entry.kind))
        .collect();
    if files.is_empty() {
        return Err(PflError::EmptyManifest(cpv.to_string()));
    }

    Ok(PackageContents {
        files,
        use_flags: split_words(db.aux_get(cpv, "USE")?),
        iuse_flags: split_words(db.aux_get(cpv, "IUSE")?),
        keywords: split_words(db.aux_get(cpv, "KEYWORDS")?),
        merge_time: db.merge_time(cpv)?,
    })
}
