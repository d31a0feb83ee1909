//! Category/package-version handling for installed and available packages.
//!
//! Only the subset of the Gentoo atom grammar the tools need is supported: plain
//! `category/name-version` strings (optionally prefixed with `=`) and version
//! ordering for display.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PflError, Result};

static CPV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<cat>[A-Za-z0-9+_][A-Za-z0-9+_.-]*)/(?P<pn>[A-Za-z0-9+_][A-Za-z0-9+_-]*?)-(?P<ver>\d+(?:\.\d+)*[a-z]?(?:_(?:alpha|beta|pre|rc|p)\d*)*)(?:-r(?P<rev>\d+))?$",
    )
    .expect("static regex")
});

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<num>\d+(?:\.\d+)*)(?P<letter>[a-z])?(?P<suf>(?:_(?:alpha|beta|pre|rc|p)\d*)*)(?:-r(?P<rev>\d+))?$",
    )
    .expect("static regex")
});

static SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(alpha|beta|pre|rc|p)(\d*)").expect("static regex"));

/// One installed or available unit: category, package name and version.
///
/// `version` carries the `-rN` revision, except for `-r0` which is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cpv {
    pub category: String,
    pub name: String,
    pub version: String,
}

impl Cpv {
    pub fn new(category: &str, name: &str, version: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Parse `category/name-version[-rN]`, tolerating a leading `=`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_start_matches('=');
        let caps = CPV_RE
            .captures(trimmed)
            .ok_or_else(|| PflError::InvalidAtom(input.to_string()))?;

        let mut version = caps["ver"].to_string();
        if let Some(rev) = caps.name("rev") {
            if !rev.as_str().trim_start_matches('0').is_empty() {
                version = format!("{}-r{}", version, rev.as_str());
            }
        }

        Ok(Self {
            category: caps["cat"].to_string(),
            name: caps["pn"].to_string(),
            version,
        })
    }

    /// `name-version`, the directory name used by the package database.
    pub fn pf(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// `category/name`
    pub fn cp(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }
}

impl fmt::Display for Cpv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.category, self.name, self.version)
    }
}

#[derive(Debug)]
struct ParsedVersion {
    numbers: Vec<String>,
    letter: Option<char>,
    suffixes: Vec<(u8, u64)>,
    revision: u64,
}

// Rank of "no suffix" sits between `_rc` and `_p`.
const NO_SUFFIX: (u8, u64) = (4, 0);

fn suffix_rank(name: &str) -> u8 {
    match name {
        "alpha" => 0,
        "beta" => 1,
        "pre" => 2,
        "rc" => 3,
        _ => 5,
    }
}

fn parse_version(version: &str) -> Option<ParsedVersion> {
    let caps = VERSION_RE.captures(version)?;
    let numbers = caps["num"].split('.').map(str::to_string).collect();
    let letter = caps.name("letter").and_then(|m| m.as_str().chars().next());
    let suffixes = SUFFIX_RE
        .captures_iter(&caps["suf"])
        .map(|s| (suffix_rank(&s[1]), s[2].parse().unwrap_or(0)))
        .collect();
    let revision = caps
        .name("rev")
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(ParsedVersion {
        numbers,
        letter,
        suffixes,
        revision,
    })
}

fn compare_component(a: &str, b: &str, first: bool) -> Ordering {
    // Components after the first with a leading zero compare as decimal fractions.
    if !first && (a.starts_with('0') || b.starts_with('0')) {
        return a.trim_end_matches('0').cmp(b.trim_end_matches('0'));
    }
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Order two Gentoo version strings (`1.2.3b_rc1-r2` style).
///
/// Strings that do not parse as versions fall back to plain string ordering.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (Some(pa), Some(pb)) = (parse_version(a), parse_version(b)) else {
        return a.cmp(b);
    };

    for i in 0..pa.numbers.len().max(pb.numbers.len()) {
        match (pa.numbers.get(i), pb.numbers.get(i)) {
            (Some(x), Some(y)) => {
                let ord = compare_component(x, y, i == 0);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => break,
        }
    }

    let ord = pa.letter.cmp(&pb.letter);
    if ord != Ordering::Equal {
        return ord;
    }

    for i in 0..pa.suffixes.len().max(pb.suffixes.len()) {
        let x = pa.suffixes.get(i).copied().unwrap_or(NO_SUFFIX);
        let y = pb.suffixes.get(i).copied().unwrap_or(NO_SUFFIX);
        let ord = x.cmp(&y);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    pa.revision.cmp(&pb.revision)
}
