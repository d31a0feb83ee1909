//! `e-file`: which package ships this file?
//!
//! Queries the lookup service, then prints for every matched package what the
//! service has seen, what the local repositories offer and what is installed.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::Parser;
use console::style;
use pfl_core::contract::{FileQuery, PackageDatabase};
use pfl_core::query::{summarise, PackageSummary};
use pfl_core::repos::RepositoryCache;
use pfl_core::vardb::VarDb;
use pfl_core::PflError;
use regex::Regex;

use crate::load_config::load_config;
use crate::upload::HttpFileQuery;

const LABEL_WIDTH: usize = 22;

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(" +").expect("static regex"));

#[derive(Parser, Debug)]
#[clap(
    name = "e-file",
    version,
    about = "Search portagefilelist.de for the given file name (slice.hpp) or path \
             (/usr/include/exiv2/slice.hpp) and display the result with further information \
             from the local package database. Using * as a wildcard (slice.*) \
             (/usr/include/exiv2/*) works too."
)]
pub struct EfileCli {
    /// File name or path to search for
    pub file: String,

    /// Print without colours and indentation
    #[clap(long)]
    pub plain: bool,

    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
}

fn label(text: &str) -> String {
    let padded = format!("{:<width$}", format!("\t{text}:"), width = LABEL_WIDTH);
    style(padded).green().to_string()
}

fn format_build_time(build_time: i64) -> String {
    Local
        .timestamp_opt(build_time, 0)
        .single()
        .map(|t| t.format("(%c) ").to_string())
        .unwrap_or_else(|| "(unknown) ".to_string())
}

/// Render one block per package, separated by blank lines.
pub fn render(summaries: &[PackageSummary], plain: bool) -> String {
    let mut out = String::new();
    for summary in summaries {
        let marker = if summary.is_installed() { "[I] " } else { " *  " };
        out.push_str(&format!(
            "{}{}/{}\n",
            style(marker).green(),
            summary.category,
            summary.package
        ));
        out.push_str(&format!("{}{}\n", label("Seen Versions"), summary.seen_versions.join(" ")));
        out.push_str(&format!(
            "{}{}\n",
            label("Portage Versions"),
            summary.available_versions.join(" ")
        ));
        out.push_str(&format!("{}{}\n", label("Repository"), summary.repositories.join(" ")));

        out.push_str(&label("Installed Versions"));
        if summary.installed.is_empty() {
            out.push('-');
        }
        for installed in &summary.installed {
            out.push_str(&style(&installed.version).white().on_blue().to_string());
            out.push_str(&style(format_build_time(installed.build_time)).magenta().to_string());
        }
        out.push('\n');

        if let Some(homepage) = &summary.homepage {
            out.push_str(&format!("{}{}\n", label("Homepage"), homepage));
        }
        if let Some(description) = &summary.description {
            out.push_str(&format!("{}{}\n", label("Description"), description));
        }
        out.push_str(&format!("{}{}\n", label("Matched Files"), summary.files.join(" ")));
        out.push('\n');
    }

    if plain {
        strip_formatting(&out)
    } else {
        out
    }
}

/// Drop colour codes and tabs, and collapse runs of spaces.
pub fn strip_formatting(text: &str) -> String {
    let stripped = console::strip_ansi_codes(text).replace('\t', "");
    SPACES.replace_all(&stripped, " ").into_owned()
}

/// Query the service and enrich the hits from the local databases.
pub async fn search<Q, D>(
    query: &Q,
    pattern: &str,
    db: &D,
    repos: &RepositoryCache,
) -> Result<Vec<PackageSummary>, PflError>
where
    Q: FileQuery + ?Sized,
    D: PackageDatabase + ?Sized,
{
    let hits = query.query(pattern).await?;
    tracing::info!(pattern, hits = hits.len(), "Received matches");
    summarise(&hits, db, repos)
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: EfileCli) -> Result<()> {
    tracing::info!("trace_initialised");

    let settings = load_config(cli.config.as_deref())?;
    let query = HttpFileQuery::new(&settings)?;
    let db = VarDb::new(settings.vdb_dir.clone());
    let repos = RepositoryCache::new(settings.repos_dir.clone());

    match search(&query, &cli.file, &db, &repos).await {
        Ok(summaries) => {
            print!("{}", render(&summaries, cli.plain));
            Ok(())
        }
        Err(PflError::Service { code, message }) => {
            eprintln!("{code}");
            eprintln!("{message}");
            Err(anyhow::anyhow!("the lookup service answered with error {code}"))
        }
        Err(PflError::EmptyResult) => {
            eprintln!("Empty result return. This should not happen.");
            Err(PflError::EmptyResult.into())
        }
        Err(e @ PflError::MalformedResponse(_)) => {
            eprintln!("Something went wrong with the request result.");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
