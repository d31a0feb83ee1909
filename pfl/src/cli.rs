///
/// This module implements the CLI interface of the `pfl` collector: argument
/// parsing, wiring the core pipeline to the real package database and HTTP
/// uploader, and printing the run report.
///
/// All collection logic (candidates, XML, archive, run state) lives in `pfl-core`.
///
/// ## How To Use
/// - From the command line: `pfl`, `pfl --pretend`, `pfl -p dev-libs/foo-1.0`, `pfl -r guru`.
/// - Programmatically / in tests: call [`run`] with a constructed [`Cli`].
use crate::load_config::load_config;
use crate::upload::HttpUploader;
use anyhow::Result;
use clap::Parser;
use pfl_core::runstate::RunStateStore;
use pfl_core::synchronise::{synchronise, RunOutcome, SynchroniseConfig, SynchroniseReport};
use pfl_core::vardb::VarDb;
use std::path::PathBuf;

/// CLI for pfl: collect and upload the file lists of newly installed packages.
#[derive(Parser, Debug, Default)]
#[clap(
    name = "pfl",
    version,
    about = "Collect the file lists of newly installed packages and upload them to portagefilelist.de"
)]
pub struct Cli {
    /// Only collect this installed package (category/name-version)
    #[clap(short = 'p', long = "package", value_name = "ATOM")]
    pub package: Option<String>,

    /// Only collect packages installed from this repository
    #[clap(short = 'r', long = "repo", value_name = "REPO")]
    pub repo: Option<String>,

    /// Write the XML files but neither upload them nor update the last run
    #[clap(long)]
    pub pretend: bool,

    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Where the last run is recorded
    #[clap(long, value_name = "PATH")]
    pub info_file: Option<PathBuf>,
}

fn print_report(report: &SynchroniseReport, store: &RunStateStore) {
    match &report.outcome {
        RunOutcome::NothingToCollect => println!(
            "Nothing to collect. If this is wrong, set PFL/lastrun in {} to 0",
            store.path().display()
        ),
        RunOutcome::Pretend { kept } => {
            println!("Pretend mode. Nothing to upload.");
            println!("Pretend mode. Keeping:");
            for path in kept {
                println!("{}", path.display());
            }
            println!("The files need to be removed manually!");
        }
        RunOutcome::Uploaded { response, removed } => {
            println!("Collected {} package(s).", report.count);
            println!("HTTP Response Code: {}", response.status);
            println!("HTTP Response Body: {}", response.body);
            println!("Cleanup: removed {} file(s).", removed.len());
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let settings = load_config(cli.config.as_deref())?;
    let store = RunStateStore::new(cli.info_file.unwrap_or_else(|| settings.info_file()));
    let db = VarDb::new(settings.vdb_dir.clone());
    let uploader = HttpUploader::new(&settings)?;

    let config = SynchroniseConfig {
        version: env!("CARGO_PKG_VERSION").to_string(),
        allowed_repos: settings.allowed_repos.clone(),
        only_atom: cli.package,
        only_repo: cli.repo,
        pretend: cli.pretend,
        scratch_base: settings.scratch_dir(),
    };
    tracing::info!(command = "pfl", ?config, info_file = %store.path().display(), "Starting collection");

    match synchronise(&config, &db, &uploader, &store).await {
        Ok(report) => {
            tracing::info!(command = "pfl", ?report, "Collection complete");
            print_report(&report, &store);
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "pfl", error = %e, "Collection failed");
            if !e.kept.is_empty() {
                eprintln!("Files kept for inspection:");
                for path in &e.kept {
                    eprintln!("{}", path.display());
                }
            }
            Err(anyhow::Error::new(e.source))
        }
    }
}
