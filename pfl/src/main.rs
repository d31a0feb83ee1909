use anyhow::Result;
use clap::Parser;
use pfl::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for the CLI.
    pfl::logging::init();
    tracing::info!("CLI application startup: tracing initialised");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
