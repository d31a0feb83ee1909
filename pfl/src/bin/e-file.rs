use anyhow::Result;
use clap::Parser;
use pfl::efile::{run, EfileCli};

#[tokio::main]
async fn main() -> Result<()> {
    pfl::logging::init();

    let cli = EfileCli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "e-file exited with error");
    }
    result
}
