use tracing_subscriber::EnvFilter;

/// Initialise tracing for a CLI binary: `RUST_LOG` filtering (default `info`),
/// events on stderr so stdout only carries the report.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
