//! Keystone CLI binary.

use anyhow::Result;
use keystone::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the keystone CLI.
///
/// Uses tokio's current_thread runtime; every command is a short sequence
/// of file I/O.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so `--json` output stays machine-readable.
    // Example: RUST_LOG=keystone=debug keystone chain task:T1
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keystone=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting keystone CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Keystone CLI completed successfully");
    Ok(())
}
