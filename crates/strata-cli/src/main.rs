mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI first to get verbose flag
    let cli = cli::Cli::parse();

    // Default to warn level (quiet), info on --verbose, or respect RUST_LOG env var.
    // Logs go to stderr so stdout stays clean for content and the MCP stdio transport.
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::execute(cli).await
}
