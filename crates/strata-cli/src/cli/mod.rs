mod artifact;
mod config;
mod history;
mod listing;
mod mcp;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use strata::services::{ArtifactRepository, ConfigService, StrataConfig};

/// Load configuration and open the repository at the configured storage root
pub fn open_repository() -> Result<(ArtifactRepository, StrataConfig)> {
    let config_service = ConfigService::from_default_location()?;
    let config = config_service.load()?;
    let root = config_service.resolve_storage_root()?;
    tracing::info!(root = %root.display(), "opening artifact store");
    Ok((ArtifactRepository::open(root), config))
}

/// Read artifact content from an inline argument, a file, or stdin (`-`)
pub fn read_content(inline: Option<String>, file: Option<PathBuf>) -> Result<Vec<u8>> {
    match (inline, file) {
        (Some(text), None) if text == "-" => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read content from stdin")?;
            Ok(buf)
        },
        (Some(text), None) => Ok(text.into_bytes()),
        (None, Some(path)) => std::fs::read(&path)
            .with_context(|| format!("Failed to read content from {}", path.display())),
        (Some(_), Some(_)) => Err(anyhow::anyhow!(
            "Provide content either inline or with --file, not both"
        )),
        (None, None) => Err(anyhow::anyhow!(
            "No content given. Pass it inline, with --file <PATH>, or '-' to read stdin"
        )),
    }
}

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Append-only versioned artifact store", long_about = None)]
pub struct Cli {
    /// Enable verbose output (info logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store an artifact (creates version 1, or appends if it exists)
    Store(artifact::StoreArgs),

    /// Append a new version to an existing artifact
    Update(artifact::UpdateArgs),

    /// Print artifact content
    Get(artifact::GetArgs),

    /// Print the URL of an artifact or version
    Url(artifact::UrlArgs),

    /// Create a new version from an earlier version's content
    Revert(artifact::RevertArgs),

    /// List workspaces
    Workspaces(listing::WorkspacesArgs),

    /// List artifacts in a workspace
    List(listing::ListArgs),

    /// Show the version history of an artifact
    History(history::HistoryArgs),

    /// Show a unified diff between two versions
    Diff(history::DiffArgs),

    /// Remove version slots left behind by interrupted writes
    Sweep(history::SweepArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Start MCP server
    Mcp(mcp::McpArgs),
}

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Store(args) => artifact::execute_store(args).await,
        Commands::Update(args) => artifact::execute_update(args).await,
        Commands::Get(args) => artifact::execute_get(args).await,
        Commands::Url(args) => artifact::execute_url(args).await,
        Commands::Revert(args) => artifact::execute_revert(args).await,
        Commands::Workspaces(args) => listing::execute_workspaces(args).await,
        Commands::List(args) => listing::execute_list(args).await,
        Commands::History(args) => history::execute_history(args).await,
        Commands::Diff(args) => history::execute_diff(args).await,
        Commands::Sweep(args) => history::execute_sweep(args).await,
        Commands::Config(args) => config::execute(args).await,
        Commands::Mcp(args) => mcp::execute(args).await,
    }
}
