use super::open_repository;
use anyhow::Result;
use chrono::SecondsFormat;
use clap::Args;
use strata::services::Locator;

#[derive(Args)]
pub struct WorkspacesArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Workspace name
    workspace: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute_workspaces(args: WorkspacesArgs) -> Result<()> {
    let (repository, _) = open_repository()?;
    let workspaces = repository.list_workspaces().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&workspaces)?);
    } else if workspaces.is_empty() {
        println!("No workspaces found.");
    } else {
        for workspace in workspaces {
            println!("{}", workspace);
        }
    }
    Ok(())
}

pub async fn execute_list(args: ListArgs) -> Result<()> {
    let (repository, config) = open_repository()?;
    let artifacts = repository.list_artifacts(&args.workspace).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }

    if artifacts.is_empty() {
        println!("No artifacts in workspace '{}'.", args.workspace);
        return Ok(());
    }

    for artifact in &artifacts {
        println!(
            "{:<32} v{:<5} {}  {}",
            artifact.id,
            artifact.current_version,
            artifact
                .updated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            Locator::latest(&artifact.workspace, &artifact.id)
                .to_url(&config.server.public_url)
        );
        if let Some(description) = &artifact.description {
            println!("    {}", description);
        }
    }
    Ok(())
}
