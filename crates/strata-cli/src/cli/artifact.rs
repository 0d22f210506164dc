use super::{open_repository, read_content};
use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args)]
pub struct StoreArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,

    /// HTML content, or '-' to read stdin
    content: Option<String>,

    /// Read content from a file
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Description recorded when the artifact is first created
    #[arg(long, short)]
    description: Option<String>,

    /// Changelog entry for this version
    #[arg(long, short)]
    message: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,

    /// HTML content, or '-' to read stdin
    content: Option<String>,

    /// Read content from a file
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Changelog entry for this version
    #[arg(long, short)]
    message: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,

    /// Version number (defaults to latest)
    #[arg(long)]
    version: Option<u64>,
}

#[derive(Args)]
pub struct UrlArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,

    /// Version number (defaults to latest)
    #[arg(long)]
    version: Option<u64>,
}

#[derive(Args)]
pub struct RevertArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,

    /// Version whose content becomes the new latest
    version: u64,
}

pub async fn execute_store(args: StoreArgs) -> Result<()> {
    let content = read_content(args.content, args.file)?;
    let (repository, config) = open_repository()?;

    let outcome = repository
        .create(
            &args.workspace,
            &args.id,
            &content,
            args.description,
            args.message,
        )
        .await?;

    println!(
        "Stored {}/{} version {}",
        args.workspace, args.id, outcome.version
    );
    println!("{}", outcome.locator.to_url(&config.server.public_url));
    Ok(())
}

pub async fn execute_update(args: UpdateArgs) -> Result<()> {
    let content = read_content(args.content, args.file)?;
    let (repository, config) = open_repository()?;

    let outcome = repository
        .update(&args.workspace, &args.id, &content, args.message)
        .await?;

    println!(
        "Updated {}/{} to version {}",
        args.workspace, args.id, outcome.version
    );
    println!("{}", outcome.locator.to_url(&config.server.public_url));
    Ok(())
}

pub async fn execute_get(args: GetArgs) -> Result<()> {
    let (repository, _) = open_repository()?;
    let content = repository
        .read(&args.workspace, &args.id, args.version)
        .await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}

pub async fn execute_url(args: UrlArgs) -> Result<()> {
    let (repository, config) = open_repository()?;
    let locator = repository
        .locator(&args.workspace, &args.id, args.version)
        .await?;

    println!("{}", locator.to_url(&config.server.public_url));
    Ok(())
}

pub async fn execute_revert(args: RevertArgs) -> Result<()> {
    let (repository, config) = open_repository()?;
    let outcome = repository
        .revert(&args.workspace, &args.id, args.version)
        .await?;

    println!(
        "Reverted {}/{} to version {} as version {}",
        args.workspace, args.id, args.version, outcome.version
    );
    println!("{}", outcome.locator.to_url(&config.server.public_url));
    Ok(())
}
