use super::open_repository;
use anyhow::Result;
use chrono::SecondsFormat;
use clap::Args;
use similar::TextDiff;

#[derive(Args)]
pub struct HistoryArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,

    /// Older version
    #[arg(long)]
    from: u64,

    /// Newer version (defaults to current)
    #[arg(long)]
    to: Option<u64>,
}

#[derive(Args)]
pub struct SweepArgs {
    /// Workspace name
    workspace: String,

    /// Artifact ID
    id: String,
}

pub async fn execute_history(args: HistoryArgs) -> Result<()> {
    let (repository, _) = open_repository()?;
    let metadata = repository.metadata(&args.workspace, &args.id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metadata.versions)?);
        return Ok(());
    }

    println!(
        "{}/{} ({} version{})",
        metadata.workspace,
        metadata.id,
        metadata.versions.len(),
        if metadata.versions.len() == 1 { "" } else { "s" }
    );
    for record in metadata.versions.iter().rev() {
        let marker = if record.version == metadata.current_version {
            "*"
        } else {
            " "
        };
        println!(
            "{} v{:<5} {}  {:>8} bytes  {}",
            marker,
            record.version,
            record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.size,
            record.changelog.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn execute_diff(args: DiffArgs) -> Result<()> {
    let (repository, _) = open_repository()?;
    let to = match args.to {
        Some(version) => version,
        None => {
            repository
                .metadata(&args.workspace, &args.id)
                .await?
                .current_version
        },
    };

    let old = repository
        .read(&args.workspace, &args.id, Some(args.from))
        .await?;
    let new = repository.read(&args.workspace, &args.id, Some(to)).await?;

    let old = String::from_utf8_lossy(&old);
    let new = String::from_utf8_lossy(&new);
    if old == new {
        println!("No differences between v{} and v{}", args.from, to);
        return Ok(());
    }

    print!("{}", render_diff(&old, &new, args.from, to));
    Ok(())
}

fn render_diff(old: &str, new: &str, from: u64, to: u64) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("v{}", from), &format!("v{}", to))
        .to_string()
}

pub async fn execute_sweep(args: SweepArgs) -> Result<()> {
    let (repository, _) = open_repository()?;
    let removed = repository.sweep_orphans(&args.workspace, &args.id).await?;

    if removed.is_empty() {
        println!("No orphaned versions in {}/{}", args.workspace, args.id);
    } else {
        let list = removed
            .iter()
            .map(|v| format!("v{}", v))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "Removed orphaned versions of {}/{}: {}",
            args.workspace, args.id, list
        );
    }
    Ok(())
}
