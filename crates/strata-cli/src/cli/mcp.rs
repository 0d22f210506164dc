use super::open_repository;
use anyhow::Result;
use clap::Args;
use rmcp::ServiceExt;
use std::sync::Arc;
use strata::mcp::StrataToolHandler;

#[derive(Args)]
pub struct McpArgs {
    /// Include only specified tools (comma-separated)
    #[arg(long)]
    include: Option<String>,

    /// Exclude specified tools (comma-separated)
    #[arg(long)]
    exclude: Option<String>,
}

fn split_tools(list: Option<&String>) -> Option<Vec<String>> {
    list.map(|s| {
        s.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
}

pub async fn execute(args: McpArgs) -> Result<()> {
    let (repository, config) = open_repository()?;

    let include_tools = split_tools(args.include.as_ref());
    let exclude_tools = split_tools(args.exclude.as_ref());

    // Log to stderr for stdio servers
    eprintln!("Starting strata MCP server...");

    let handler = StrataToolHandler::new(
        Arc::new(repository),
        config.server.public_url,
        include_tools,
        exclude_tools,
    );
    let service = handler.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
