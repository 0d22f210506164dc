use crate::services::{ArtifactRepository, Locator, ServiceError};
use rmcp::model::{CallToolResult, Content, PaginatedRequestParams};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Strata MCP tool handler using rmcp SDK
#[derive(Clone)]
pub struct StrataToolHandler {
    repository: Arc<ArtifactRepository>,
    public_url: String,
    include_tools: Option<Vec<String>>,
    exclude_tools: Option<Vec<String>>,
}

impl StrataToolHandler {
    /// Create a new tool handler. `public_url` is the base the read-path server is
    /// reachable at, used to turn locators into links.
    pub fn new(
        repository: Arc<ArtifactRepository>,
        public_url: impl Into<String>,
        include_tools: Option<Vec<String>>,
        exclude_tools: Option<Vec<String>>,
    ) -> Self {
        Self {
            repository,
            public_url: public_url.into(),
            include_tools,
            exclude_tools,
        }
    }

    /// Check if a tool should be available based on filters
    fn is_tool_available(&self, tool_name: &str) -> bool {
        if let Some(ref include) = self.include_tools {
            include.iter().any(|t| tool_name.contains(t))
        } else if let Some(ref exclude) = self.exclude_tools {
            !exclude.iter().any(|t| tool_name.contains(t))
        } else {
            true
        }
    }

    fn url(&self, locator: &Locator) -> String {
        locator.to_url(&self.public_url)
    }

    fn iframe_hint(url: &str) -> String {
        format!(
            "You can render this artifact using:\n<iframe src=\"{}\" width=\"100%\" height=\"600\"></iframe>",
            url
        )
    }

    /// Create a new artifact, or append a version if it already exists
    async fn store_artifact(&self, request: StoreRequest) -> Result<CallToolResult, ErrorData> {
        let outcome = match self
            .repository
            .create(
                &request.workspace,
                &request.id,
                request.html.as_bytes(),
                request.description,
                request.changelog,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Ok(failure("store artifact", &e)),
        };

        let url = self.url(&outcome.locator);
        Ok(success(format!(
            "Successfully stored artifact \"{}\" in workspace \"{}\".\n\nVersion: {}\nURL: {}\n\n{}",
            request.id,
            request.workspace,
            outcome.version,
            url,
            Self::iframe_hint(&url)
        )))
    }

    /// Append a new version to an existing artifact
    async fn update_artifact(&self, request: UpdateRequest) -> Result<CallToolResult, ErrorData> {
        let outcome = match self
            .repository
            .update(
                &request.workspace,
                &request.id,
                request.html.as_bytes(),
                request.changelog,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Ok(failure("update artifact", &e)),
        };

        let latest = self.url(&outcome.locator);
        let this_version = self.url(&Locator::version(
            &request.workspace,
            &request.id,
            outcome.version,
        ));
        Ok(success(format!(
            "Successfully updated artifact \"{}\" in workspace \"{}\".\n\nNew version: {}\nLatest URL: {}\nThis version: {}\n\n{}",
            request.id,
            request.workspace,
            outcome.version,
            latest,
            this_version,
            Self::iframe_hint(&latest)
        )))
    }

    /// Return artifact content
    async fn get_artifact(&self, request: ArtifactRequest) -> Result<CallToolResult, ErrorData> {
        match self
            .repository
            .read(&request.workspace, &request.id, request.version)
            .await
        {
            Ok(bytes) => Ok(success(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) => Ok(failure("get artifact", &e)),
        }
    }

    /// Resolve the URL of an artifact or one of its versions
    async fn get_artifact_url(&self, request: ArtifactRequest) -> Result<CallToolResult, ErrorData> {
        let locator = match self
            .repository
            .locator(&request.workspace, &request.id, request.version)
            .await
        {
            Ok(locator) => locator,
            Err(e) => return Ok(failure("get artifact URL", &e)),
        };
        let url = self.url(&locator);

        let mut text = format!("Artifact URL: {}\n\n", url);
        if let Ok(metadata) = self
            .repository
            .metadata(&request.workspace, &request.id)
            .await
        {
            text.push_str(&format!("Current version: {}\n", metadata.current_version));
            text.push_str(&format!("Total versions: {}\n", metadata.versions.len()));
            if let Some(description) = &metadata.description {
                text.push_str(&format!("Description: {}\n", description));
            }
        }
        text.push('\n');
        text.push_str(&Self::iframe_hint(&url));

        Ok(success(text))
    }

    async fn list_workspaces(&self) -> Result<CallToolResult, ErrorData> {
        let workspaces = match self.repository.list_workspaces().await {
            Ok(workspaces) => workspaces,
            Err(e) => return Ok(failure("list workspaces", &e)),
        };

        if workspaces.is_empty() {
            return Ok(success(
                "No workspaces found. Create your first artifact using the store_artifact tool."
                    .to_string(),
            ));
        }

        let list = workspaces
            .iter()
            .map(|ws| format!("• {}", ws))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(success(format!(
            "Found {} workspace{}:\n\n{}\n\nView artifacts in a workspace using the list_workspace_artifacts tool.",
            workspaces.len(),
            plural(workspaces.len()),
            list
        )))
    }

    async fn list_workspace_artifacts(
        &self,
        request: WorkspaceRequest,
    ) -> Result<CallToolResult, ErrorData> {
        let artifacts = match self.repository.list_artifacts(&request.workspace).await {
            Ok(artifacts) => artifacts,
            Err(e) => return Ok(failure("list artifacts", &e)),
        };

        if artifacts.is_empty() {
            return Ok(success(format!(
                "No artifacts found in workspace \"{}\". Use the store_artifact tool to create one.",
                request.workspace
            )));
        }

        let list = artifacts
            .iter()
            .map(|artifact| {
                let url = self.url(&Locator::latest(&artifact.workspace, &artifact.id));
                let mut entry = format!(
                    "• {} (v{})\n  URL: {}\n  Updated: {}",
                    artifact.id,
                    artifact.current_version,
                    url,
                    artifact.updated_at.to_rfc3339()
                );
                if let Some(description) = &artifact.description {
                    entry.push_str(&format!("\n  Description: {}", description));
                }
                entry
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(success(format!(
            "Found {} artifact{} in workspace \"{}\":\n\n{}",
            artifacts.len(),
            plural(artifacts.len()),
            request.workspace,
            list
        )))
    }

    async fn list_artifact_versions(
        &self,
        request: HistoryRequest,
    ) -> Result<CallToolResult, ErrorData> {
        let metadata = match self
            .repository
            .metadata(&request.workspace, &request.id)
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => return Ok(failure("list versions", &e)),
        };

        let list = metadata
            .versions
            .iter()
            .rev()
            .map(|v| {
                format!(
                    "• v{} ({} bytes, {}){}\n  {}\n  URL: {}",
                    v.version,
                    v.size,
                    v.timestamp.to_rfc3339(),
                    if v.version == metadata.current_version {
                        " [current]"
                    } else {
                        ""
                    },
                    v.changelog.as_deref().unwrap_or(""),
                    self.url(&Locator::version(&metadata.workspace, &metadata.id, v.version))
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(success(format!(
            "Artifact \"{}\" in workspace \"{}\" has {} version{}:\n\n{}",
            metadata.id,
            metadata.workspace,
            metadata.versions.len(),
            plural(metadata.versions.len()),
            list
        )))
    }

    async fn revert_artifact(&self, request: RevertRequest) -> Result<CallToolResult, ErrorData> {
        let outcome = match self
            .repository
            .revert(&request.workspace, &request.id, request.version)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Ok(failure("revert artifact", &e)),
        };

        Ok(success(format!(
            "Reverted artifact \"{}\" in workspace \"{}\" to the content of version {}.\n\nNew version: {}\nLatest URL: {}",
            request.id,
            request.workspace,
            request.version,
            outcome.version,
            self.url(&outcome.locator)
        )))
    }

    /// Clear residue of interrupted writes so the artifact accepts writes again
    async fn sweep_artifact(&self, request: HistoryRequest) -> Result<CallToolResult, ErrorData> {
        let removed = match self
            .repository
            .sweep_orphans(&request.workspace, &request.id)
            .await
        {
            Ok(removed) => removed,
            Err(e) => return Ok(failure("sweep artifact", &e)),
        };

        if removed.is_empty() {
            return Ok(success(format!(
                "No orphaned versions in artifact \"{}\" of workspace \"{}\". The latest alias matches the current version.",
                request.id, request.workspace
            )));
        }

        let list = removed
            .iter()
            .map(|v| format!("v{}", v))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(success(format!(
            "Removed orphaned version{} {} from artifact \"{}\" in workspace \"{}\". New versions can be written again.",
            plural(removed.len()),
            list,
            request.id,
            request.workspace
        )))
    }
}

fn success(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(text)],
        is_error: Some(false),
        meta: None,
        structured_content: None,
    }
}

fn failure(action: &str, error: &ServiceError) -> CallToolResult {
    tracing::warn!(action, error = %error, "tool call failed");
    CallToolResult {
        content: vec![Content::text(format!("Failed to {}: {}", action, error))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

impl ServerHandler for StrataToolHandler {
    fn get_info(&self) -> rmcp::model::InitializeResult {
        rmcp::model::InitializeResult {
            protocol_version: Default::default(),
            capabilities: rmcp::model::ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: rmcp::model::Implementation {
                name: "strata".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                title: None,
                website_url: None,
                description: None,
            },
            instructions: Some(
                "Versioned artifact store. Every store or update creates a new immutable version; \
                 earlier versions stay readable and can be reverted to."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<rmcp::model::ListToolsResult, ErrorData> {
        Ok(rmcp::model::ListToolsResult {
            tools: self.available_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = serde_json::Value::Object(params.arguments.unwrap_or_default());
        self.dispatch(&params.name, arguments).await
    }
}

impl StrataToolHandler {
    fn available_tools(&self) -> Vec<rmcp::model::Tool> {
        use rmcp::model::Tool;

        // Helper macro to convert schema to JSON
        macro_rules! schema_to_json {
            ($type:ty) => {{
                let schema = schemars::schema_for!($type);
                let value = serde_json::to_value(schema).unwrap_or_default();
                if let serde_json::Value::Object(map) = value {
                    Arc::new(map)
                } else {
                    Arc::new(serde_json::Map::new())
                }
            }};
        }

        macro_rules! tool {
            ($name:expr, $description:expr, $type:ty) => {
                Tool {
                    name: $name.into(),
                    description: Some($description.into()),
                    input_schema: schema_to_json!($type),
                    title: None,
                    output_schema: None,
                    annotations: None,
                    execution: None,
                    icons: None,
                    meta: None,
                }
            };
        }

        let all_tools = vec![
            tool!(
                "store_artifact",
                "Store an HTML artifact in a workspace. Creates version 1, or a new version if the id already exists",
                StoreRequest
            ),
            tool!(
                "update_artifact",
                "Add a new version to an existing artifact",
                UpdateRequest
            ),
            tool!(
                "get_artifact",
                "Get artifact content (latest or a specific version)",
                ArtifactRequest
            ),
            tool!(
                "get_artifact_url",
                "Get the URL of an artifact or one of its versions",
                ArtifactRequest
            ),
            tool!("list_workspaces", "List workspaces containing artifacts", EmptyRequest),
            tool!(
                "list_workspace_artifacts",
                "List artifacts in a workspace, most recently updated first",
                WorkspaceRequest
            ),
            tool!(
                "list_artifact_versions",
                "Show the version history of an artifact",
                HistoryRequest
            ),
            tool!(
                "sweep_artifact",
                "Remove version slots left behind by interrupted writes. Use when store or update reports that a version already exists",
                HistoryRequest
            ),
            tool!(
                "revert_artifact",
                "Create a new version with the content of an earlier version",
                RevertRequest
            ),
        ];

        all_tools
            .into_iter()
            .filter(|tool| self.is_tool_available(&tool.name))
            .collect()
    }

    async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, ErrorData> {
        if !self.is_tool_available(name) {
            return Err(ErrorData::new(
                rmcp::model::ErrorCode(-32601),
                format!("Tool not available: {}", name),
                None,
            ));
        }

        fn parse<T: serde::de::DeserializeOwned>(
            arguments: serde_json::Value,
        ) -> Result<T, ErrorData> {
            serde_json::from_value(arguments)
                .map_err(|e| ErrorData::invalid_params(e.to_string(), None))
        }

        match name {
            "store_artifact" => self.store_artifact(parse(arguments)?).await,
            "update_artifact" => self.update_artifact(parse(arguments)?).await,
            "get_artifact" => self.get_artifact(parse(arguments)?).await,
            "get_artifact_url" => self.get_artifact_url(parse(arguments)?).await,
            "list_workspaces" => self.list_workspaces().await,
            "list_workspace_artifacts" => self.list_workspace_artifacts(parse(arguments)?).await,
            "list_artifact_versions" => self.list_artifact_versions(parse(arguments)?).await,
            "revert_artifact" => self.revert_artifact(parse(arguments)?).await,
            "sweep_artifact" => self.sweep_artifact(parse(arguments)?).await,
            _ => Err(ErrorData::new(
                rmcp::model::ErrorCode(-32601),
                format!("Unknown tool: {}", name),
                None,
            )),
        }
    }
}

// Request types

#[derive(Debug, Deserialize, JsonSchema)]
struct StoreRequest {
    /// Workspace grouping related artifacts
    workspace: String,
    /// Artifact identifier (letters, digits, hyphens, underscores)
    id: String,
    /// HTML content of the artifact
    html: String,
    /// Optional description, only recorded when the artifact is first created
    description: Option<String>,
    /// Optional description of this version
    changelog: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateRequest {
    workspace: String,
    id: String,
    /// Updated HTML content
    html: String,
    /// What changed in this version
    changelog: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ArtifactRequest {
    workspace: String,
    id: String,
    /// Specific version number, defaults to latest
    version: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WorkspaceRequest {
    workspace: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HistoryRequest {
    workspace: String,
    id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RevertRequest {
    workspace: String,
    id: String,
    /// Version whose content becomes the new latest version
    version: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EmptyRequest {}
