//! import_presets tool implementation.
//!
//! Loads URL presets from a GitHub repository directory.

use presetsync_client::{GithubClient, RepoRef};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for import_presets tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportPresetsParams {
    /// Repository as `owner/repo`, `owner/repo/dir` or a github.com URL.
    pub repo: String,

    /// Directory holding the preset files. Overrides any path in `repo`.
    #[serde(default)]
    pub path: Option<String>,

    /// Branch, tag or commit to read from (default: the repository's default branch).
    #[serde(default)]
    pub git_ref: Option<String>,
}

/// Implementation of the import_presets tool.
pub async fn import_impl(github: &GithubClient, params: ImportPresetsParams) -> Result<CallToolResult, McpError> {
    let mut repo = RepoRef::parse(&params.repo)?;
    if let Some(path) = params.path {
        repo = repo.with_path(path);
    }
    if let Some(git_ref) = params.git_ref.filter(|r| !r.trim().is_empty()) {
        repo = repo.with_ref(git_ref);
    }

    let result = github.import_presets(&repo).await?;
    json_result(&result)
}
