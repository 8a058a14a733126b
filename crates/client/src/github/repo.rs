//! Repository references for preset import.

use presetsync_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// A GitHub repository, optionally narrowed to a directory and git ref.
///
/// Accepted forms:
/// - `owner/repo`
/// - `owner/repo/some/dir`
/// - `https://github.com/owner/repo`
/// - `https://github.com/owner/repo/tree/<ref>/<dir>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    /// Directory inside the repository (no leading or trailing slash).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Branch, tag or commit SHA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

impl RepoRef {
    /// Parse a repository reference.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidRepo("repository cannot be empty".into()));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Self::parse_url(trimmed);
        }

        let mut segments = trimmed.split('/');
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();
        let path: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();

        Self::build(owner, repo, &path, None)
    }

    fn parse_url(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|e| Error::InvalidRepo(format!("{input}: {e}")))?;

        match url.host_str() {
            Some("github.com") | Some("www.github.com") => {}
            other => {
                return Err(Error::InvalidRepo(format!("not a github.com URL: {}", other.unwrap_or("<none>"))));
            }
        }

        let segments: Vec<&str> = url.path_segments().map(|s| s.filter(|s| !s.is_empty()).collect()).unwrap_or_default();

        match segments.as_slice() {
            [owner, repo] => Self::build(owner, repo, &[], None),
            [owner, repo, "tree" | "blob", git_ref, path @ ..] => Self::build(owner, repo, path, Some(*git_ref)),
            _ => Err(Error::InvalidRepo(format!("expected https://github.com/<owner>/<repo>, got {input}"))),
        }
    }

    fn build(owner: &str, repo: &str, path: &[&str], git_ref: Option<&str>) -> Result<Self, Error> {
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        validate_name("owner", owner)?;
        validate_name("repository", repo)?;

        if path.iter().any(|s| *s == "..") {
            return Err(Error::InvalidRepo("path must not contain '..'".into()));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: if path.is_empty() { None } else { Some(path.join("/")) },
            git_ref: git_ref.map(str::to_string),
        })
    }

    /// Override the directory.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = path.trim_matches('/');
        self.path = if path.is_empty() { None } else { Some(path.to_string()) };
        self
    }

    /// Override the git ref.
    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// `owner/repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Contents API URL for this reference's directory, or `default_path`
    /// when none was given.
    pub fn contents_url(&self, api_base: &str, default_path: &str) -> Result<Url, Error> {
        let mut url = Url::parse(api_base).map_err(|e| Error::InvalidUrl(format!("{api_base}: {e}")))?;
        let dir = self.path.as_deref().unwrap_or(default_path);

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::InvalidUrl(format!("{api_base} cannot be a base URL")))?;
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
                .extend(dir.split('/').filter(|s| !s.is_empty()));
        }

        if let Some(git_ref) = &self.git_ref {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }

        Ok(url)
    }
}

/// Owner and repository names: 1-100 chars of ASCII alphanumerics, `-`, `_`, `.`.
fn validate_name(what: &str, name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::InvalidRepo(format!("{what} cannot be empty")));
    }

    if name.len() > 100 {
        return Err(Error::InvalidRepo(format!("{what} too long: {} chars (max 100)", name.len())));
    }

    if name == "." || name == ".." || !name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
        return Err(Error::InvalidRepo(format!("invalid {what} name: {name}")));
    }

    Ok(())
}
