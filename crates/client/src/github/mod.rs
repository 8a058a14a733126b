//! Preset import from GitHub repositories.
//!
//! A preset directory is listed through the contents API and every `.json`
//! file in it is downloaded through the [`CachingFetcher`], so repeated
//! imports of an unchanged repository are served from the cache. Files that
//! are not preset files are reported as skipped; API failures abort the
//! import.
//!
//! The configured token only travels to the API origin and to
//! `raw.githubusercontent.com`; download URLs elsewhere are fetched
//! anonymously.

pub mod preset;
pub mod repo;

use std::time::Duration;

use presetsync_core::{AppConfig, Error};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::fetch::{CachingFetcher, FetchOptions, canonicalize};

pub use preset::{ContentEntry, ContentListing, Preset, PresetParam, parse_presets};
pub use repo::RepoRef;

/// Host serving `download_url`s for files in public and private repositories.
pub const RAW_CONTENT_HOST: &str = "raw.githubusercontent.com";

/// Settings for the GitHub importer.
#[derive(Clone)]
pub struct GithubConfig {
    /// API base URL (default: "https://api.github.com")
    pub api_url: String,
    /// Personal access token for authenticated requests.
    pub token: Option<String>,
    /// Directory listed when a reference names none (default: "presets")
    pub presets_path: String,
    /// TTL for directory listings (default: 5m)
    pub listing_ttl: Duration,
    /// TTL for preset file bodies (default: 10m)
    pub file_ttl: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            presets_path: "presets".to_string(),
            listing_ttl: Duration::from_secs(5 * 60),
            file_ttl: Duration::from_secs(10 * 60),
        }
    }
}

impl From<&AppConfig> for GithubConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_url: config.github_api_url.clone(),
            token: config.github_token().map(str::to_string),
            presets_path: config.presets_path.clone(),
            listing_ttl: config.default_ttl(),
            file_ttl: config.default_ttl().saturating_mul(2),
        }
    }
}

impl GithubConfig {
    /// Whether `url` shares the configured API's scheme, host and port.
    pub fn is_api_origin(&self, url: &Url) -> bool {
        Url::parse(&self.api_url).is_ok_and(|api| api.origin() == url.origin())
    }

    /// Whether the token may accompany a request to `url`.
    pub fn is_token_origin(&self, url: &Url) -> bool {
        self.is_api_origin(url) || (url.scheme() == "https" && url.host_str() == Some(RAW_CONTENT_HOST))
    }
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("presets_path", &self.presets_path)
            .field("listing_ttl", &self.listing_ttl)
            .field("file_ttl", &self.file_ttl)
            .finish()
    }
}

/// A file left out of an import.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Outcome of [`GithubClient::import_presets`].
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ImportResult {
    pub presets: Vec<Preset>,
    /// Paths of the files the presets came from.
    pub files: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// True when no request reached the network.
    pub from_cache: bool,
}

/// GitHub preset importer.
#[derive(Debug, Clone)]
pub struct GithubClient {
    fetcher: CachingFetcher,
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(fetcher: CachingFetcher, config: GithubConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn from_app_config(fetcher: CachingFetcher, config: &AppConfig) -> Self {
        Self::new(fetcher, GithubConfig::from(config))
    }

    /// The configured token, if non-empty.
    pub fn token(&self) -> Option<&str> {
        self.config.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Token for a caller-requested authenticated fetch of `url`.
    ///
    /// Fails when no token is configured or `url` is not on the API origin.
    pub fn token_for_api(&self, url: &str) -> Result<&str, Error> {
        let token = self.token().ok_or_else(|| {
            Error::InvalidInput("authenticated fetch requested but PRESETSYNC_GITHUB_TOKEN is not set".into())
        })?;

        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !self.config.is_api_origin(&url) {
            return Err(Error::InvalidInput(format!(
                "authenticated fetch is only allowed for {}, not {}",
                self.config.api_url,
                url.host_str().unwrap_or_default()
            )));
        }

        Ok(token)
    }

    /// Fetch options for `url`, carrying the token only to trusted origins.
    fn options(&self, url: &str, ttl: Duration) -> FetchOptions {
        let trusted = canonicalize(url).is_ok_and(|url| self.config.is_token_origin(&url));
        let token = if trusted { self.token().map(str::to_string) } else { None };

        if !trusted && self.token().is_some() {
            tracing::debug!("sending request to {} without the GitHub token", url);
        }

        FetchOptions { token, cache_ttl: Some(ttl) }
    }

    /// List the preset files in the referenced directory.
    ///
    /// Returns the entries and whether the listing came from the cache.
    pub async fn list_preset_files(&self, repo: &RepoRef) -> Result<(Vec<ContentEntry>, bool), Error> {
        let url = repo.contents_url(&self.config.api_url, &self.config.presets_path)?;
        let response = self
            .fetcher
            .cached_fetch::<ContentListing>(url.as_str(), &self.options(url.as_str(), self.config.listing_ttl))
            .await?;

        let mut files: Vec<ContentEntry> =
            response.data.into_entries().into_iter().filter(ContentEntry::is_preset_file).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok((files, response.from_cache))
    }

    /// Import every preset in the referenced directory.
    pub async fn import_presets(&self, repo: &RepoRef) -> Result<ImportResult, Error> {
        let (entries, mut from_cache) = self.list_preset_files(repo).await?;
        let mut result = ImportResult { presets: Vec::new(), files: Vec::new(), skipped: Vec::new(), from_cache: false };

        for entry in entries {
            let Some(download_url) = entry.download_url.as_deref() else { continue };

            let options = self.options(download_url, self.config.file_ttl);
            let value = match self.fetcher.cached_fetch::<Value>(download_url, &options).await {
                Ok(response) => {
                    from_cache &= response.from_cache;
                    response.data
                }
                Err(Error::Parse(reason)) => {
                    tracing::warn!(path = %entry.path, "skipping preset file: {}", reason);
                    result.skipped.push(SkippedFile { path: entry.path, reason });
                    from_cache = false;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match parse_presets(value) {
                Ok(presets) => {
                    result.presets.extend(presets);
                    result.files.push(entry.path);
                }
                Err(reason) => {
                    tracing::warn!(path = %entry.path, "skipping preset file: {}", reason);
                    result.skipped.push(SkippedFile { path: entry.path, reason });
                }
            }
        }

        result.from_cache = from_cache;

        tracing::info!(
            "imported {} presets from {} ({} files, {} skipped, from_cache={})",
            result.presets.len(),
            repo.full_name(),
            result.files.len(),
            result.skipped.len(),
            result.from_cache
        );

        Ok(result)
    }

    pub fn fetcher(&self) -> &CachingFetcher {
        &self.fetcher
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }
}
