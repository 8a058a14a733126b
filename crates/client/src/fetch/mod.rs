//! Caching HTTP fetch wrapper.
//!
//! ### Flow
//! - Canonicalize the URL and derive the cache key from it plus whether a
//!   token is attached (never the token itself).
//! - A live cache entry is returned as-is, with no network call.
//! - On a miss, GET the URL. Non-success responses become `ApiError`s and
//!   are never cached, so the next call retries the network.
//! - Successful JSON bodies are cached with the request's TTL, or the
//!   cache's default.
//!
//! ### Not handled here
//! - Retries and backoff: callers decide, e.g. via `is_rate_limit_error`.
//! - Deduplication of concurrent identical requests: overlapping calls for
//!   one key may each reach the network; the last write wins.

pub mod failure;
pub mod url;

use std::sync::Arc;
use std::time::{Duration, Instant};

use presetsync_core::cache::{AccessClass, class_cache_key};
use presetsync_core::{ApiCache, AppConfig, Error, generate_cache_key, init_api_cache};
use reqwest::{Client, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use failure::api_error_from_response;
pub use self::url::{UrlError, canonicalize};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "presetsync/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "presetsync/0.1".to_string(), timeout: Duration::from_millis(20_000) }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout() }
    }
}

/// Per-request options.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Bearer token sent with the request.
    pub token: Option<String>,
    /// TTL for a freshly fetched response; the cache default when unset.
    pub cache_ttl: Option<Duration>,
}

impl FetchOptions {
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// The token, if set and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions")
            .field("token", &self.token().map(|_| "<redacted>"))
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Payload returned by [`CachingFetcher::cached_fetch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedResponse<T> {
    pub data: T,
    /// Whether the payload was served without a network call.
    pub from_cache: bool,
}

/// HTTP client that serves repeated JSON GETs from an [`ApiCache`].
#[derive(Debug, Clone)]
pub struct CachingFetcher {
    http: Client,
    cache: Arc<ApiCache<Value>>,
    config: FetchConfig,
}

impl CachingFetcher {
    /// Create a fetcher backed by `cache`.
    pub fn new(config: FetchConfig, cache: Arc<ApiCache<Value>>) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, cache, config })
    }

    /// Create a fetcher using the process-wide cache sized from `config`.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let cache = init_api_cache(config.cache_max_entries, config.default_ttl());
        Self::new(FetchConfig::from(config), cache)
    }

    /// Cache key a request for `url` would use.
    pub fn cache_key(url: &str, token: Option<&str>) -> Result<String, Error> {
        Self::class_cache_key(url, AccessClass::for_token(token))
    }

    /// Cache key for `url` under an explicit access class.
    pub fn class_cache_key(url: &str, class: AccessClass) -> Result<String, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(class_cache_key(url.as_str(), class))
    }

    /// GET `url` as JSON, serving from and filling the cache.
    ///
    /// Failed requests, including bodies that do not decode as `T`, leave
    /// the cache untouched.
    pub async fn cached_fetch<T: DeserializeOwned>(
        &self, url: &str, options: &FetchOptions,
    ) -> Result<CachedResponse<T>, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let key = generate_cache_key(url.as_str(), options.token());

        if let Some(value) = self.cache.get(&key) {
            tracing::debug!(key = %key, "cache hit");
            let data = serde_json::from_value(value).map_err(|e| Error::Parse(format!("cached {url}: {e}")))?;
            return Ok(CachedResponse { data, from_cache: true });
        }

        tracing::debug!(key = %key, "cache miss");

        let value = self.fetch_json(&url, options.token()).await?;
        let data = serde_json::from_value(value.clone()).map_err(|e| Error::Parse(format!("{url}: {e}")))?;

        self.cache.set(key, value, options.cache_ttl);

        Ok(CachedResponse { data, from_cache: false })
    }

    /// Perform the network request, classifying failures.
    async fn fetch_json(&self, url: &reqwest::Url, token: Option<&str>) -> Result<Value, Error> {
        let start = Instant::now();

        let mut request = self.http.get(url.as_str()).header(header::ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| network_error(url, e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| network_error(url, e))?;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        if !status.is_success() {
            return Err(api_error_from_response(status, &bytes).into());
        }

        serde_json::from_slice(&bytes).map_err(|e| Error::Parse(format!("{url}: {e}")))
    }

    /// The cache backing this fetcher.
    pub fn cache(&self) -> &Arc<ApiCache<Value>> {
        &self.cache
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn network_error(url: &reqwest::Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("request to {url} timed out"))
    } else {
        Error::Network { url: url.to_string(), reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use presetsync_core::cache::ManualClock;
    use presetsync_core::{ErrorValue, error_message, is_rate_limit_error};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Repo {
        full_name: String,
        stargazers_count: u32,
    }

    fn fetcher_with(cache: Arc<ApiCache<Value>>) -> CachingFetcher {
        CachingFetcher::new(FetchConfig::default(), cache).unwrap()
    }

    fn fresh_fetcher() -> CachingFetcher {
        fetcher_with(Arc::new(ApiCache::new(100, Duration::from_secs(60))))
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "presetsync/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20_000));
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), timeout_ms: 5_000, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_fetch_options_debug_redacts_token() {
        let options = FetchOptions::default().with_token("ghp_secret");
        let debug = format!("{options:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_cache_key_uses_canonical_url() {
        let key = CachingFetcher::cache_key("API.github.com/repos/acme/p#readme", Some("tok")).unwrap();
        assert_eq!(key, "https://api.github.com/repos/acme/p:auth");
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/presets");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"full_name": "acme/presets", "stargazers_count": 7}));
            })
            .await;

        let fetcher = fresh_fetcher();
        let url = server.url("/repos/acme/presets");

        let first: CachedResponse<Repo> = fetcher.cached_fetch(&url, &FetchOptions::default()).await.unwrap();
        assert!(!first.from_cache);
        mock.assert_calls_async(1).await;

        let second: CachedResponse<Repo> = fetcher.cached_fetch(&url, &FetchOptions::default()).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.data, first.data);
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/missing");
                then.status(404)
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "Not Found", "documentation_url": "https://docs.github.com/rest"}));
            })
            .await;

        let fetcher = fresh_fetcher();
        let url = server.url("/repos/acme/missing");

        let err = fetcher.cached_fetch::<Value>(&url, &FetchOptions::default()).await.unwrap_err();
        let Error::Api(api) = &err else { panic!("expected API error, got {err:?}") };
        assert_eq!(api.status, 404);
        assert!(api.message.to_lowercase().contains("not found"));

        let key = CachingFetcher::cache_key(&url, None).unwrap();
        assert!(!fetcher.cache().has(&key));

        let _ = fetcher.cached_fetch::<Value>(&url, &FetchOptions::default()).await;
        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_token_sent_and_cached_separately() {
        let server = MockServer::start_async().await;
        let authed = server
            .mock_async(|when, then| {
                when.method(GET).path("/user/repos").header("authorization", "Bearer ghp_secret");
                then.status(200).json_body(json!({"private": true}));
            })
            .await;
        let anonymous = server
            .mock_async(|when, then| {
                when.method(GET).path("/user/repos").header_missing("authorization");
                then.status(200).json_body(json!({"private": false}));
            })
            .await;

        let fetcher = fresh_fetcher();
        let url = server.url("/user/repos");
        let with_token = FetchOptions::default().with_token("ghp_secret");

        let private: CachedResponse<Value> = fetcher.cached_fetch(&url, &with_token).await.unwrap();
        let public: CachedResponse<Value> = fetcher.cached_fetch(&url, &FetchOptions::default()).await.unwrap();

        assert_eq!(private.data["private"], json!(true));
        assert_eq!(public.data["private"], json!(false));
        assert!(!public.from_cache);
        authed.assert_calls_async(1).await;
        anonymous.assert_calls_async(1).await;

        let auth_key = CachingFetcher::cache_key(&url, Some("ghp_secret")).unwrap();
        assert!(auth_key.ends_with(":auth"));
        assert!(!auth_key.contains("ghp_secret"));
        assert!(fetcher.cache().has(&auth_key));
    }

    #[tokio::test]
    async fn test_cache_ttl_override_expires() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/rate_limit");
                then.status(200).json_body(json!({"remaining": 59}));
            })
            .await;

        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(ApiCache::with_clock(100, Duration::from_secs(3600), clock.clone()));
        let fetcher = fetcher_with(cache);
        let url = server.url("/rate_limit");
        let options = FetchOptions::default().with_cache_ttl(Duration::from_secs(10));

        fetcher.cached_fetch::<Value>(&url, &options).await.unwrap();
        clock.advance(Duration::from_secs(9));
        assert!(fetcher.cached_fetch::<Value>(&url, &options).await.unwrap().from_cache);

        clock.advance(Duration::from_secs(2));
        assert!(!fetcher.cached_fetch::<Value>(&url, &options).await.unwrap().from_cache);
        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_rate_limit_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/presets");
                then.status(403).json_body(json!({
                    "message": "API rate limit exceeded for 203.0.113.5.",
                    "documentation_url": "https://docs.github.com/rest/overview/rate-limits-for-the-rest-api"
                }));
            })
            .await;

        let fetcher = fresh_fetcher();
        let err = fetcher
            .cached_fetch::<Value>(&server.url("/repos/acme/presets"), &FetchOptions::default())
            .await
            .unwrap_err();

        let value = ErrorValue::from(err);
        assert!(is_rate_limit_error(&value));
        assert!(!error_message(&value).contains("203.0.113.5"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error_and_not_cached() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(200).body("not json");
            })
            .await;

        let fetcher = fresh_fetcher();
        let url = server.url("/broken");
        let result = fetcher.cached_fetch::<Value>(&url, &FetchOptions::default()).await;

        assert!(matches!(result, Err(Error::Parse(_))));
        assert_eq!(fetcher.cache().stats().size, 0);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_not_cached() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/presets");
                then.status(200).json_body(json!([1, 2, 3]));
            })
            .await;

        let fetcher = fresh_fetcher();
        let result = fetcher
            .cached_fetch::<Repo>(&server.url("/repos/acme/presets"), &FetchOptions::default())
            .await;

        assert!(matches!(result, Err(Error::Parse(_))));
        assert_eq!(fetcher.cache().stats().size, 0);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let fetcher = fresh_fetcher();
        let result = fetcher.cached_fetch::<Value>("ftp://example.com/x", &FetchOptions::default()).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let fetcher = fresh_fetcher();
        let result = fetcher
            .cached_fetch::<Value>("http://127.0.0.1:9/unreachable", &FetchOptions::default())
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Network { .. } | Error::Timeout(_)));
        assert_eq!(fetcher.cache().stats().size, 0);
    }
}
