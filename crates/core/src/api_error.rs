//! Upstream API failures and their user-facing classification.
//!
//! [`ApiError`] turns a failed response into a message that is safe to show
//! as-is: rate-limit texts have client IP addresses stripped and nothing
//! derived from credentials is ever included. [`ErrorValue`] is the closed
//! set of error shapes a caller may need to present, so that
//! [`error_message`] and [`is_rate_limit_error`] are total.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

const NETWORK_ERROR_MESSAGE: &str = "Network error. Check your internet connection and try again.";
const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";
const DEFAULT_RATE_LIMIT_HEADLINE: &str = "API rate limit exceeded";

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\s+for)?\s*\b\d{1,3}(?:\.\d{1,3}){3}\b").expect("IPv4 pattern is valid")
});

/// Broad category of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    Unauthorized,
    NotFound,
    Server,
    Other,
}

/// A failed upstream API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub status_text: String,
    /// Raw `message` from the upstream error body.
    pub api_message: Option<String>,
    pub documentation_url: Option<String>,
    /// Human-readable message derived at construction.
    pub message: String,
}

impl ApiError {
    pub fn new(
        status: u16, status_text: impl Into<String>, api_message: Option<String>, documentation_url: Option<String>,
    ) -> Self {
        let status_text = status_text.into();
        let message = derive_message(status, &status_text, api_message.as_deref());
        Self { status, status_text, api_message, documentation_url, message }
    }

    /// Whether the upstream message mentions a rate limit.
    fn mentions_rate_limit(&self) -> bool {
        self.api_message.as_deref().is_some_and(mentions_rate_limit)
    }

    /// True for 429, or 403 with a rate-limit message.
    pub fn is_rate_limit(&self) -> bool {
        self.status == 429 || (self.status == 403 && self.mentions_rate_limit())
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_rate_limit() || self.mentions_rate_limit() {
            ErrorKind::RateLimited
        } else if self.status == 401 {
            ErrorKind::Unauthorized
        } else if self.status == 404 {
            ErrorKind::NotFound
        } else if self.status >= 500 {
            ErrorKind::Server
        } else {
            ErrorKind::Other
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Server)
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    text.to_lowercase().contains("rate limit")
}

/// Remove IPv4-looking substrings (and a dangling "for") from upstream text.
fn strip_ipv4(text: &str) -> String {
    let stripped = IPV4.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn derive_message(status: u16, status_text: &str, api_message: Option<&str>) -> String {
    if let Some(api_message) = api_message
        && mentions_rate_limit(api_message)
    {
        let detail = strip_ipv4(api_message);
        let headline = detail.split(". ").next().unwrap_or_default().trim().trim_end_matches('.').trim();
        let headline = if headline.is_empty() { DEFAULT_RATE_LIMIT_HEADLINE } else { headline };
        return format!("Rate limit exceeded: {headline}. Try again later or provide a token for a higher limit.");
    }

    match status {
        401 => "Authentication required. Provide a GitHub personal access token to access this resource.".into(),
        404 => "Resource not found. Verify that the repository URL and path are correct.".into(),
        s if s >= 500 => format!("The upstream service is unavailable (HTTP {s}). Please try again later."),
        _ => match api_message.map(strip_ipv4).filter(|msg| !msg.is_empty()) {
            Some(msg) => msg,
            None => format!("Request failed: {status} {status_text}").trim_end().to_string(),
        },
    }
}

/// Any error value a caller may need to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValue {
    /// A classified upstream failure.
    Api(ApiError),
    /// Any other error, carried by its message.
    Generic(String),
    /// A bare string raised as an error.
    Text(String),
    /// Anything without a usable message.
    Other,
}

impl ErrorValue {
    /// Resolve a dynamic error into the closed union.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(api) = err.downcast_ref::<ApiError>() {
            ErrorValue::Api(api.clone())
        } else if let Some(err) = err.downcast_ref::<Error>() {
            ErrorValue::from(err)
        } else {
            ErrorValue::Generic(err.to_string())
        }
    }
}

impl From<ApiError> for ErrorValue {
    fn from(err: ApiError) -> Self {
        ErrorValue::Api(err)
    }
}

impl From<&Error> for ErrorValue {
    fn from(err: &Error) -> Self {
        match err {
            Error::Api(api) => ErrorValue::Api(api.clone()),
            other => ErrorValue::Generic(other.to_string()),
        }
    }
}

impl From<Error> for ErrorValue {
    fn from(err: Error) -> Self {
        match err {
            Error::Api(api) => ErrorValue::Api(api),
            other => ErrorValue::Generic(other.to_string()),
        }
    }
}

impl From<&str> for ErrorValue {
    fn from(text: &str) -> Self {
        ErrorValue::Text(text.to_string())
    }
}

impl From<String> for ErrorValue {
    fn from(text: String) -> Self {
        ErrorValue::Text(text)
    }
}

impl From<serde_json::Value> for ErrorValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => ErrorValue::Text(text),
            _ => ErrorValue::Other,
        }
    }
}

/// Whether `err` reports an upstream rate limit.
pub fn is_rate_limit_error(err: &ErrorValue) -> bool {
    match err {
        ErrorValue::Api(api) => api.is_rate_limit(),
        _ => false,
    }
}

/// Message suitable for showing to a user. Never fails.
pub fn error_message(err: &ErrorValue) -> String {
    match err {
        ErrorValue::Api(api) => api.message.clone(),
        ErrorValue::Generic(msg) if is_network_failure(msg) => NETWORK_ERROR_MESSAGE.to_string(),
        ErrorValue::Generic(msg) => msg.clone(),
        ErrorValue::Text(text) => text.clone(),
        ErrorValue::Other => UNEXPECTED_ERROR_MESSAGE.to_string(),
    }
}

fn is_network_failure(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("failed to fetch") || msg.contains("error sending request") || msg.starts_with("fetch_timeout")
}
