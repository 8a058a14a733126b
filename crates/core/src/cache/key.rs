//! Cache key derivation for outbound requests.

/// Whether a request carried a credential.
///
/// Authenticated and anonymous responses for the same URL can differ
/// (private repositories, higher rate limits), so they never share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    Auth,
    Public,
}

impl AccessClass {
    /// Classify a request by credential presence. Empty tokens count as absent.
    pub fn for_token(token: Option<&str>) -> Self {
        match token {
            Some(t) if !t.is_empty() => AccessClass::Auth,
            _ => AccessClass::Public,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessClass::Auth => "auth",
            AccessClass::Public => "public",
        }
    }
}

/// Compute the cache key for a request: `<url>:<auth|public>`.
///
/// Only the presence of the token is recorded, never its value.
pub fn generate_cache_key(url: &str, token: Option<&str>) -> String {
    class_cache_key(url, AccessClass::for_token(token))
}

/// Cache key for `url` under an explicit access class.
pub fn class_cache_key(url: &str, class: AccessClass) -> String {
    format!("{url}:{}", class.as_str())
}
