//! Classification of non-success upstream responses.

use presetsync_core::ApiError;
use reqwest::StatusCode;
use serde::Deserialize;

/// JSON error body as returned by GitHub-style APIs. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    documentation_url: Option<String>,
}

/// Build an [`ApiError`] from a failed response's status and raw body.
///
/// Bodies that are not a JSON object contribute nothing beyond the status.
pub fn api_error_from_response(status: StatusCode, body: &[u8]) -> ApiError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    ApiError::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        parsed.message.filter(|m| !m.is_empty()),
        parsed.documentation_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use presetsync_core::ErrorKind;

    #[test]
    fn test_github_rate_limit_body() {
        let body = br#"{
            "message": "API rate limit exceeded for 203.0.113.5. (But here's the good news: Authenticated requests get a higher rate limit.)",
            "documentation_url": "https://docs.github.com/rest/overview/resources-in-the-rest-api#rate-limiting"
        }"#;
        let err = api_error_from_response(StatusCode::FORBIDDEN, body);

        assert_eq!(err.status, 403);
        assert_eq!(err.status_text, "Forbidden");
        assert!(err.is_rate_limit());
        assert!(!err.message.contains("203.0.113.5"));
        assert!(err.documentation_url.unwrap().contains("rate-limiting"));
    }

    #[test]
    fn test_not_found_body() {
        let body = br#"{"message": "Not Found", "documentation_url": "https://docs.github.com/rest"}"#;
        let err = api_error_from_response(StatusCode::NOT_FOUND, body);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.api_message.as_deref(), Some("Not Found"));
    }

    #[test]
    fn test_non_json_body() {
        let err = api_error_from_response(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(err.kind(), ErrorKind::Server);
        assert!(err.api_message.is_none());
        assert!(err.documentation_url.is_none());
    }

    #[test]
    fn test_empty_message_is_ignored() {
        let err = api_error_from_response(StatusCode::CONFLICT, br#"{"message": ""}"#);
        assert!(err.api_message.is_none());
        assert_eq!(err.message, "Request failed: 409 Conflict");
    }
}
