//! Unified error types for presetsync.
//!
//! Each variant carries a stable category prefix in its display form.

use rmcp::model::{ErrorCode, ErrorData as McpError};

use crate::api_error::{ApiError, ErrorKind, ErrorValue, error_message};

/// Unified error types for presetsync.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream responded with a non-success status.
    #[error("API_ERROR: {0}")]
    Api(#[from] ApiError),

    /// The request never produced a response.
    #[error("NETWORK_ERROR: failed to fetch {url}: {reason}")]
    Network { url: String, reason: String },

    /// The request timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    Timeout(String),

    /// A success response body could not be decoded.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Unparseable repository reference.
    #[error("INVALID_REPO: {0}")]
    InvalidRepo(String),
}

impl Error {
    /// Whether this is an upstream rate-limit failure.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::Api(api) if api.is_rate_limit())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::InvalidUrl(_) | Error::InvalidRepo(_) => -32602,
            Error::Parse(_) => -32000,
            Error::Network { .. } => -32003,
            Error::Timeout(_) => -32006,
            Error::Api(api) => match api.kind() {
                ErrorKind::NotFound => -32001,
                ErrorKind::Server | ErrorKind::Other => -32008,
                ErrorKind::Unauthorized => -32009,
                ErrorKind::RateLimited => -32010,
            },
        };

        let message = error_message(&ErrorValue::from(err));
        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
