// Error types for precache
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failure of a single network fetch.
///
/// Only transport-level problems land here. A response with an error status
/// is still a successful fetch from the network's point of view.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Reasons the install phase can fail to populate the bucket.
#[derive(Error, Debug, Clone)]
pub enum InstallError {
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("bad response for {url}: HTTP {status}")]
    BadStatus { url: String, status: u16 },

    #[error("uncacheable response for {url}: {reason}")]
    Uncacheable { url: String, reason: String },

    #[error("invalid manifest entry {entry:?}: {reason}")]
    InvalidEntry { entry: String, reason: String },

    #[error("duplicate manifest entry: {0}")]
    DuplicateEntry(String),

    #[error("cache storage error: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Install failed: {0}")]
    Install(#[from] InstallError),

    #[error("Network fetch failed: {0}")]
    FetchForwarding(#[from] FetchError),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Convert CacheError to HTTP responses for Axum
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            CacheError::FetchForwarding(FetchError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, "network_error", self.to_string())
            }
            CacheError::FetchForwarding(_) => {
                (StatusCode::BAD_GATEWAY, "network_error", self.to_string())
            }
            CacheError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error", self.to_string())
            }
            CacheError::Install(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "install_error", self.to_string())
            }
            CacheError::Config(_) | CacheError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", self.to_string())
            }
            _ => {
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error", self.to_string())
            }
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
