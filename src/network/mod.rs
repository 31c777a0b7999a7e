// Network access used for install-time population and cache misses
// Author: kelexine (https://github.com/kelexine)

mod client;

pub use client::HttpNetwork;

use crate::cache::{CachedResponse, ResourceRequest};
use crate::error::FetchError;
use async_trait::async_trait;

/// Performs a live fetch for a request.
///
/// Implementations return any HTTP status as `Ok`; only transport failures
/// are errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest) -> Result<CachedResponse, FetchError>;
}

/// Headers that describe a single connection and must not be forwarded.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Whether `name` should be dropped when relaying a request or response.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}
