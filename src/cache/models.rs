//! Request, response and statistics models for the asset cache.

// Author: kelexine (https://github.com/kelexine)

use bytes::Bytes;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

/// Configuration for an [`AssetCacheManager`](super::AssetCacheManager).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name of the bucket the manager owns.
    pub name: String,
    /// Resources fetched at install time.
    pub manifest: super::AssetManifest,
    /// Base URL relative manifest entries resolve against.
    pub origin: Url,
}

/// An incoming request to be answered from the cache or the network.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: Url,
    /// End-to-end request headers, forwarded on a cache miss.
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl ResourceRequest {
    /// A bare `GET` for `url`, as issued for manifest entries.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// The identity this request is stored and matched under.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Cache identity of a request: method plus URL without its fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_string(),
            url: url.to_string(),
        }
    }
}

/// A response as stored in a bucket or returned from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(with = "body_base64")]
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive lookup of the first header called `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Statistics for cache operations.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    /// Fetch events answered from the bucket.
    pub hits: u64,
    /// Fetch events forwarded to the network.
    pub misses: u64,
    /// Forwarded fetches that failed at the transport level.
    pub network_errors: u64,
}

/// Lifecycle of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Install has not completed successfully.
    Uninitialized,
    /// Every manifest entry is in the bucket.
    Populated,
    /// Activated and answering fetch events.
    Serving,
}

mod body_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_fragment_but_not_query() {
        let plain = Url::parse("http://localhost/app.js").unwrap();
        let fragment = Url::parse("http://localhost/app.js#main").unwrap();
        let query = Url::parse("http://localhost/app.js?v=2").unwrap();

        assert_eq!(RequestKey::new(&Method::GET, &plain), RequestKey::new(&Method::GET, &fragment));
        assert_ne!(RequestKey::new(&Method::GET, &plain), RequestKey::new(&Method::GET, &query));
        assert_ne!(RequestKey::new(&Method::GET, &plain), RequestKey::new(&Method::HEAD, &plain));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = CachedResponse::new(200, "ok").with_header("Content-Type", "text/html");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("vary"), None);
    }

    #[test]
    fn test_body_serializes_as_base64() {
        let response = CachedResponse::new(200, vec![0u8, 159, 146, 150]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["body"], "AJ+Slg==");

        let back: CachedResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, response);
    }
}
