//! Configuration data structures for precache.
//!
//! This module defines the schema for the application settings: the HTTP
//! front, the cache bucket and its manifest, the upstream network client,
//! and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// Cache bucket, manifest and upstream origin.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Upstream HTTP client settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings for the precached asset bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Name of the cache bucket, usually carrying a version tag.
    /// Default: `app-cache-v1`
    #[serde(default = "default_cache_name")]
    pub name: String,

    /// Resource identifiers fetched and stored at install time, in order.
    /// Relative entries are resolved against `origin`.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Upstream origin that manifest entries and cache misses are fetched from.
    /// Default: `http://127.0.0.1:8000/`
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Directory holding bucket snapshots. In-memory only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_dir: Option<String>,
}

/// Settings for the upstream HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection establishment timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// User-Agent header sent upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            name: default_cache_name(),
            manifest: default_manifest(),
            origin: default_origin(),
            persist_dir: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cache_name() -> String {
    "app-cache-v1".to_string()
}

fn default_manifest() -> Vec<String> {
    ["cengine.html", "cengine.js", "cengine.wasm", "cengine.data"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_origin() -> String {
    "http://127.0.0.1:8000/".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("precache/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
