// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{CacheError, Result};
use config::{Config, Environment, File};
use reqwest::Url;
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file (`path`, or `~/.precache/config.toml`)
    /// 3. Defaults (lowest)
    ///
    /// CLI overrides are applied on top by the caller.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            // PRECACHE_SERVER__PORT=9000, PRECACHE_CACHE__NAME=app-cache-v2
            .add_source(
                Environment::with_prefix("PRECACHE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CacheError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| CacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the type system cannot.
    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;
        if self.cache.name.trim().is_empty() {
            return Err(CacheError::Config("cache.name must not be empty".to_string()));
        }
        Ok(())
    }

    /// The upstream origin as a base URL.
    ///
    /// A trailing slash is appended when missing so that relative manifest
    /// entries resolve beneath the origin's path instead of replacing its
    /// last segment.
    pub fn origin_url(&self) -> Result<Url> {
        let raw = if self.cache.origin.ends_with('/') {
            self.cache.origin.clone()
        } else {
            format!("{}/", self.cache.origin)
        };
        let url = Url::parse(&raw)
            .map_err(|e| CacheError::Config(format!("invalid cache.origin {:?}: {}", self.cache.origin, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(CacheError::Config(format!(
                "cache.origin must be http or https, got {}",
                other
            ))),
        }
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".precache")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
