// Asset manifest - the fixed list of resources precached at install time
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{RequestKey, ResourceRequest};
use crate::error::InstallError;
use reqwest::Url;
use std::collections::HashSet;

/// Ordered list of resource identifiers fetched during install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    entries: Vec<String>,
}

impl AssetManifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every entry against `origin` into a `GET` request.
    ///
    /// Fails on the first entry that does not parse, or that maps to a request
    /// already produced by an earlier entry.
    pub fn resolve(&self, origin: &Url) -> Result<Vec<ResourceRequest>, InstallError> {
        let mut seen: HashSet<RequestKey> = HashSet::with_capacity(self.entries.len());
        let mut requests = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            if entry.trim().is_empty() {
                return Err(InstallError::InvalidEntry {
                    entry: entry.clone(),
                    reason: "empty identifier".to_string(),
                });
            }

            let url = origin.join(entry).map_err(|e| InstallError::InvalidEntry {
                entry: entry.clone(),
                reason: e.to_string(),
            })?;

            if !matches!(url.scheme(), "http" | "https") {
                return Err(InstallError::InvalidEntry {
                    entry: entry.clone(),
                    reason: format!("unsupported scheme {}", url.scheme()),
                });
            }

            let request = ResourceRequest::get(url);
            if !seen.insert(request.key()) {
                return Err(InstallError::DuplicateEntry(request.url.to_string()));
            }
            requests.push(request);
        }

        Ok(requests)
    }
}

impl From<Vec<String>> for AssetManifest {
    fn from(entries: Vec<String>) -> Self {
        Self { entries }
    }
}
