// Cache storage - named buckets of request/response pairs
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{CachedResponse, RequestKey};
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Registry of named cache buckets.
///
/// Buckets are created lazily on first [`open`](Self::open). When a
/// persistence directory is configured, each bucket is mirrored to a JSON
/// snapshot and reloaded from it on the next open after a restart.
#[derive(Clone, Default)]
pub struct CacheStorage {
    buckets: Arc<RwLock<HashMap<String, CacheBucket>>>,
    persist_dir: Option<PathBuf>,
}

impl CacheStorage {
    /// Storage that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Storage backed by snapshots under `dir`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            persist_dir: Some(dir.into()),
        }
    }

    /// Open the bucket called `name`, creating it if absent.
    pub async fn open(&self, name: &str) -> Result<CacheBucket> {
        if let Some(bucket) = self.buckets.read().await.get(name) {
            return Ok(bucket.clone());
        }

        let mut buckets = self.buckets.write().await;
        // Another opener may have won the race for the write lock
        if let Some(bucket) = buckets.get(name) {
            return Ok(bucket.clone());
        }

        let snapshot = self.persist_dir.as_deref().map(|dir| snapshot_path(dir, name));
        let existing = match &snapshot {
            Some(path) => tokio::fs::try_exists(path).await?,
            None => false,
        };
        let entries = match &snapshot {
            Some(path) if existing => {
                let entries = load_snapshot(path, name).await?;
                info!("Loaded cache bucket {} with {} entries", name, entries.len());
                entries
            }
            _ => {
                debug!("Created cache bucket {}", name);
                HashMap::new()
            }
        };

        let bucket = CacheBucket {
            name: name.to_string(),
            entries: Arc::new(RwLock::new(entries)),
            snapshot,
        };
        buckets.insert(name.to_string(), bucket.clone());
        Ok(bucket)
    }

    /// Whether a bucket called `name` exists, in memory or on disk.
    pub async fn has(&self, name: &str) -> Result<bool> {
        if self.buckets.read().await.contains_key(name) {
            return Ok(true);
        }
        match &self.persist_dir {
            Some(dir) => Ok(tokio::fs::try_exists(snapshot_path(dir, name)).await?),
            None => Ok(false),
        }
    }

    /// Remove the bucket and its snapshot. Returns whether anything was deleted.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let removed = self.buckets.write().await.remove(name).is_some();

        let mut removed_snapshot = false;
        if let Some(dir) = &self.persist_dir {
            let path = snapshot_path(dir, name);
            if tokio::fs::try_exists(&path).await? {
                tokio::fs::remove_file(&path).await?;
                removed_snapshot = true;
            }
        }

        if removed || removed_snapshot {
            debug!("Deleted cache bucket {}", name);
        }
        Ok(removed || removed_snapshot)
    }

    /// Names of the buckets opened in this process, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A single named bucket. Clones share the same entries.
#[derive(Clone)]
pub struct CacheBucket {
    name: String,
    entries: Arc<RwLock<HashMap<RequestKey, CachedResponse>>>,
    snapshot: Option<PathBuf>,
}

impl CacheBucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored response for `key`, if any.
    pub async fn match_request(&self, key: &RequestKey) -> Option<CachedResponse> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &RequestKey) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn put(&self, key: RequestKey, response: CachedResponse) -> Result<()> {
        self.put_all(vec![(key, response)]).await
    }

    /// Store every pair in one commit.
    ///
    /// The write lock is held until the snapshot (if any) is written, and the
    /// in-memory map is only replaced once that succeeds, so either all
    /// entries become visible or none do.
    pub async fn put_all(&self, batch: Vec<(RequestKey, CachedResponse)>) -> Result<()> {
        let mut entries = self.entries.write().await;
        let mut staged = entries.clone();
        staged.extend(batch);

        if let Some(path) = &self.snapshot {
            write_snapshot(path, &self.name, &staged).await?;
        }

        *entries = staged;
        Ok(())
    }

    /// Remove one entry. Returns whether it was present.
    pub async fn delete(&self, key: &RequestKey) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            return Ok(false);
        }

        let mut staged = entries.clone();
        staged.remove(key);
        if let Some(path) = &self.snapshot {
            write_snapshot(path, &self.name, &staged).await?;
        }
        *entries = staged;
        Ok(true)
    }

    /// Stored keys in sorted order.
    pub async fn keys(&self) -> Vec<RequestKey> {
        let mut keys: Vec<RequestKey> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    name: String,
    entries: Vec<SnapshotEntry>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    #[serde(flatten)]
    key: RequestKey,
    response: CachedResponse,
}

fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    let digest = Sha256::digest(name.as_bytes());
    dir.join(format!("{}.json", hex::encode(digest)))
}

async fn load_snapshot(path: &Path, name: &str) -> Result<HashMap<RequestKey, CachedResponse>> {
    let raw = tokio::fs::read(path).await?;
    let snapshot: Snapshot = serde_json::from_slice(&raw)?;
    if snapshot.name != name {
        return Err(CacheError::Storage(format!(
            "snapshot {} belongs to bucket {:?}, not {:?}",
            path.display(),
            snapshot.name,
            name
        )));
    }
    Ok(snapshot
        .entries
        .into_iter()
        .map(|entry| (entry.key, entry.response))
        .collect())
}

async fn write_snapshot(
    path: &Path,
    name: &str,
    entries: &HashMap<RequestKey, CachedResponse>,
) -> Result<()> {
    let mut sorted: Vec<SnapshotEntry> = entries
        .iter()
        .map(|(key, response)| SnapshotEntry {
            key: key.clone(),
            response: response.clone(),
        })
        .collect();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));

    let snapshot = Snapshot {
        name: name.to_string(),
        entries: sorted,
    };
    let raw = serde_json::to_vec_pretty(&snapshot)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Write-then-rename keeps the previous snapshot intact on failure
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, raw).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Wrote snapshot for bucket {} to {}", name, path.display());
    Ok(())
}
