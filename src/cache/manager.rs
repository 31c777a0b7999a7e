// Cache manager - install-time population and cache-first fetch handling
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{CacheConfig, CacheStats, CachedResponse, Phase, ResourceRequest};
use crate::cache::storage::{CacheBucket, CacheStorage};
use crate::error::{CacheError, InstallError, Result};
use crate::metrics;
use crate::network::Network;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Owns one named bucket: fills it from the manifest at install time and
/// answers fetch events cache-first.
pub struct AssetCacheManager {
    config: CacheConfig,
    storage: CacheStorage,
    network: Arc<dyn Network>,
    phase: Arc<RwLock<Phase>>,
    stats: Arc<RwLock<CacheStats>>,
}

impl AssetCacheManager {
    /// Create a new cache manager
    pub fn new(config: CacheConfig, storage: CacheStorage, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            storage,
            network,
            phase: Arc::new(RwLock::new(Phase::Uninitialized)),
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    /// Name of the bucket this manager owns.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Open (creating if absent) the owned bucket.
    pub async fn bucket(&self) -> Result<CacheBucket> {
        self.storage.open(&self.config.name).await
    }

    /// Fetch every manifest entry and store them all in the bucket.
    ///
    /// Entries are fetched concurrently and committed in a single step once
    /// all of them succeeded. Any failure leaves the bucket as it was.
    pub async fn install(&self) -> std::result::Result<(), InstallError> {
        info!(
            "Installing {} manifest entries into bucket {}",
            self.config.manifest.len(),
            self.config.name
        );

        match self.populate().await {
            Ok(count) => {
                let mut phase = self.phase.write().await;
                if *phase == Phase::Uninitialized {
                    *phase = Phase::Populated;
                }
                drop(phase);
                metrics::record_install(true);
                info!("Install complete: {} entries stored in {}", count, self.config.name);
                Ok(())
            }
            Err(e) => {
                metrics::record_install(false);
                warn!("Install into {} failed: {}", self.config.name, e);
                Err(e)
            }
        }
    }

    async fn populate(&self) -> std::result::Result<usize, InstallError> {
        let requests = self.config.manifest.resolve(&self.config.origin)?;
        let bucket = self
            .bucket()
            .await
            .map_err(|e| InstallError::Storage(e.to_string()))?;

        let network = &self.network;
        let fetches = requests.into_iter().map(|request| async move {
            let url = request.url.to_string();
            let response = match network.fetch(&request).await {
                Ok(response) => {
                    metrics::record_network_fetch("install", true);
                    response
                }
                Err(source) => {
                    metrics::record_network_fetch("install", false);
                    return Err(InstallError::Network { url, source });
                }
            };

            if !response.is_success() {
                return Err(InstallError::BadStatus {
                    url,
                    status: response.status,
                });
            }
            if has_wildcard_vary(&response) {
                return Err(InstallError::Uncacheable {
                    url,
                    reason: "Vary: * cannot be matched".to_string(),
                });
            }

            debug!("Fetched {} ({} bytes)", url, response.body.len());
            Ok((request.key(), response))
        });

        let entries = try_join_all(fetches).await?;
        let count = entries.len();

        bucket
            .put_all(entries)
            .await
            .map_err(|e| InstallError::Storage(e.to_string()))?;
        metrics::update_bucket_entries(&self.config.name, bucket.len().await);

        Ok(count)
    }

    /// Move from `Populated` to `Serving`. Any other phase is left unchanged.
    pub async fn activate(&self) -> Phase {
        let mut phase = self.phase.write().await;
        if *phase == Phase::Populated {
            *phase = Phase::Serving;
            info!("Bucket {} activated", self.config.name);
        }
        *phase
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    /// Answer a fetch event: the stored response if there is one, otherwise
    /// whatever the network returns. Network results are never stored.
    pub async fn handle_fetch(&self, request: ResourceRequest) -> Result<CachedResponse> {
        let started = Instant::now();
        let bucket = self.bucket().await?;
        let key = request.key();

        if let Some(response) = bucket.match_request(&key).await {
            debug!("Cache hit: {} {}", key.method, key.url);
            self.stats.write().await.hits += 1;
            metrics::record_cache_hit(started.elapsed().as_secs_f64());
            return Ok(response);
        }

        debug!("Cache miss: {} {}", key.method, key.url);
        self.stats.write().await.misses += 1;

        match self.network.fetch(&request).await {
            Ok(response) => {
                metrics::record_cache_miss(true, started.elapsed().as_secs_f64());
                Ok(response)
            }
            Err(e) => {
                warn!("Network fetch for {} {} failed: {}", key.method, key.url, e);
                self.stats.write().await.network_errors += 1;
                metrics::record_cache_miss(false, started.elapsed().as_secs_f64());
                Err(CacheError::FetchForwarding(e))
            }
        }
    }

    /// Get cache statistics
    pub async fn get_stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }
}

fn has_wildcard_vary(response: &CachedResponse) -> bool {
    response
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("vary"))
        .any(|(_, value)| value.split(',').any(|field| field.trim() == "*"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::models::RequestKey;
    use crate::cache::AssetManifest;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use reqwest::{Method, Url};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const ORIGIN: &str = "http://assets.local/";

    /// Network stub keyed by absolute URL that records every call.
    #[derive(Default)]
    struct StubNetwork {
        routes: HashMap<String, std::result::Result<CachedResponse, FetchError>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubNetwork {
        fn route(mut self, path: &str, response: CachedResponse) -> Self {
            self.routes.insert(url(path).to_string(), Ok(response));
            self
        }

        fn fail(mut self, path: &str) -> Self {
            self.routes.insert(
                url(path).to_string(),
                Err(FetchError::Transport("connection refused".to_string())),
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Network for StubNetwork {
        async fn fetch(&self, request: &ResourceRequest) -> std::result::Result<CachedResponse, FetchError> {
            let url = request.url.to_string();
            self.calls.lock().unwrap().push(url.clone());
            self.routes
                .get(&url)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Transport(format!("no route to {}", url))))
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn key(path: &str) -> RequestKey {
        RequestKey::new(&Method::GET, &url(path))
    }

    fn manager(manifest: &[&str], network: Arc<StubNetwork>) -> AssetCacheManager {
        let config = CacheConfig {
            name: "app-cache-v1".to_string(),
            manifest: AssetManifest::new(manifest.iter().copied()),
            origin: Url::parse(ORIGIN).unwrap(),
        };
        AssetCacheManager::new(config, CacheStorage::in_memory(), network)
    }

    fn game_network() -> StubNetwork {
        StubNetwork::default()
            .route("index.html", CachedResponse::new(200, "<html>"))
            .route("app.js", CachedResponse::new(200, "var Module;"))
            .route("app.wasm", CachedResponse::new(200, vec![0u8, 97, 115, 109]))
            .route("app.data", CachedResponse::new(200, vec![1u8, 2, 3]))
    }

    const GAME_MANIFEST: [&str; 4] = ["index.html", "app.js", "app.wasm", "app.data"];

    #[tokio::test]
    async fn test_install_stores_every_manifest_entry() {
        let network = Arc::new(game_network());
        let manager = manager(&GAME_MANIFEST, network.clone());

        manager.install().await.unwrap();

        let bucket = manager.bucket().await.unwrap();
        assert_eq!(bucket.len().await, 4);
        for path in GAME_MANIFEST {
            assert!(bucket.contains(&key(path)).await, "{} missing", path);
        }
        assert_eq!(
            bucket.match_request(&key("app.wasm")).await.unwrap().body,
            bytes::Bytes::from_static(&[0, 97, 115, 109])
        );
        assert_eq!(network.calls().len(), 4);
        assert_eq!(manager.phase().await, Phase::Populated);
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status_and_stores_nothing() {
        let network = Arc::new(game_network().route("app.wasm", CachedResponse::new(404, "missing")));
        let manager = manager(&GAME_MANIFEST, network);

        let err = manager.install().await.unwrap_err();
        assert!(matches!(err, InstallError::BadStatus { status: 404, ref url } if url.ends_with("app.wasm")));

        assert!(manager.bucket().await.unwrap().is_empty().await);
        assert_eq!(manager.phase().await, Phase::Uninitialized);
    }

    #[tokio::test]
    async fn test_install_fails_on_transport_error() {
        let network = Arc::new(game_network().fail("app.data"));
        let manager = manager(&GAME_MANIFEST, network);

        let err = manager.install().await.unwrap_err();
        assert!(matches!(err, InstallError::Network { .. }));
        assert!(manager.bucket().await.unwrap().is_empty().await);
    }

    #[tokio::test]
    async fn test_install_rejects_wildcard_vary() {
        let network = Arc::new(
            game_network().route("app.js", CachedResponse::new(200, "x").with_header("Vary", "Accept, *")),
        );
        let manager = manager(&GAME_MANIFEST, network);

        assert!(matches!(
            manager.install().await,
            Err(InstallError::Uncacheable { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_rejects_duplicates_before_fetching() {
        let network = Arc::new(game_network());
        let manager = manager(&["app.js", "app.js"], network.clone());

        assert!(matches!(
            manager.install().await,
            Err(InstallError::DuplicateEntry(_))
        ));
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        // Empty stub: any network call would fail
        let network = Arc::new(StubNetwork::default());
        let manager = manager(&[], network.clone());
        let stored = CachedResponse::new(200, "<html>...").with_header("content-type", "text/html");
        manager
            .bucket()
            .await
            .unwrap()
            .put(key("index.html"), stored.clone())
            .await
            .unwrap();

        let response = manager
            .handle_fetch(ResourceRequest::get(url("index.html")))
            .await
            .unwrap();

        assert_eq!(response, stored);
        assert!(network.calls().is_empty());
        assert_eq!(manager.get_stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_cache_miss_returns_network_response_without_storing() {
        let network = Arc::new(StubNetwork::default().route("other.json", CachedResponse::new(200, "{}")));
        let manager = manager(&[], network.clone());

        let response = manager
            .handle_fetch(ResourceRequest::get(url("other.json")))
            .await
            .unwrap();

        assert_eq!(response, CachedResponse::new(200, "{}"));
        assert_eq!(network.calls(), vec![url("other.json").to_string()]);
        assert!(manager.bucket().await.unwrap().is_empty().await);
        assert_eq!(manager.get_stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_cache_miss_passes_error_status_through() {
        let network = Arc::new(StubNetwork::default().route("gone.png", CachedResponse::new(410, "gone")));
        let manager = manager(&[], network);

        let response = manager
            .handle_fetch(ResourceRequest::get(url("gone.png")))
            .await
            .unwrap();
        assert_eq!(response.status, 410);
    }

    #[tokio::test]
    async fn test_network_failure_on_miss_propagates() {
        let network = Arc::new(StubNetwork::default().fail("offline.json"));
        let manager = manager(&[], network);

        let err = manager
            .handle_fetch(ResourceRequest::get(url("offline.json")))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::FetchForwarding(FetchError::Transport(_))));
        assert_eq!(manager.get_stats().await.network_errors, 1);
    }

    #[tokio::test]
    async fn test_method_is_part_of_the_match() {
        let network = Arc::new(game_network());
        let manager = manager(&["index.html"], network.clone());
        manager.install().await.unwrap();

        let mut head = ResourceRequest::get(url("index.html"));
        head.method = Method::HEAD;
        // Only the GET was stored, so the HEAD is forwarded
        let response = manager.handle_fetch(head).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(manager.get_stats().await.misses, 1);
        assert_eq!(network.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_activate_only_after_install() {
        let manager = manager(&GAME_MANIFEST, Arc::new(game_network()));

        assert_eq!(manager.activate().await, Phase::Uninitialized);
        manager.install().await.unwrap();
        assert_eq!(manager.activate().await, Phase::Serving);
        assert_eq!(manager.activate().await, Phase::Serving);

        // A repeated install refreshes the bucket but never leaves Serving
        manager.install().await.unwrap();
        assert_eq!(manager.phase().await, Phase::Serving);
    }
}
