// End-to-end install and fetch tests against a mock upstream
// Author: kelexine (https://github.com/kelexine)

use precache::cache::{AssetCacheManager, AssetManifest, CacheConfig, CacheStorage, ResourceRequest};
use precache::config::NetworkConfig;
use precache::error::{CacheError, InstallError};
use precache::network::HttpNetwork;
use reqwest::Url;
use std::sync::Arc;

const GAME_MANIFEST: [&str; 4] = ["index.html", "app.js", "app.wasm", "app.data"];

fn manager(origin: &str, manifest: &[&str], storage: CacheStorage) -> AssetCacheManager {
    let network = HttpNetwork::new(&NetworkConfig::default()).unwrap();
    AssetCacheManager::new(
        CacheConfig {
            name: "app-cache-v1".to_string(),
            manifest: AssetManifest::new(manifest.iter().copied()),
            origin: Url::parse(&format!("{}/", origin)).unwrap(),
        },
        storage,
        Arc::new(network),
    )
}

async fn serve_game(server: &mut mockito::ServerGuard) -> Vec<mockito::Mock> {
    let mut mocks = Vec::new();
    for path in GAME_MANIFEST {
        mocks.push(
            server
                .mock("GET", format!("/{}", path).as_str())
                .with_status(200)
                .with_body(format!("contents of {}", path))
                .expect(1)
                .create_async()
                .await,
        );
    }
    mocks
}

#[tokio::test]
async fn test_install_populates_bucket_from_origin() {
    let mut server = mockito::Server::new_async().await;
    let mocks = serve_game(&mut server).await;

    let manager = manager(&server.url(), &GAME_MANIFEST, CacheStorage::in_memory());
    manager.install().await.unwrap();

    let bucket = manager.bucket().await.unwrap();
    assert_eq!(bucket.len().await, 4);
    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_install_rejects_on_missing_asset() {
    let mut server = mockito::Server::new_async().await;
    for path in ["index.html", "app.js", "app.data"] {
        server
            .mock("GET", format!("/{}", path).as_str())
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;
    }
    server.mock("GET", "/app.wasm").with_status(404).create_async().await;

    let manager = manager(&server.url(), &GAME_MANIFEST, CacheStorage::in_memory());
    let err = manager.install().await.unwrap_err();

    assert!(matches!(err, InstallError::BadStatus { status: 404, .. }));
    assert!(manager.bucket().await.unwrap().is_empty().await);
}

#[tokio::test]
async fn test_hit_after_install_does_not_touch_origin() {
    let mut server = mockito::Server::new_async().await;
    let mocks = serve_game(&mut server).await;

    let manager = manager(&server.url(), &GAME_MANIFEST, CacheStorage::in_memory());
    manager.install().await.unwrap();

    let url = Url::parse(&server.url()).unwrap().join("app.js").unwrap();
    let response = manager.handle_fetch(ResourceRequest::get(url)).await.unwrap();
    assert_eq!(&response.body[..], b"contents of app.js");

    // Each asset was requested exactly once, by the install
    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_miss_is_forwarded_and_not_stored() {
    let mut server = mockito::Server::new_async().await;
    let other = server
        .mock("GET", "/other.json")
        .with_status(200)
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let manager = manager(&server.url(), &[], CacheStorage::in_memory());
    manager.install().await.unwrap();

    let url = Url::parse(&server.url()).unwrap().join("other.json").unwrap();
    for _ in 0..2 {
        let response = manager
            .handle_fetch(ResourceRequest::get(url.clone()))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"{}");
    }

    other.assert_async().await;
    assert!(manager.bucket().await.unwrap().is_empty().await);
}

#[tokio::test]
async fn test_offline_miss_surfaces_forwarding_error() {
    // Nothing listens on the discard port
    let manager = manager("http://127.0.0.1:9", &[], CacheStorage::in_memory());
    let url = Url::parse("http://127.0.0.1:9/level1.json").unwrap();

    let err = manager.handle_fetch(ResourceRequest::get(url)).await.unwrap_err();
    assert!(matches!(err, CacheError::FetchForwarding(_)));
}

#[tokio::test]
async fn test_persisted_bucket_serves_after_restart_while_offline() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    serve_game(&mut server).await;
    let origin = server.url();

    manager(&origin, &GAME_MANIFEST, CacheStorage::persistent(dir.path()))
        .install()
        .await
        .unwrap();
    drop(server);

    // Fresh storage over the same directory, upstream mocks gone
    let restarted = manager(&origin, &GAME_MANIFEST, CacheStorage::persistent(dir.path()));
    let url = Url::parse(&origin).unwrap().join("index.html").unwrap();
    let response = restarted.handle_fetch(ResourceRequest::get(url)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, bytes::Bytes::from("contents of index.html"));
}
