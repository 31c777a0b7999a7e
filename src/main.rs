// precache - Cache-first static asset server
// Author: kelexine (https://github.com/kelexine)

use anyhow::{Context, Result};
use clap::Parser;
use precache::cache::{AssetCacheManager, AssetManifest, CacheConfig, CacheStorage};
use precache::cli::Args;
use precache::config::AppConfig;
use precache::network::HttpNetwork;
use precache::server::{create_router, AppState};
use precache::utils::logging;
use precache::worker::{spawn_dispatcher, ServiceWorker};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting precache v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the cache manager
    let origin = config.origin_url()?;
    let storage = match &config.cache.persist_dir {
        Some(dir) => {
            info!("Persisting cache buckets under {}", dir);
            CacheStorage::persistent(dir)
        }
        None => CacheStorage::in_memory(),
    };
    let network = Arc::new(HttpNetwork::new(&config.network)?);
    let manager = Arc::new(AssetCacheManager::new(
        CacheConfig {
            name: config.cache.name.clone(),
            manifest: AssetManifest::from(config.cache.manifest.clone()),
            origin: origin.clone(),
        },
        storage,
        network,
    ));

    // Phase 4: Install - nothing is served until the bucket is populated
    let worker = spawn_dispatcher(manager.clone() as Arc<dyn ServiceWorker>, 1024);
    info!("Precaching {} assets from {}", config.cache.manifest.len(), origin);
    worker
        .install()
        .await
        .with_context(|| format!("install of bucket {} failed", config.cache.name))?;

    if args.install_only {
        info!("Install complete, exiting (--install-only)");
        return Ok(());
    }

    // Phase 5: Build and start HTTP server
    let app = create_router(AppState {
        manager,
        worker,
        origin,
    });
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
