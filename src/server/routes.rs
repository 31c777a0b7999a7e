// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{fetch_handler, health_handler, metrics_handler};
use crate::cache::AssetCacheManager;
use crate::worker::WorkerHandle;
use axum::{routing::get, Router};
use reqwest::Url;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AssetCacheManager>,
    pub worker: WorkerHandle,
    /// Base URL that request paths are mapped onto.
    pub origin: Url,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_precache/health", get(health_handler))
        .route("/_precache/metrics", get(metrics_handler))
        .fallback(fetch_handler)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
