// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::cache::{CacheStats, CachedResponse, Phase, ResourceRequest};
use crate::error::CacheError;
use crate::network::is_hop_by_hop;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub bucket: String,
    pub phase: Phase,
    pub entries: usize,
    pub stats: CacheStats,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

pub async fn health_handler(State(state): State<AppState>) -> Result<Response, CacheError> {
    let phase = state.manager.phase().await;
    let entries = state.manager.bucket().await?.len().await;

    let status = match phase {
        Phase::Serving => HealthStatus::Healthy,
        Phase::Populated => HealthStatus::Degraded,
        Phase::Uninitialized => HealthStatus::Unhealthy,
    };
    let code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = HealthResponse {
        status,
        bucket: state.manager.name().to_string(),
        phase,
        entries,
        stats: state.manager.get_stats().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    Ok((code, Json(body)).into_response())
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

/// Every other path is a fetch event against the upstream origin.
pub async fn fetch_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, CacheError> {
    let url = map_onto_origin(&state.origin, &uri)?;

    debug!("Fetch event: {} {}", method, url);

    let request = ResourceRequest {
        method,
        url,
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: if body.is_empty() { None } else { Some(body) },
    };

    let response = state.worker.fetch(request).await?;
    into_http_response(response)
}

/// Append the request path and query under the origin's base path.
///
/// The result must stay under the origin: absolute URLs in the path are
/// treated as plain segments and `..` may not climb above the base path.
fn map_onto_origin(origin: &Url, uri: &Uri) -> Result<Url, CacheError> {
    let mut url = origin.clone();
    url.set_path(&format!("{}{}", origin.path(), uri.path().trim_start_matches('/')));
    url.set_query(uri.query());
    url.set_fragment(None);

    if !url.as_str().starts_with(origin.as_str()) {
        return Err(CacheError::InvalidRequest(format!(
            "{} resolves outside of {}",
            uri, origin
        )));
    }
    Ok(url)
}

fn into_http_response(response: CachedResponse) -> Result<Response, CacheError> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|e| CacheError::Internal(format!("invalid stored status {}: {}", response.status, e)))?;

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        // Body length is recomputed for the outgoing response
        if is_hop_by_hop(name) || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(response.body))
        .map_err(|e| CacheError::Internal(format!("failed to build response: {}", e)))
}
