//! Axum-based HTTP front for precache.
//!
//! The router stands in for the browser runtime: every inbound request that
//! is not an operational endpoint becomes a fetch event for the worker.
//!
//! # Components
//!
//! - `handlers`: Fetch, health and metrics endpoints.
//! - `routes`: The router, with request ID and tracing layers.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod routes;

pub use routes::{create_router, AppState};
