//! Boutique Storefront library.
//!
//! Product search state, read-through caches over NATS JetStream, and the
//! HTTP adapter that exposes them. Split from the binary so the router can
//! be driven directly in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assets;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod state;
pub mod store;

use axum::{Router, middleware::from_fn, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with request tracing.
///
/// Sentry layers are added by the binary, outside this router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .with_state(state)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
