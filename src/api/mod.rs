//! HTTP API surface: the five endpoints of the external interface.

mod analytics;
mod health;
mod records;
mod rpc;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};
use gateway_core::SpilloverRouter;

/// State shared across every handler.
#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<SpilloverRouter>,
    pub quota_path: PathBuf,
}

/// Builds the full API router, with shared state attached via `Extension`.
pub fn api_router(router: Arc<SpilloverRouter>, quota_path: PathBuf) -> Router {
    let state = ApiState { router, quota_path };

    Router::new()
        .route("/api/rpc/best", post(rpc::route_best))
        .route("/api/rpc/:provider_name", post(rpc::route_to_provider))
        .route("/api/records", get(records::get_records))
        .route("/api/analytics", get(analytics::get_analytics))
        .route("/health", get(health::health_check))
        .layer(Extension(state))
}
