//! `POST /api/rpc/best` and `POST /api/rpc/{provider_name}`.

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::Value;

use super::ApiState;

/// Runs the full candidate-selection and failover pipeline.
pub async fn route_best(Extension(state): Extension<ApiState>, Json(payload): Json<Value>) -> impl IntoResponse {
    let outcome = state.router.optimize(&payload).await;
    Json(outcome.into_json())
}

/// Force-routes to a named provider, 404ing when the name is unknown.
pub async fn route_to_provider(
    Extension(state): Extension<ApiState>,
    Path(provider_name): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    if state.router.find_provider(&provider_name).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("unknown provider: {provider_name}"), "code": 404})),
        )
            .into_response();
    }

    let outcome = state.router.dispatch_to(&provider_name, &payload).await;
    Json(outcome.into_json()).into_response()
}
