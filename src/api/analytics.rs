//! `GET /api/analytics?method=…`.

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use gateway_core::AnalyticsProjector;
use serde::Deserialize;

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    method: Option<String>,
}

pub async fn get_analytics(
    Extension(state): Extension<ApiState>,
    Query(query): Query<AnalyticsQuery>,
) -> impl IntoResponse {
    let Some(method) = query.method else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "query parameter 'method' is required"})),
        )
            .into_response();
    };

    let projector = AnalyticsProjector::new(state.router.metrics());
    let summaries = projector.provider_summaries(&method);
    Json(serde_json::json!({"method": method, "providers": summaries})).into_response()
}
