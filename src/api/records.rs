//! `GET /api/records?method=…`.

use axum::extract::{Extension, Query};
use axum::response::Json;
use gateway_core::{AnalyticsProjector, MetricRecord};
use serde::{Deserialize, Serialize};

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    method: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    method: Option<String>,
    records: Vec<MetricRecord>,
    total_records: usize,
}

pub async fn get_records(
    Extension(state): Extension<ApiState>,
    Query(query): Query<RecordsQuery>,
) -> Json<RecordsResponse> {
    let projector = AnalyticsProjector::new(state.router.metrics());
    let records = projector.get_all_records(query.method.as_deref());
    let total_records = records.len();

    Json(RecordsResponse {
        method: query.method,
        records,
        total_records,
    })
}
