//! Canonical success/error JSON-RPC envelopes carrying routing decision metadata.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;

/// Weights used for one routing decision, rounded to 3 decimal places.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionWeights {
    /// Rounded latency weight.
    pub latency: f64,
    /// Rounded price weight.
    pub price: f64,
}

/// Per-provider row in the optional `all_providers` breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderScoreRow {
    /// Rounded score.
    pub score: f64,
    /// Rounded latency in milliseconds.
    pub latency_ms: f64,
    /// Rounded price in USD.
    pub price_usd: f64,
}

/// Metadata describing why a particular provider was chosen.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// The provider that served this request.
    pub selected_provider: String,
    /// The CRITIC score that led to this selection, if scoring was consulted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// The weights behind `score`.
    pub weights: DecisionWeights,
    /// Observed latency in milliseconds, rounded to 0.01 ms.
    pub latency_ms: f64,
    /// Price charged for this call, rounded to 6 decimal places.
    pub price_usd: f64,
    /// Per-provider score breakdown, when scoring was consulted for this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_providers: Option<HashMap<String, ProviderScoreRow>>,
}

/// A success envelope: `{jsonrpc, id, result, decision}`.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Echoed request id.
    pub id: Value,
    /// The raw result forwarded from the upstream.
    pub result: Value,
    /// Routing decision metadata.
    pub decision: Decision,
}

/// An error body nested under `error` in an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail, e.g. `{"method": "..."}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An error envelope: `{jsonrpc, id, error}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Echoed request id, or `Value::Null` when the id could not be parsed.
    pub id: Value,
    /// The error body.
    pub error: ErrorBody,
}

/// Builds a success envelope, applying the presentation rounding rules:
/// latency to 0.01 ms, price to 6 decimals, weights to 3, score to 4.
#[allow(clippy::too_many_arguments)]
pub fn build_success(
    id: Value,
    result: Value,
    selected_provider: &str,
    latency_ms: f64,
    price_usd: f64,
    weights: (f64, f64),
    score: Option<f64>,
    all_providers: Option<HashMap<String, (f64, f64, f64)>>,
) -> SuccessResponse {
    SuccessResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result,
        decision: Decision {
            selected_provider: selected_provider.to_string(),
            score: score.map(|s| round_to(s, 4)),
            weights: DecisionWeights {
                latency: round_to(weights.0, 3),
                price: round_to(weights.1, 3),
            },
            latency_ms: round_to(latency_ms, 2),
            price_usd: round_to(price_usd, 6),
            all_providers: all_providers.map(|rows| {
                rows.into_iter()
                    .map(|(name, (score, latency, price))| {
                        (
                            name.to_lowercase(),
                            ProviderScoreRow {
                                score: round_to(score, 4),
                                latency_ms: round_to(latency, 2),
                                price_usd: round_to(price, 6),
                            },
                        )
                    })
                    .collect()
            }),
        },
    }
}

/// Builds an error envelope from a [`GatewayError`].
pub fn build_error(id: Value, method: Option<&str>, error: &GatewayError) -> ErrorResponse {
    ErrorResponse {
        jsonrpc: "2.0".to_string(),
        id,
        error: ErrorBody {
            code: error.rpc_code(),
            message: error.to_string(),
            data: method.map(|m| serde_json::json!({"method": m})),
        },
    }
}

/// Rounds `value` to `decimals` decimal places. `decimals=2` rounds latency
/// to the nearest 0.01 as specified.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
