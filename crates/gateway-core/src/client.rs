//! Shared async HTTP client used for upstream dispatch.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// A single operation capable of dispatching a JSON-RPC call to an upstream.
///
/// [`SpilloverRouter`](crate::router::SpilloverRouter) depends on this trait
/// rather than on [`RpcClient`] directly, so tests can inject a deterministic
/// double instead of reaching the network — the same seam the teacher's
/// `LlmProvider` trait provides for its router.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatches `payload` to `url`, returning the decoded JSON body and the
    /// observed wall-clock latency in milliseconds.
    async fn send(&self, url: &str, payload: &Value, timeout: Duration) -> Result<(Value, f64)>;
}

/// A single long-lived HTTP client with a shared connection pool.
#[derive(Debug, Clone)]
pub struct RpcClient {
    inner: reqwest::Client,
}

impl RpcClient {
    /// Builds the shared client. Per-call timeouts are passed to `send`
    /// rather than fixed here, since different candidates may use different
    /// per-attempt deadlines.
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::builder()
                .build()
                .expect("reqwest client configuration is valid"),
        }
    }

    /// Explicit close for shutdown. `reqwest::Client` has no teardown of its
    /// own beyond drop; this exists so callers have a single place to call
    /// when the gateway is shutting down, matching the teacher's provider
    /// clients which expose an explicit lifecycle hook even when it is a
    /// no-op over the underlying pool.
    pub fn close(&self) {}
}

#[async_trait]
impl Dispatcher for RpcClient {
    async fn send(&self, url: &str, payload: &Value, timeout: Duration) -> Result<(Value, f64)> {
        let start = Instant::now();
        let response = self
            .inner
            .post(url)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::UpstreamTimeout
                } else {
                    GatewayError::UpstreamConnection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UpstreamHttp {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::UpstreamDecode(e.to_string()))?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok((body, latency_ms))
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_defaults() {
        let _client = RpcClient::new();
    }

    #[tokio::test]
    async fn connection_failure_maps_to_connection_error() {
        let client = RpcClient::new();
        let result = client
            .send(
                "http://127.0.0.1:1",
                &serde_json::json!({}),
                Duration::from_millis(200),
            )
            .await;
        assert!(matches!(
            result,
            Err(GatewayError::UpstreamConnection(_)) | Err(GatewayError::UpstreamTimeout)
        ));
    }
}
