//! Error taxonomy for the request optimizer core.

use thiserror::Error;

/// Errors produced by `gateway-core`.
///
/// Most of these are consumed internally by the router's failover loop and
/// never escape `optimize()`; only [`GatewayError::InvalidRequest`],
/// [`GatewayError::NoCandidates`], [`GatewayError::Exhausted`] and
/// [`GatewayError::Internal`] are ever surfaced to a client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The JSON-RPC envelope failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No provider has remaining monthly quota for this method.
    #[error("no eligible providers for method {method}")]
    NoCandidates {
        /// The method that had no eligible providers.
        method: String,
    },

    /// Every candidate was rate-limited or failed dispatch.
    #[error("all candidates exhausted for method {method}{}", last_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    Exhausted {
        /// The method being routed.
        method: String,
        /// The most recent upstream failure, if any dispatch was attempted.
        last_error: Option<String>,
    },

    /// No response within the per-attempt timeout.
    #[error("upstream timed out")]
    UpstreamTimeout,

    /// Transport-level failure reaching the upstream.
    #[error("upstream connection failed: {0}")]
    UpstreamConnection(String),

    /// Upstream returned a non-2xx status.
    #[error("upstream returned status {status}")]
    UpstreamHttp {
        /// The HTTP status code returned.
        status: u16,
    },

    /// Upstream returned a 2xx body that did not decode as JSON.
    #[error("upstream response was not valid JSON: {0}")]
    UpstreamDecode(String),

    /// The requested provider name is not known to the router.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Quota counters could not be persisted to disk. Logged, never fatal.
    #[error("quota persistence failed: {0}")]
    QuotaIo(#[from] std::io::Error),

    /// Anything else unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Maps the client-visible subset of this taxonomy to a JSON-RPC error code.
    ///
    /// Internal dispatch-failure variants are not meant to be surfaced directly
    /// and fall back to `-32603`; the router always converts them into an
    /// `Exhausted` or success outcome before a response is built.
    pub fn rpc_code(&self) -> i64 {
        match self {
            GatewayError::InvalidRequest(_) => -32600,
            GatewayError::NoCandidates { .. } | GatewayError::Exhausted { .. } => -32000,
            GatewayError::UnknownProvider(_) => -32601,
            _ => -32603,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GatewayError>;
