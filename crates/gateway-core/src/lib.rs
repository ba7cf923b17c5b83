//! Gateway Core - JSON-RPC Request Optimizer
//!
//! This crate provides the routing engine for the gateway:
//! - Provider: declared upstream configuration, priority tiers, pricing models
//! - Metrics: append-only latency/price observations per (provider, method)
//! - Quota: monthly usage accounting with atomic reserve/rollback
//! - RateLimit: per-provider sliding-window RPS limiting
//! - Client: the `Dispatcher` seam and its `reqwest`-backed implementation
//! - Request: JSON-RPC 2.0 envelope validation
//! - Scoring: CRITIC-weighted dynamic provider scoring
//! - Response: success/error envelope construction with presentation rounding
//! - Analytics: read-only aggregate projections over the metrics store
//! - Router: the `SpilloverRouter` orchestrator tying all of the above together

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytics;
pub mod client;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod quota;
pub mod ratelimit;
pub mod request;
pub mod response;
pub mod router;
pub mod scoring;

pub use analytics::{AnalyticsProjector, ProviderSummary};
pub use client::{Dispatcher, RpcClient};
pub use error::{GatewayError, Result};
pub use metrics::{MetricRecord, MetricsStore};
pub use provider::{is_virtual_best, PricingModel, PricingTiers, Priority, Provider, VIRTUAL_BEST};
pub use quota::QuotaManager;
pub use ratelimit::RateLimiter;
pub use request::{categorize, parse, MethodCategory, ParsedRequest};
pub use response::{build_error, build_success, Decision, ErrorResponse, SuccessResponse};
pub use router::{RouteOutcome, RouterConfig, SpilloverRouter};
pub use scoring::{calculate_dynamic_scores, score_for, ProviderScore, ScoreCache, Weights};
