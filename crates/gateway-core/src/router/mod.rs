//! Per-request orchestration: candidate ordering, reserve, limit, dispatch, failover.
//!
//! This is the core of the gateway. See [`SpilloverRouter::optimize`].


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::instrument;

use crate::client::Dispatcher;
use crate::error::{GatewayError, Result};
use crate::metrics::MetricsStore;
use crate::provider::{PricingModel, Priority, Provider};
use crate::quota::QuotaManager;
use crate::ratelimit::RateLimiter;
use crate::request::parse;
use crate::response::{self, ErrorResponse, SuccessResponse};
use crate::scoring::{self, ScoreCache};

/// Latency assumed for a provider with no prior observation for a method.
const DEFAULT_OBSERVED_LATENCY_MS: f64 = 500.0;
/// Latency penalty recorded for a failed dispatch.
const DISPATCH_FAILURE_PENALTY_MS: f64 = 5000.0;
/// Default per-attempt dispatch timeout.
const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for [`SpilloverRouter`], independent of any one provider.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Per-attempt upstream dispatch timeout.
    pub dispatch_timeout: Duration,
    /// Whether exploration (randomized head-of-line promotion) is enabled.
    pub enable_exploration: bool,
    /// Probability, in `[0, 1]`, of promoting a random priority-1 candidate.
    pub exploration_rate: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            enable_exploration: false,
            exploration_rate: 0.0,
        }
    }
}

/// Either half of a completed routing decision.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// The request was served.
    Success(SuccessResponse),
    /// The request terminated in a JSON-RPC error.
    Error(ErrorResponse),
}

impl RouteOutcome {
    /// Serializes either outcome to its JSON-RPC wire form.
    pub fn into_json(self) -> Value {
        match self {
            RouteOutcome::Success(r) => serde_json::to_value(r).expect("response is serializable"),
            RouteOutcome::Error(r) => serde_json::to_value(r).expect("response is serializable"),
        }
    }
}

struct Candidate<'a> {
    provider: &'a Provider,
    observed_latency_ms: f64,
}

/// The central per-request orchestrator (§4.8 of the core design).
///
/// Owns no provider-specific state beyond the immutable [`Provider`] list;
/// the Quota Manager, Rate Limiter, Metrics Store, RPC Client, and score
/// cache are shared collaborators handed in at construction.
pub struct SpilloverRouter {
    providers: Vec<Provider>,
    metrics: Arc<MetricsStore>,
    quota: Arc<QuotaManager>,
    rate_limiter: Arc<RateLimiter>,
    client: Arc<dyn Dispatcher>,
    score_cache: Arc<ScoreCache>,
    config: RouterConfig,
}

impl SpilloverRouter {
    /// Builds a router over a fixed provider list and its shared collaborators.
    pub fn new(
        providers: Vec<Provider>,
        metrics: Arc<MetricsStore>,
        quota: Arc<QuotaManager>,
        rate_limiter: Arc<RateLimiter>,
        client: Arc<dyn Dispatcher>,
        score_cache: Arc<ScoreCache>,
        config: RouterConfig,
    ) -> Self {
        Self {
            providers,
            metrics,
            quota,
            rate_limiter,
            client,
            score_cache,
            config,
        }
    }

    /// The immutable provider list this router was built with.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Looks up a provider by case-insensitive name.
    pub fn find_provider(&self, name: &str) -> Option<&Provider> {
        self.providers
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// The shared metrics store, for the analytics/records HTTP handlers.
    pub fn metrics(&self) -> &Arc<MetricsStore> {
        &self.metrics
    }

    /// The shared quota manager, for the health handler's writability check.
    pub fn quota(&self) -> &Arc<QuotaManager> {
        &self.quota
    }

    /// Runs the full candidate-selection and failover pipeline for `payload`.
    #[instrument(skip(self, payload), fields(method))]
    pub async fn optimize(&self, payload: &Value) -> RouteOutcome {
        let parsed = match parse(payload) {
            Ok(p) => p,
            Err(e) => {
                let id = payload.get("id").cloned().unwrap_or(Value::Null);
                return RouteOutcome::Error(response::build_error(id, None, &e));
            }
        };
        tracing::Span::current().record("method", parsed.method.as_str());

        let candidates = self.enumerate_candidates(&parsed.method).await;
        if candidates.is_empty() {
            let error = GatewayError::NoCandidates {
                method: parsed.method.clone(),
            };
            return RouteOutcome::Error(response::build_error(
                parsed.id,
                Some(&parsed.method),
                &error,
            ));
        }

        let ordered = self.order_candidates(candidates);
        let mut last_error: Option<String> = None;

        for candidate in ordered {
            let provider = candidate.provider;

            if !self
                .rate_limiter
                .is_allowed(&provider.name, provider.limit_rps)
            {
                continue;
            }

            let cost = provider.cost_of(&parsed.method) as i64;
            if !self
                .quota
                .try_reserve(&provider.name, cost, provider.limit_monthly)
                .await
            {
                continue;
            }

            let price = self.price_for(provider, &parsed.method);

            let dispatch_payload = parsed.raw_payload.clone();
            match self
                .client
                .send(&provider.base_url, &dispatch_payload, self.config.dispatch_timeout)
                .await
            {
                Ok((result, latency_ms)) => {
                    self.metrics
                        .append(&provider.name, &parsed.method, latency_ms, price);

                    let (score, weights, all_providers) =
                        self.scoring_context(&parsed.method, &provider.name).await;

                    let response = response::build_success(
                        parsed.id,
                        result,
                        &provider.name,
                        latency_ms,
                        price,
                        weights,
                        score,
                        all_providers,
                    );
                    return RouteOutcome::Success(response);
                }
                Err(e) => {
                    self.metrics.append(
                        &provider.name,
                        &parsed.method,
                        DISPATCH_FAILURE_PENALTY_MS,
                        price,
                    );
                    self.quota.rollback(&provider.name, cost).await;
                    last_error = Some(e.to_string());
                }
            }
        }

        let error = GatewayError::Exhausted {
            method: parsed.method.clone(),
            last_error,
        };
        RouteOutcome::Error(response::build_error(parsed.id, Some(&parsed.method), &error))
    }

    /// Force-routes to a named provider, bypassing candidate selection but
    /// still going through quota, rate limiting, dispatch, and metrics.
    #[instrument(skip(self, payload), fields(method))]
    pub async fn dispatch_to(&self, provider_name: &str, payload: &Value) -> RouteOutcome {
        let parsed = match parse(payload) {
            Ok(p) => p,
            Err(e) => {
                let id = payload.get("id").cloned().unwrap_or(Value::Null);
                return RouteOutcome::Error(response::build_error(id, None, &e));
            }
        };
        tracing::Span::current().record("method", parsed.method.as_str());

        let provider = match self.find_provider(provider_name) {
            Some(p) => p,
            None => {
                let error = GatewayError::UnknownProvider(provider_name.to_string());
                return RouteOutcome::Error(response::build_error(parsed.id, None, &error));
            }
        };

        if !self
            .rate_limiter
            .is_allowed(&provider.name, provider.limit_rps)
        {
            let error = GatewayError::Exhausted {
                method: parsed.method.clone(),
                last_error: Some("rate limited".to_string()),
            };
            return RouteOutcome::Error(response::build_error(
                parsed.id,
                Some(&parsed.method),
                &error,
            ));
        }

        let cost = provider.cost_of(&parsed.method) as i64;
        if !self
            .quota
            .try_reserve(&provider.name, cost, provider.limit_monthly)
            .await
        {
            let error = GatewayError::NoCandidates {
                method: parsed.method.clone(),
            };
            return RouteOutcome::Error(response::build_error(
                parsed.id,
                Some(&parsed.method),
                &error,
            ));
        }

        let price = self.price_for(provider, &parsed.method);
        match self
            .client
            .send(&provider.base_url, &parsed.raw_payload, self.config.dispatch_timeout)
            .await
        {
            Ok((result, latency_ms)) => {
                self.metrics
                    .append(&provider.name, &parsed.method, latency_ms, price);
                let response = response::build_success(
                    parsed.id,
                    result,
                    &provider.name,
                    latency_ms,
                    price,
                    (0.5, 0.5),
                    None,
                    None,
                );
                RouteOutcome::Success(response)
            }
            Err(e) => {
                self.metrics.append(
                    &provider.name,
                    &parsed.method,
                    DISPATCH_FAILURE_PENALTY_MS,
                    price,
                );
                self.quota.rollback(&provider.name, cost).await;
                let error = GatewayError::Exhausted {
                    method: parsed.method.clone(),
                    last_error: Some(e.to_string()),
                };
                RouteOutcome::Error(response::build_error(
                    parsed.id,
                    Some(&parsed.method),
                    &error,
                ))
            }
        }
    }

    async fn enumerate_candidates(&self, method: &str) -> Vec<Candidate<'_>> {
        let mut candidates = Vec::new();
        for provider in &self.providers {
            if !self
                .quota
                .check(&provider.name, provider.limit_monthly, 0)
                .await
            {
                continue;
            }
            let observed_latency_ms =
                self.metrics
                    .latest_latency(&provider.name, method, DEFAULT_OBSERVED_LATENCY_MS);
            candidates.push(Candidate {
                provider,
                observed_latency_ms,
            });
        }
        candidates
    }

    fn order_candidates<'a>(&self, mut candidates: Vec<Candidate<'a>>) -> Vec<Candidate<'a>> {
        candidates.sort_by(|a, b| {
            a.provider
                .priority
                .cmp(&b.provider.priority)
                .then(a.observed_latency_ms.total_cmp(&b.observed_latency_ms))
        });

        if self.config.enable_exploration
            && !candidates.is_empty()
            && rand::random::<f64>() < self.config.exploration_rate
        {
            let priority_one_indices: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.provider.priority == Priority::Free)
                .map(|(i, _)| i)
                .collect();
            if let Some(&chosen) = priority_one_indices.choose(&mut rand::thread_rng()) {
                let promoted = candidates.remove(chosen);
                candidates.insert(0, promoted);
            }
        }

        candidates
    }

    fn price_for(&self, provider: &Provider, method: &str) -> f64 {
        match &provider.pricing_model {
            PricingModel::Flat => {
                let prior_calls = self.metrics.request_count(&provider.name, method);
                provider.price_per_call(method, prior_calls)
            }
            PricingModel::ComputeUnit { .. } | PricingModel::Credit { .. } => {
                let prior_units = self
                    .metrics
                    .total_units(&provider.name, |m| provider.cost_of(m));
                provider.price_per_call(method, prior_units)
            }
        }
    }

    /// Looks up (or computes and caches) the CRITIC score for the winning
    /// provider, plus the full per-provider breakdown, for inclusion in the
    /// response. Side-effect-free beyond the cache itself.
    async fn scoring_context(
        &self,
        method: &str,
        winner: &str,
    ) -> (Option<f64>, (f64, f64), Option<HashMap<String, (f64, f64, f64)>>) {
        let cached = self.score_cache.get(method).await;
        let (scores, weights) = match cached {
            Some(hit) => hit,
            None => match scoring::calculate_dynamic_scores(&self.metrics, method) {
                Some((scores, weights)) => {
                    self.score_cache
                        .set(method, scores.clone(), weights)
                        .await;
                    (scores, weights)
                }
                None => return (None, (0.5, 0.5), None),
            },
        };

        let score = scoring::score_for(&scores, winner);
        let all_providers = scores
            .iter()
            .map(|s| (s.provider.clone(), (s.score, s.latency_ms, s.price_usd)))
            .collect();

        (score, (weights.latency, weights.price), Some(all_providers))
    }
}
