//! Derived, read-only views over the metrics store.

use std::collections::HashMap;

use serde::Serialize;

use crate::metrics::{MetricRecord, MetricsStore};
use crate::provider::is_virtual_best;
use crate::scoring::{self, ProviderScore};

/// Aggregate numbers for one provider over its history for a method.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    /// Average observed latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Average price in USD.
    pub avg_price_usd: f64,
    /// Number of records contributing to this summary.
    pub record_count: u64,
    /// Whether this provider appears in the latest snapshot for this method.
    pub eligible: bool,
    /// Latency normalized against the other providers' latest snapshot.
    pub normalized_latency: f64,
    /// Price normalized against the other providers' latest snapshot.
    pub normalized_price: f64,
}

/// Read-only projection over [`MetricsStore`], excluding the virtual "Best" provider.
pub struct AnalyticsProjector<'a> {
    metrics: &'a MetricsStore,
}

impl<'a> AnalyticsProjector<'a> {
    /// Wraps a metrics store for read-only querying.
    pub fn new(metrics: &'a MetricsStore) -> Self {
        Self { metrics }
    }

    /// All records for `method`, or every record if `method` is `None`,
    /// excluding the virtual "Best" provider.
    pub fn get_all_records(&self, method: Option<&str>) -> Vec<MetricRecord> {
        self.metrics
            .get_records(method)
            .into_iter()
            .filter(|r| !is_virtual_best(&r.provider))
            .collect()
    }

    /// One record per provider, the most recent for `method`.
    pub fn latest_snapshot(&self, method: &str) -> Vec<MetricRecord> {
        self.metrics.latest(method)
    }

    /// Per-provider summaries (average latency/price, count, normalized
    /// latency/price against the latest snapshot) for `method`.
    pub fn provider_summaries(&self, method: &str) -> HashMap<String, ProviderSummary> {
        let history = self.get_all_records(Some(method));
        let latest = self.latest_snapshot(method);

        let scores: Vec<ProviderScore> =
            scoring::calculate_dynamic_scores(self.metrics, method)
                .map(|(scores, _)| scores)
                .unwrap_or_default();

        let mut grouped: HashMap<String, Vec<&MetricRecord>> = HashMap::new();
        for record in &history {
            grouped.entry(record.provider.clone()).or_default().push(record);
        }

        grouped
            .into_iter()
            .map(|(provider, records)| {
                let count = records.len() as u64;
                let avg_latency_ms = records.iter().map(|r| r.latency_ms).sum::<f64>() / count as f64;
                let avg_price_usd = records.iter().map(|r| r.price_usd).sum::<f64>() / count as f64;
                let normalized = scores
                    .iter()
                    .find(|s| s.provider.eq_ignore_ascii_case(&provider));
                let normalized_latency = normalized.map(|s| s.norm_latency).unwrap_or(0.0);
                let normalized_price = normalized.map(|s| s.norm_price).unwrap_or(0.0);
                let eligible = latest
                    .iter()
                    .any(|r| r.provider.eq_ignore_ascii_case(&provider));
                (
                    provider,
                    ProviderSummary {
                        avg_latency_ms,
                        avg_price_usd,
                        record_count: count,
                        eligible,
                        normalized_latency,
                        normalized_price,
                    },
                )
            })
            .collect()
    }
}
