//! CRITIC-weighted dynamic scoring of providers, read-side over the metrics store.
//!
//! Exercised by the `rpc/best` analytics path and an optional alternative
//! router mode; consults [`crate::metrics::MetricsStore`] and is otherwise
//! side-effect-free.

pub mod cache;

use std::collections::HashMap;

use crate::metrics::MetricsStore;
use crate::provider::is_virtual_best;

pub use cache::ScoreCache;

/// The two scoring criteria, in the fixed order used for CRITIC weighting.
const CRITERIA: [&str; 2] = ["latency", "price"];

/// A provider's score for a method, and the two raw inputs it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderScore {
    /// Provider name.
    pub provider: String,
    /// Raw observed latency used to compute this row.
    pub latency_ms: f64,
    /// Raw price used to compute this row.
    pub price_usd: f64,
    /// Latency normalized against the other providers' latest snapshot.
    pub norm_latency: f64,
    /// Price normalized against the other providers' latest snapshot.
    pub norm_price: f64,
    /// Final weighted score in `[0, 1]`.
    pub score: f64,
}

/// The two criterion weights the CRITIC algorithm produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// Weight given to the (lower-is-better-normalized) latency criterion.
    pub latency: f64,
    /// Weight given to the (lower-is-better-normalized) price criterion.
    pub price: f64,
}

impl Weights {
    /// The equal-weight fallback used whenever there isn't enough
    /// historical data to discriminate between criteria.
    pub fn equal() -> Self {
        Self {
            latency: 0.5,
            price: 0.5,
        }
    }
}

/// Min-max normalizes `values` so that lower raw values score higher.
/// A constant column normalizes to all-ones.
fn normalize_lower_is_better(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(max > min) {
        return vec![1.0; values.len()];
    }
    values
        .iter()
        .map(|&x| 1.0 - (x - min) / (max - min))
        .collect()
}

/// Sample standard deviation (ddof = 1), 0 for fewer than 2 values.
fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    variance.sqrt()
}

/// Pearson correlation between two equal-length columns, 0 if undefined (NaN).
fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if a.len() < 2 {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let cov: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    let std_a = (a.iter().map(|x| (x - mean_a).powi(2)).sum::<f64>()).sqrt();
    let std_b = (b.iter().map(|y| (y - mean_b).powi(2)).sum::<f64>()).sqrt();
    let denom = std_a * std_b;
    if denom == 0.0 {
        0.0
    } else {
        (cov / denom).clamp(-1.0, 1.0)
    }
}

/// Computes CRITIC weights over a historical matrix whose columns are the
/// normalized `CRITERIA`, in order.
fn critic_weights(columns: &[Vec<f64>]) -> Weights {
    let k = columns.len();
    let rows = columns.first().map(Vec::len).unwrap_or(0);
    if rows < 2 {
        return Weights::equal();
    }

    let stds: Vec<f64> = columns.iter().map(|c| sample_stddev(c)).collect();
    let mut contributions = vec![0.0; k];
    for j in 0..k {
        if stds[j] < 1e-9 {
            contributions[j] = 0.0;
            continue;
        }
        let conflict_sum: f64 = (0..k).map(|l| pearson_correlation(&columns[j], &columns[l]).abs()).sum();
        let conflict = 1.0 - (conflict_sum - 1.0) / (k as f64 - 1.0).max(1.0);
        contributions[j] = (stds[j] * conflict).max(0.0);
    }

    let total: f64 = contributions.iter().sum();
    if total == 0.0 {
        return Weights::equal();
    }
    Weights {
        latency: contributions[0] / total,
        price: contributions[1] / total,
    }
}

/// Computes a per-provider score for `method` from all historical records
/// and the latest snapshot, excluding the virtual "Best" provider.
///
/// Returns `None` if there is no latest-snapshot data for `method` at all.
pub fn calculate_dynamic_scores(
    metrics: &MetricsStore,
    method: &str,
) -> Option<(Vec<ProviderScore>, Weights)> {
    let latest = metrics.latest(method);
    if latest.is_empty() {
        return None;
    }

    let history: Vec<_> = metrics
        .get_records(Some(method))
        .into_iter()
        .filter(|r| !is_virtual_best(&r.provider))
        .collect();

    let weights = if history.is_empty() {
        Weights::equal()
    } else {
        let latencies: Vec<f64> = history.iter().map(|r| r.latency_ms).collect();
        let prices: Vec<f64> = history.iter().map(|r| r.price_usd).collect();
        let norm_latency = normalize_lower_is_better(&latencies);
        let norm_price = normalize_lower_is_better(&prices);
        critic_weights(&[norm_latency, norm_price])
    };

    let latest_latencies: Vec<f64> = latest.iter().map(|r| r.latency_ms).collect();
    let latest_prices: Vec<f64> = latest.iter().map(|r| r.price_usd).collect();
    let norm_latency = normalize_lower_is_better(&latest_latencies);
    let norm_price = normalize_lower_is_better(&latest_prices);

    let scores = latest
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let raw = norm_latency[i] * weights.latency + norm_price[i] * weights.price;
            ProviderScore {
                provider: record.provider.clone(),
                latency_ms: record.latency_ms,
                price_usd: record.price_usd,
                norm_latency: norm_latency[i],
                norm_price: norm_price[i],
                score: if raw.is_nan() { 0.0 } else { raw },
            }
        })
        .collect();

    Some((scores, weights))
}

/// Convenience lookup of one provider's score out of a computed score table.
pub fn score_for(scores: &[ProviderScore], provider: &str) -> Option<f64> {
    scores
        .iter()
        .find(|s| s.provider.eq_ignore_ascii_case(provider))
        .map(|s| s.score)
}

#[allow(dead_code)]
fn criteria_names() -> HashMap<usize, &'static str> {
    CRITERIA.iter().enumerate().map(|(i, &n)| (i, n)).collect()
}
