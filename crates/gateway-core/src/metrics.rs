//! Append-only store of per-(provider, method) latency/price observations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::provider::is_virtual_best;

/// One observation of a dispatch to a provider for a method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Provider name, preserved verbatim for display.
    pub provider: String,
    /// JSON-RPC method this call was for.
    pub method: String,
    /// Observed round-trip latency in milliseconds.
    pub latency_ms: f64,
    /// USD price charged for this call.
    pub price_usd: f64,
    /// Whether this dispatch was eligible for normal scoring (always true
    /// for records appended by the router today; reserved for future use).
    pub eligible: bool,
    /// Monotonic sequence number within this (provider, method) pair.
    pub request_seq: u64,
}

/// Append-only per-(provider, method) record of latency and price.
///
/// Backed by a `Vec` guarded by a single `RwLock` plus a `DashMap` count
/// index, replacing the tabular dataframe of the system this was
/// distilled from.
#[derive(Debug, Default)]
pub struct MetricsStore {
    records: RwLock<Vec<MetricRecord>>,
    counts: DashMap<(String, String), AtomicU64>,
}

impl MetricsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one observation. O(1) amortized.
    pub fn append(&self, provider: &str, method: &str, latency_ms: f64, price_usd: f64) {
        let key = (provider.to_string(), method.to_string());
        let seq = self
            .counts
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1;

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.push(MetricRecord {
            provider: provider.to_string(),
            method: method.to_string(),
            latency_ms,
            price_usd,
            eligible: true,
            request_seq: seq,
        });
    }

    /// Returns all records, optionally filtered to one method, in insertion order.
    pub fn get_records(&self, method: Option<&str>) -> Vec<MetricRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        match method {
            Some(m) => records.iter().filter(|r| r.method == m).cloned().collect(),
            None => records.clone(),
        }
    }

    /// One record per provider for `method`: the most recently appended,
    /// excluding the virtual "Best" provider.
    pub fn latest(&self, method: &str) -> Vec<MetricRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for record in records.iter().rev() {
            if record.method != method || is_virtual_best(&record.provider) {
                continue;
            }
            let key = record.provider.to_lowercase();
            if seen.insert(key) {
                out.push(record.clone());
            }
        }
        out
    }

    /// The latency of the most recently appended record for (provider, method),
    /// or `default_ms` if there is none yet.
    ///
    /// This is the single code path every caller (router candidate ordering,
    /// scoring engine "latest snapshot" input) goes through, so the process
    /// is consistent about what "observed latency" means.
    pub fn latest_latency(&self, provider: &str, method: &str, default_ms: f64) -> f64 {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records
            .iter()
            .rev()
            .find(|r| r.method == method && r.provider.eq_ignore_ascii_case(provider))
            .map(|r| r.latency_ms)
            .unwrap_or(default_ms)
    }

    /// Total number of appended records for (provider, method).
    pub fn request_count(&self, provider: &str, method: &str) -> u64 {
        self.counts
            .get(&(provider.to_string(), method.to_string()))
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total record count across every method for `provider`. Used by
    /// compute-unit/credit pricing to evaluate cumulative usage tiers.
    pub fn total_units(&self, provider: &str, cost_of: impl Fn(&str) -> u64) -> u64 {
        self.counts
            .iter()
            .filter(|entry| entry.key().0.eq_ignore_ascii_case(provider))
            .map(|entry| cost_of(&entry.key().1) * entry.value().load(Ordering::SeqCst))
            .sum()
    }

    /// All (provider, method) -> count pairs.
    pub fn all_counts(&self) -> std::collections::HashMap<(String, String), u64> {
        self.counts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::SeqCst)))
            .collect()
    }
}
