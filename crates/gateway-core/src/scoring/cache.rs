//! TTL-keyed cache of computed scores, keyed by method.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::{ProviderScore, Weights};

const DEFAULT_TTL_SECONDS: f64 = 5.0;

struct CacheEntry {
    scores: Vec<ProviderScore>,
    weights: Weights,
    cached_at: Instant,
}

/// Hit/miss counters reported by [`ScoreCache::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of `get` calls that returned a live entry.
    pub hits: u64,
    /// Number of `get` calls that found nothing or an expired entry.
    pub misses: u64,
    /// Number of distinct methods currently cached.
    pub cached_methods: usize,
}

impl CacheStats {
    /// `hits / (hits + misses)` as a percentage, 0 when nothing has been queried.
    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Mutex-serialized, TTL-expiring cache of per-method score computations.
///
/// Reads return copies so callers can never alias the cached state.
pub struct ScoreCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl ScoreCache {
    /// Creates a cache with the default 5-second TTL.
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs_f64(DEFAULT_TTL_SECONDS))
    }

    /// Creates a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Returns a live entry for `method`, if any. Counts toward hit/miss stats.
    pub async fn get(&self, method: &str) -> Option<(Vec<ProviderScore>, Weights)> {
        let entries = self.entries.lock().await;
        match entries.get(method) {
            Some(entry) if entry.cached_at.elapsed() <= self.ttl => {
                self.hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Some((entry.scores.clone(), entry.weights))
            }
            _ => {
                self.misses
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                None
            }
        }
    }

    /// Stores a fresh computation for `method`.
    pub async fn set(&self, method: &str, scores: Vec<ProviderScore>, weights: Weights) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            method.to_string(),
            CacheEntry {
                scores,
                weights,
                cached_at: Instant::now(),
            },
        );
    }

    /// Invalidates one method's entry, or every entry when `method` is `None`.
    pub async fn invalidate(&self, method: Option<&str>) {
        let mut entries = self.entries.lock().await;
        match method {
            Some(m) => {
                entries.remove(m);
            }
            None => entries.clear(),
        }
    }

    /// Current hit/miss counters plus the number of cached methods.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().await;
        CacheStats {
            hits: self.hits.load(std::sync::atomic::Ordering::SeqCst),
            misses: self.misses.load(std::sync::atomic::Ordering::SeqCst),
            cached_methods: entries.len(),
        }
    }

    /// Zeroes the hit/miss counters without touching cached entries.
    pub fn reset_stats(&self) {
        self.hits.store(0, std::sync::atomic::Ordering::SeqCst);
        self.misses.store(0, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new()
    }
}
