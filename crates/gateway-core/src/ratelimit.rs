//! Per-provider sliding-window rate limiting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default window over which `limit_rps` is evaluated.
const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Sliding-window allowance, one timestamp deque per provider.
///
/// Purely local: no coordination across providers or processes. Denials are
/// idempotent — a denied check never grows the queue.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    timestamps: DashMap<String, VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    /// Creates a limiter with a custom window size.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timestamps: DashMap::new(),
        }
    }

    /// Returns true and records `now` iff fewer than `limit_rps` timestamps
    /// remain in the window after pruning. `limit_rps <= 0` always allows.
    pub fn is_allowed(&self, provider: &str, limit_rps: i64) -> bool {
        if limit_rps <= 0 {
            return true;
        }
        let limit_rps = limit_rps as usize;
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);

        let mut queue = self
            .timestamps
            .entry(provider.to_string())
            .or_default();
        while let Some(&front) = queue.front() {
            if front < cutoff {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() < limit_rps {
            queue.push_back(now);
            true
        } else {
            false
        }
    }
}
