//! Monthly usage accounting with atomic reserve/rollback and file persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::warn;

/// Process-wide accounting for monthly provider usage.
///
/// Constructed and owned by the caller (handed into the router at
/// construction) rather than reached through an ambient singleton, so a
/// test harness can point it at an isolated path.
pub struct QuotaManager {
    path: PathBuf,
    usage: Mutex<HashMap<String, i64>>,
}

impl QuotaManager {
    /// Loads counters from `path` if present, tolerating a missing or
    /// malformed file by starting from an empty map.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let usage = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            usage: Mutex::new(usage),
        }
    }

    /// True iff `limit <= 0` (unlimited) or `used[provider] + cost <= limit`.
    pub async fn check(&self, provider: &str, limit: i64, cost: i64) -> bool {
        if limit <= 0 {
            return true;
        }
        let usage = self.usage.lock().await;
        let used = usage.get(provider).copied().unwrap_or(0);
        used + cost <= limit
    }

    /// Current usage for `provider`, 0 if never recorded.
    pub async fn usage(&self, provider: &str) -> i64 {
        let usage = self.usage.lock().await;
        usage.get(provider).copied().unwrap_or(0)
    }

    /// If `check(provider, limit, cost)` holds, adds `cost` to the provider's
    /// usage, persists, and returns true. Otherwise returns false without
    /// mutating state.
    pub async fn try_reserve(&self, provider: &str, cost: i64, limit: i64) -> bool {
        let snapshot = {
            let mut usage = self.usage.lock().await;
            let used = usage.get(provider).copied().unwrap_or(0);
            if limit > 0 && used + cost > limit {
                return false;
            }
            let entry = usage.entry(provider.to_string()).or_insert(0);
            *entry += cost;
            usage.clone()
        };
        self.persist(snapshot).await;
        true
    }

    /// Subtracts `cost` from the provider's usage, clamped at zero, and persists.
    pub async fn rollback(&self, provider: &str, cost: i64) {
        let snapshot = {
            let mut usage = self.usage.lock().await;
            let entry = usage.entry(provider.to_string()).or_insert(0);
            *entry = (*entry - cost).max(0);
            usage.clone()
        };
        self.persist(snapshot).await;
    }

    /// Zeroes `provider`'s usage. The only rollover mechanism; there is no
    /// automatic monthly reset.
    pub async fn reset(&self, provider: &str) {
        let snapshot = {
            let mut usage = self.usage.lock().await;
            usage.insert(provider.to_string(), 0);
            usage.clone()
        };
        self.persist(snapshot).await;
    }

    /// Writes the full counter map via a temp-file-then-rename so a crash
    /// mid-write never corrupts the prior snapshot. Failures are logged and
    /// otherwise ignored — persistence is best-effort, not a correctness
    /// requirement of the in-memory state.
    async fn persist(&self, snapshot: HashMap<String, i64>) {
        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp_path = tmp_path_for(&path);
            let body = serde_json::to_string_pretty(&snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            std::fs::write(&tmp_path, body)?;
            std::fs::rename(&tmp_path, &path)?;
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to persist quota counters"),
            Err(e) => warn!(error = %e, "quota persistence task panicked"),
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
