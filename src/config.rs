//! Configuration loading: compiled-in defaults, an optional `gateway.toml`,
//! then an environment-variable overlay, in increasing precedence.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use gateway_core::{PricingModel, PricingTiers, Priority, Provider};
use serde::{Deserialize, Serialize};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Declared upstream providers.
    #[serde(default = "default_providers")]
    pub providers: Vec<Provider>,
    /// Scoring cache tunables.
    #[serde(default)]
    pub cache: ScoreCacheConfig,
    /// Per-attempt upstream dispatch timeout, in milliseconds.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    /// Exploration (epsilon-greedy candidate promotion) settings.
    #[serde(default)]
    pub exploration: ExplorationConfig,
    /// HTTP server binding.
    #[serde(default)]
    pub server: HttpServerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            cache: ScoreCacheConfig::default(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            exploration: ExplorationConfig::default(),
            server: HttpServerConfig::default(),
        }
    }
}

fn default_dispatch_timeout_ms() -> u64 {
    5_000
}

/// Scoring cache tunables (§4.7 of the core design).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCacheConfig {
    /// Whether the score cache is consulted at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time-to-live for a cached per-method computation, in seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: f64,
}

impl Default for ScoreCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_seconds() -> f64 {
    5.0
}

/// Epsilon-greedy candidate promotion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationConfig {
    /// Whether exploration is enabled at all.
    #[serde(default)]
    pub enabled: bool,
    /// Probability, in `[0, 1]`, of promoting a random priority-1 candidate.
    #[serde(default)]
    pub rate: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 0.0,
        }
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Sample providers exercising each of the three pricing models, used when
/// no `gateway.toml` is present. Non-normative: real deployments always
/// supply their own provider list.
fn default_providers() -> Vec<Provider> {
    vec![
        Provider {
            name: "Chainstack".to_string(),
            base_url: "https://chainstack.example.invalid/rpc".to_string(),
            priority: Priority::Free,
            limit_rps: 10,
            limit_monthly: 3_000_000,
            pricing_model: PricingModel::Flat,
            pricing_tiers: PricingTiers {
                threshold: 20_000_000,
                high_volume_price: 0.000015,
                low_volume_price: 0.00000245,
            },
        },
        Provider {
            name: "Alchemy".to_string(),
            base_url: "https://alchemy.example.invalid/rpc".to_string(),
            priority: Priority::Paid,
            limit_rps: 25,
            limit_monthly: 0,
            pricing_model: PricingModel::ComputeUnit {
                method_costs: HashMap::from([
                    ("eth_call".to_string(), 26),
                    ("eth_getLogs".to_string(), 75),
                ]),
            },
            pricing_tiers: PricingTiers {
                threshold: 300_000_000,
                high_volume_price: 0.00000012,
                low_volume_price: 0.00000040,
            },
        },
        Provider {
            name: "QuickNode".to_string(),
            base_url: "https://quicknode.example.invalid/rpc".to_string(),
            priority: Priority::Paid,
            limit_rps: 15,
            limit_monthly: 0,
            pricing_model: PricingModel::Credit {
                method_costs: HashMap::from([
                    ("eth_sendRawTransaction".to_string(), 40),
                    ("default".to_string(), 20),
                ]),
            },
            pricing_tiers: PricingTiers {
                threshold: 80_000_000,
                high_volume_price: 0.0000009,
                low_volume_price: 0.0000015,
            },
        },
    ]
}

/// Loads configuration from `path` (defaulting to `gateway.toml` in the
/// current directory) if present, then applies the `PAID_PROVIDERS` /
/// `{NAME}_URL` environment-variable overlay.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::path::PathBuf::from("gateway.toml"));

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        GatewayConfig::default()
    };

    apply_env_overlay(&mut config);
    Ok(config)
}

/// Applies `PAID_PROVIDERS` (comma-separated, case-insensitive names get
/// `Priority::Paid`, the rest `Priority::Free`) and `{NAME}_URL` overrides.
fn apply_env_overlay(config: &mut GatewayConfig) {
    let paid: Vec<String> = std::env::var("PAID_PROVIDERS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    for provider in &mut config.providers {
        provider.priority = if paid.contains(&provider.name.to_lowercase()) {
            Priority::Paid
        } else {
            Priority::Free
        };

        let env_key = format!("{}_URL", provider.name.to_uppercase());
        if let Ok(url) = std::env::var(&env_key) {
            provider.base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_one_provider_per_pricing_model() {
        let config = GatewayConfig::default();
        assert_eq!(config.providers.len(), 3);
        assert!(matches!(
            config.providers[0].pricing_model,
            PricingModel::Flat
        ));
        assert!(matches!(
            config.providers[1].pricing_model,
            PricingModel::ComputeUnit { .. }
        ));
        assert!(matches!(
            config.providers[2].pricing_model,
            PricingModel::Credit { .. }
        ));
    }

    #[test]
    fn env_overlay_promotes_named_providers_to_paid() {
        std::env::set_var("PAID_PROVIDERS", "chainstack");
        let mut config = GatewayConfig::default();
        apply_env_overlay(&mut config);
        assert_eq!(config.providers[0].priority, Priority::Paid);
        assert_eq!(config.providers[1].priority, Priority::Free);
        std::env::remove_var("PAID_PROVIDERS");
    }

    #[test]
    fn env_overlay_overrides_base_url() {
        std::env::set_var("CHAINSTACK_URL", "https://override.invalid/rpc");
        let mut config = GatewayConfig::default();
        apply_env_overlay(&mut config);
        assert_eq!(config.providers[0].base_url, "https://override.invalid/rpc");
        std::env::remove_var("CHAINSTACK_URL");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load(Some(Path::new("/nonexistent/gateway.toml"))).unwrap();
        assert_eq!(config.providers.len(), 3);
    }
}
