//! Declared provider configuration: priority, limits, and pricing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Relative preference tier. Lower is preferred; free-tier capacity is
/// drained before paid capacity is ever touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Free-tier capacity.
    Free = 1,
    /// Paid-tier capacity.
    Paid = 2,
}

/// The reserved name of the virtual "Best" routing-decision handle.
///
/// It carries no URL, makes no upstream calls, and must be excluded from
/// every candidate enumeration, metrics snapshot, and analytics aggregate.
pub const VIRTUAL_BEST: &str = "best";

/// Case-insensitive check for the virtual "Best" pseudo-provider.
pub fn is_virtual_best(name: &str) -> bool {
    name.eq_ignore_ascii_case(VIRTUAL_BEST)
}

/// A two-tier USD schedule selected by cumulative usage against a threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTiers {
    /// Cumulative usage above which the high-volume price applies.
    pub threshold: u64,
    /// Unit price once `threshold` has been crossed.
    pub high_volume_price: f64,
    /// Unit price while usage is at or below `threshold`.
    pub low_volume_price: f64,
}

/// How a provider bills for calls.
///
/// Replaces subclassed pricing strategies with a closed, tagged variant:
/// `cost_of`/`price_per_call` are pure functions of the variant plus the
/// running usage counters, never virtual dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PricingModel {
    /// One unit per call regardless of method.
    Flat,
    /// Method-specific compute-unit cost, default 10 when unlisted.
    ComputeUnit {
        /// Per-method compute-unit cost.
        method_costs: HashMap<String, u64>,
    },
    /// Method-specific credit cost, default from `"default"` or 20.
    Credit {
        /// Per-method credit cost.
        method_costs: HashMap<String, u64>,
    },
}

impl PricingModel {
    /// Units consumed by one call to `method`.
    pub fn cost_of(&self, method: &str) -> u64 {
        match self {
            PricingModel::Flat => 1,
            PricingModel::ComputeUnit { method_costs } => {
                *method_costs.get(method).unwrap_or(&10)
            }
            PricingModel::Credit { method_costs } => *method_costs
                .get(method)
                .or_else(|| method_costs.get("default"))
                .unwrap_or(&20),
        }
    }
}

/// Immutable, startup-loaded configuration for one upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Unique, case-insensitive key.
    pub name: String,
    /// Upstream endpoint.
    pub base_url: String,
    /// Free or paid tier.
    pub priority: Priority,
    /// Requests-per-second allowance. 0 or negative means unlimited.
    pub limit_rps: i64,
    /// Monthly unit allowance. 0 or negative means unlimited.
    pub limit_monthly: i64,
    /// Billing scheme.
    pub pricing_model: PricingModel,
    /// Pricing tier schedule for USD accounting.
    pub pricing_tiers: PricingTiers,
}

impl Provider {
    /// Units consumed by one call to `method`.
    pub fn cost_of(&self, method: &str) -> u64 {
        self.pricing_model.cost_of(method)
    }

    /// USD price of one call to `method`, given the provider's running usage
    /// totals in its own billing unit (requests for `flat`, cumulative
    /// compute-units/credits for the other two models).
    pub fn price_per_call(&self, method: &str, cumulative_units: u64) -> f64 {
        let tiers = &self.pricing_tiers;
        match &self.pricing_model {
            PricingModel::Flat => {
                if cumulative_units > tiers.threshold {
                    tiers.high_volume_price
                } else {
                    tiers.low_volume_price
                }
            }
            PricingModel::ComputeUnit { .. } | PricingModel::Credit { .. } => {
                let unit_cost = self.cost_of(method);
                let unit_price = if cumulative_units > tiers.threshold {
                    tiers.high_volume_price
                } else {
                    tiers.low_volume_price
                };
                unit_price * unit_cost as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_provider() -> Provider {
        Provider {
            name: "Chainstack".into(),
            base_url: "http://example.invalid".into(),
            priority: Priority::Free,
            limit_rps: 10,
            limit_monthly: 100,
            pricing_model: PricingModel::Flat,
            pricing_tiers: PricingTiers {
                threshold: 20_000_000,
                high_volume_price: 0.000015,
                low_volume_price: 0.00000245,
            },
        }
    }

    #[test]
    fn flat_cost_is_always_one() {
        let p = flat_provider();
        assert_eq!(p.cost_of("eth_blockNumber"), 1);
        assert_eq!(p.cost_of("eth_call"), 1);
    }

    #[test]
    fn flat_price_switches_tier_at_threshold() {
        let p = flat_provider();
        assert_eq!(
            p.price_per_call("eth_blockNumber", 0),
            p.pricing_tiers.low_volume_price
        );
        assert_eq!(
            p.price_per_call("eth_blockNumber", 20_000_001),
            p.pricing_tiers.high_volume_price
        );
    }

    #[test]
    fn compute_unit_cost_defaults_to_ten() {
        let mut costs = HashMap::new();
        costs.insert("eth_call".to_string(), 26);
        let model = PricingModel::ComputeUnit {
            method_costs: costs,
        };
        assert_eq!(model.cost_of("eth_call"), 26);
        assert_eq!(model.cost_of("unlisted_method"), 10);
    }

    #[test]
    fn credit_cost_falls_back_to_default_entry() {
        let mut costs = HashMap::new();
        costs.insert("trace_call".to_string(), 40);
        costs.insert("default".to_string(), 20);
        let model = PricingModel::Credit {
            method_costs: costs,
        };
        assert_eq!(model.cost_of("trace_call"), 40);
        assert_eq!(model.cost_of("eth_blockNumber"), 20);
    }

    #[test]
    fn credit_cost_falls_back_to_twenty_with_no_default_entry() {
        let model = PricingModel::Credit {
            method_costs: HashMap::new(),
        };
        assert_eq!(model.cost_of("anything"), 20);
    }

    #[test]
    fn virtual_best_is_case_insensitive() {
        assert!(is_virtual_best("Best"));
        assert!(is_virtual_best("BEST"));
        assert!(is_virtual_best("best"));
        assert!(!is_virtual_best("Chainstack"));
    }
}
