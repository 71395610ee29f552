use backoff::ExponentialBackoff;
use hiibox_csvs::DEFAULT_BOX_TIER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// What happens when an open would take the campaign below zero available boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyPolicy {
    /// Exhaustion blocks the open and the user is not charged
    #[default]
    Enforced,

    /// The open succeeds without touching the supply counters; the reward is
    /// still tallied in the distribution
    BestEffort,
}

/// Configuration for the box-opening engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Keys consumed by opening a box of the default tier
    pub keys_per_open: u64,

    /// Key price of every other box tier (e.g. bronze 1, silver 3, gold 5)
    pub box_tiers: BTreeMap<String, u64>,

    /// Whether an open also consumes one owned box
    pub box_gating: bool,

    /// Whether a specific box id is checked against the chain before opening
    pub verify_on_chain: bool,

    pub supply_policy: SupplyPolicy,

    /// Backoff for transactions that hit sqlite lock contention
    pub storage_retry: ExponentialBackoff,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keys_per_open: 1,
            box_tiers: BTreeMap::new(),
            box_gating: true,
            verify_on_chain: true,
            supply_policy: SupplyPolicy::Enforced,
            storage_retry: ExponentialBackoff {
                initial_interval: Duration::from_millis(10),
                max_interval: Duration::from_millis(500),
                max_elapsed_time: Some(Duration::from_secs(10)),
                multiplier: 2.0,
                ..Default::default()
            },
        }
    }
}

impl EngineConfig {
    /// Keys one box of `box_tier` costs, or `None` for a tier nobody priced
    pub fn tier_price(&self, box_tier: &str) -> Option<u64> {
        match self.box_tiers.get(box_tier) {
            Some(&keys) => Some(keys),
            None if box_tier == DEFAULT_BOX_TIER => Some(self.keys_per_open),
            None => None,
        }
    }

    /// Units a single open consumes: `(keys, boxes)`
    pub fn open_cost(&self, box_tier: &str, box_id: Option<u64>) -> Option<(u64, u64)> {
        let boxes = if self.box_gating || box_id.is_some() { 1 } else { 0 };
        Some((self.tier_price(box_tier)?, boxes))
    }
}
