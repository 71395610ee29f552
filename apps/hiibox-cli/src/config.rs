use hiibox_bridge::InMemoryBridge;
use hiibox_engine::{EngineConfig, SupplyPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Campaign configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Human-readable campaign name (for organization)
    pub campaign_name: String,

    /// sqlite database holding the campaign state
    pub database_path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Box supply created by `init`
    pub total_boxes: u64,

    /// Reward catalogue imported by `init`
    pub rewards_csv: PathBuf,

    /// Task catalogue imported by `init`
    pub tasks_csv: PathBuf,

    #[serde(default)]
    pub engine: EngineSettings,

    /// Local stand-in for the chain, for dry runs without a node
    #[serde(default)]
    pub ledger: Vec<HolderConfig>,
}

/// Engine knobs exposed to operators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub keys_per_open: u64,

    /// Key price per named box tier
    pub box_tiers: BTreeMap<String, u64>,

    pub box_gating: bool,
    pub verify_on_chain: bool,
    pub supply_policy: SupplyPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            keys_per_open: defaults.keys_per_open,
            box_tiers: defaults.box_tiers,
            box_gating: defaults.box_gating,
            verify_on_chain: defaults.verify_on_chain,
            supply_policy: defaults.supply_policy,
        }
    }
}

/// On-chain holdings of one wallet in the local ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderConfig {
    pub wallet: String,

    #[serde(default)]
    pub boxes: Vec<u64>,

    /// NFT balances by collection
    #[serde(default)]
    pub nfts: BTreeMap<String, u64>,
}

impl CampaignConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let file = std::fs::File::open(path)?;
        let config: CampaignConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.max_connections == 0 {
            return Err(CliError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.engine.keys_per_open == 0 {
            return Err(CliError::InvalidConfig(
                "engine.keys_per_open must be at least 1".to_string(),
            ));
        }
        if let Some((tier, _)) = self.engine.box_tiers.iter().find(|(_, keys)| **keys == 0) {
            return Err(CliError::InvalidConfig(format!(
                "engine.box_tiers.{} must cost at least 1 key",
                tier
            )));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            keys_per_open: self.engine.keys_per_open,
            box_tiers: self.engine.box_tiers.clone(),
            box_gating: self.engine.box_gating,
            verify_on_chain: self.engine.verify_on_chain,
            supply_policy: self.engine.supply_policy,
            ..Default::default()
        }
    }

    /// In-memory chain seeded with the configured holdings
    pub fn local_ledger(&self) -> InMemoryBridge {
        let ledger = InMemoryBridge::new();
        for holder in &self.ledger {
            ledger.mint_boxes(&holder.wallet, holder.boxes.iter().copied());
            for (collection, balance) in &holder.nfts {
                ledger.set_nft_balance(&holder.wallet, collection, *balance);
            }
        }
        ledger
    }
}

fn default_max_connections() -> u32 {
    8
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiibox_bridge::OnChainBridge as _;

    const CONFIG: &str = r#"
campaign_name: HiiBox Season 1
database_path: data/season1.db
total_boxes: 10000
rewards_csv: rewards.csv
tasks_csv: tasks.csv
engine:
  supply_policy: best_effort
  box_tiers:
    bronze: 1
    silver: 3
    gold: 5
ledger:
  - wallet: "0x00000000000000000000000000000000000000aa"
    boxes: [1, 2]
    nfts:
      apes: 3
"#;

    #[test]
    fn test_parse_campaign_config() {
        let config: CampaignConfig = serde_yaml::from_str(CONFIG).unwrap();
        config.validate().unwrap();

        assert_eq!(config.max_connections, 8);
        assert_eq!(config.total_boxes, 10_000);

        let engine = config.engine_config();
        assert_eq!(engine.supply_policy, SupplyPolicy::BestEffort);
        assert_eq!(engine.keys_per_open, 1);
        assert!(engine.box_gating);
        assert_eq!(engine.tier_price("gold"), Some(5));
        assert_eq!(engine.tier_price("platinum"), None);

        assert_eq!(config.ledger[0].boxes, vec![1, 2]);
        assert_eq!(config.ledger[0].nfts.get("apes"), Some(&3));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, CONFIG.as_bytes()).unwrap();

        let config = CampaignConfig::load(file.path()).unwrap();
        assert_eq!(config.campaign_name, "HiiBox Season 1");

        let ledger = config.local_ledger();
        let wallet = "0x00000000000000000000000000000000000000aa";
        assert_eq!(ledger.owned_box_ids(wallet).await.unwrap(), vec![1, 2]);
        assert_eq!(ledger.nft_balance(wallet, "apes").await.unwrap(), 3);
    }

    #[test]
    fn test_zero_keys_per_open_rejected() {
        let mut config: CampaignConfig = serde_yaml::from_str(CONFIG).unwrap();
        config.engine.keys_per_open = 0;
        assert!(matches!(config.validate(), Err(CliError::InvalidConfig(_))));
    }

    #[test]
    fn test_free_box_tier_rejected() {
        let mut config: CampaignConfig = serde_yaml::from_str(CONFIG).unwrap();
        config.engine.box_tiers.insert("silver".to_string(), 0);
        assert!(matches!(config.validate(), Err(CliError::InvalidConfig(_))));
    }
}
