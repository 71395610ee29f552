pub mod add_supply;
pub mod audit;
pub mod backup;
pub mod import_rewards;
pub mod import_tasks;
pub mod init;
pub mod odds;
pub mod open_box;
pub mod reconcile;
pub mod record_task;
pub mod simulate;
pub mod stats;

use hiibox_bridge::RetryingBridge;
use hiibox_engine::{BoxOpeningEngine, WalletAddress, open_campaign_db};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::CampaignConfig;
use crate::error::CliResult;

/// Load the campaign config and build an engine over its database and local ledger
pub async fn load_engine(config_path: &Path) -> CliResult<(CampaignConfig, BoxOpeningEngine)> {
    let config = CampaignConfig::load(config_path)?;
    debug!("Loaded campaign config {}", config.campaign_name);

    let db = open_campaign_db(&config.database_path, config.max_connections).await?;
    let bridge = Arc::new(RetryingBridge::new(config.local_ledger()));
    let engine = BoxOpeningEngine::with_config(db, bridge, config.engine_config());

    Ok((config, engine))
}

pub fn parse_wallet(wallet: &str) -> CliResult<WalletAddress> {
    Ok(wallet.parse()?)
}
