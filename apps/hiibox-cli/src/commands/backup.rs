use hiibox_engine::{backup_campaign_db, open_readonly_campaign_db, reward_table::RewardTable};
use std::path::PathBuf;
use tracing::warn;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(config: PathBuf, output: PathBuf) -> CliResult<()> {
    let (config, engine) = load_engine(&config).await?;

    println!(
        "Backing up {} to {}...",
        config.database_path.display(),
        output.display()
    );
    backup_campaign_db(engine.db(), &output).await?;

    let backup = open_readonly_campaign_db(&output).await?;
    let rewards = match RewardTable::load(&backup).await {
        Ok(table) => table.definitions().len(),
        Err(e) => {
            warn!("Backup has no usable reward table: {}", e);
            0
        }
    };
    println!("✅ Backup written ({} rewards)", rewards);
    Ok(())
}
