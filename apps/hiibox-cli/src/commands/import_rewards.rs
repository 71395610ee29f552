use hiibox_csvs::read_rewards_csv;
use std::path::PathBuf;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(config: PathBuf, csv: Option<PathBuf>) -> CliResult<()> {
    let (config, engine) = load_engine(&config).await?;
    let csv = csv.unwrap_or(config.rewards_csv);

    println!("Reading rewards from {}...", csv.display());
    let rows = read_rewards_csv(&csv)?;
    let imported = engine.import_rewards(&rows).await?;

    println!("✅ Replaced reward table with {} rewards", imported);
    Ok(())
}
