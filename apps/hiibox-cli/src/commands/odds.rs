use hiibox_engine::EngineError;
use std::path::PathBuf;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(config: PathBuf, tier: Option<String>, json: bool) -> CliResult<()> {
    let (_, engine) = load_engine(&config).await?;
    let mut table = engine.reward_table().await?;
    if let Some(tier) = tier.as_deref() {
        table = table.for_tier(tier).map_err(EngineError::from)?;
    }
    let odds = table.odds();

    if json {
        println!("{}", serde_json::to_string_pretty(&odds)?);
        return Ok(());
    }

    println!("Reward odds (total weight {}):", table.total_weight());
    for entry in &odds {
        println!(
            "  {:<12} {:<32} {:<12} {:<10} {:>10.4}%",
            entry.box_tier,
            entry.name,
            entry.kind.as_str(),
            entry.rarity.as_str(),
            entry.probability * 100.0
        );
    }
    Ok(())
}
