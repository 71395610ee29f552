use hiibox_engine::api::StatsResponse;
use std::path::PathBuf;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(config: PathBuf, json: bool) -> CliResult<()> {
    let (config, engine) = load_engine(&config).await?;
    let stats: StatsResponse = engine.stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Campaign: {}", config.campaign_name);
    println!("  Total boxes:     {}", stats.total_boxes);
    println!("  Available boxes: {}", stats.available_boxes);
    println!(
        "  Opened boxes:    {} ({:.2}%)",
        stats.opened_boxes, stats.opening_percentage
    );
    println!("  Next box:        #{}", stats.next_box_position);
    println!("  Rewards issued:");
    for (reward_type, issued) in &stats.reward_distribution {
        println!("    {:<12} {}", reward_type, issued);
    }
    Ok(())
}
