use hiibox_csvs::{read_rewards_csv, read_tasks_csv};
use std::path::PathBuf;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(config: PathBuf) -> CliResult<()> {
    let (config, engine) = load_engine(&config).await?;

    println!("Initializing campaign: {}", config.campaign_name);
    println!("Database: {}", config.database_path.display());

    println!("Reading rewards from {}...", config.rewards_csv.display());
    let rewards = read_rewards_csv(&config.rewards_csv)?;
    let imported = engine.import_rewards(&rewards).await?;
    println!("✅ Imported {} rewards", imported);

    println!("Reading tasks from {}...", config.tasks_csv.display());
    let tasks = read_tasks_csv(&config.tasks_csv)?;
    let imported = engine.import_tasks(&tasks).await?;
    println!("✅ Imported {} tasks", imported);

    let stats = engine.initialize_inventory(config.total_boxes).await?;
    if stats.total_boxes != config.total_boxes {
        println!(
            "Inventory already initialized with {} boxes; use add-supply to grow it",
            stats.total_boxes
        );
    } else {
        println!("✅ Campaign supply: {} boxes", stats.total_boxes);
    }

    Ok(())
}
