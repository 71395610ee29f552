use std::path::PathBuf;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(config: PathBuf, boxes: u64) -> CliResult<()> {
    let (_, engine) = load_engine(&config).await?;
    let stats = engine.add_supply(boxes).await?;

    println!(
        "✅ Added {} boxes: {} total, {} available",
        boxes, stats.total_boxes, stats.available_boxes
    );
    Ok(())
}
