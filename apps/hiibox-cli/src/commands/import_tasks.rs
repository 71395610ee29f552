use hiibox_csvs::read_tasks_csv;
use std::path::PathBuf;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(config: PathBuf, csv: Option<PathBuf>) -> CliResult<()> {
    let (config, engine) = load_engine(&config).await?;
    let csv = csv.unwrap_or(config.tasks_csv);

    println!("Reading tasks from {}...", csv.display());
    let rows = read_tasks_csv(&csv)?;
    let imported = engine.import_tasks(&rows).await?;

    println!("✅ Imported {} tasks", imported);
    Ok(())
}
