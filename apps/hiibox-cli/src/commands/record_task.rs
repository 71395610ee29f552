use hiibox_engine::{EngineError, TaskDefinitionExt as _, TaskKind, api::TaskGrantResponse, task_ledger};
use std::path::PathBuf;

use crate::commands::{load_engine, parse_wallet};
use crate::error::CliResult;

pub async fn execute(
    config: PathBuf,
    wallet: String,
    task_id: String,
    verified: bool,
) -> CliResult<()> {
    let (_, engine) = load_engine(&config).await?;
    let wallet = parse_wallet(&wallet)?;
    engine.sign_in(&wallet).await?;

    let task = task_ledger::find_task(engine.db(), &task_id)
        .await
        .map_err(EngineError::from)?;

    let grant = match task.kind() {
        TaskKind::Nft => engine.verify_nft_task(&wallet, &task_id).await?,
        TaskKind::Social | TaskKind::Onchain => {
            engine.submit_task(&wallet, &task_id, verified).await?
        }
    };

    let response = TaskGrantResponse::from(grant);
    println!("{}: {}", task.title, response.message);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
