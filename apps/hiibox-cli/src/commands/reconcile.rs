use std::path::PathBuf;

use crate::commands::{load_engine, parse_wallet};
use crate::error::CliResult;

pub async fn execute(config: PathBuf, wallet: String) -> CliResult<()> {
    let (_, engine) = load_engine(&config).await?;
    let wallet = parse_wallet(&wallet)?;

    engine.sign_in(&wallet).await?;
    let sync = engine.reconcile_boxes(&wallet).await?;

    println!("Reconciled {}", wallet);
    println!("  Added:    {:?}", sync.added);
    println!("  Released: {:?}", sync.released);
    println!("  Owned:    {}", sync.boxes_owned);
    Ok(())
}
