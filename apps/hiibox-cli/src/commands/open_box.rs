use hiibox_engine::api::{ApiError, MeResponse, OpenBoxResponse};
use std::path::PathBuf;
use tracing::error;

use crate::commands::{load_engine, parse_wallet};
use crate::error::CliResult;

pub async fn execute(
    config: PathBuf,
    wallet: String,
    box_id: Option<u64>,
    tier: Option<String>,
    burn: bool,
) -> CliResult<()> {
    let (_, engine) = load_engine(&config).await?;
    let wallet = parse_wallet(&wallet)?;

    engine.sign_in(&wallet).await?;
    engine.reconcile_boxes(&wallet).await?;

    let result = match tier.as_deref() {
        Some(tier) => engine.open_tier_box(&wallet, tier, box_id).await,
        None => engine.open_box(&wallet, box_id).await,
    };
    let opened = match result {
        Ok(opened) => opened,
        Err(e) => {
            let body = ApiError::from(&e);
            error!("Open failed with {}: {}", body.status, e);
            println!("{}", serde_json::to_string_pretty(&body)?);
            return Err(e.into());
        }
    };

    let response = OpenBoxResponse::from(&opened);
    println!("🎁 {}", response.message);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if burn && opened.record.box_token_id.is_some() {
        let tx_hash = engine.burn_and_attach(opened.record.id).await?;
        println!("🔥 Burned box in {}", tx_hash);
    }

    let me = MeResponse::from(&opened.account);
    println!(
        "{}: {} keys, {} boxes, {} opened",
        me.wallet_address, me.key_count, me.boxes_owned, me.boxes_opened
    );
    Ok(())
}
