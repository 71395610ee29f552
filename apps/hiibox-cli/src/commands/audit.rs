use std::path::PathBuf;

use crate::commands::{load_engine, parse_wallet};
use crate::error::{CliError, CliResult};

pub async fn execute(config: PathBuf, wallet: Option<String>) -> CliResult<()> {
    let (_, engine) = load_engine(&config).await?;
    let mut consistent = true;

    let stats = engine.stats().await?;
    println!(
        "Inventory: {} total = {} available + {} opened",
        stats.total_boxes, stats.available_boxes, stats.opened_boxes
    );

    let distribution = engine.audit_distribution().await?;
    println!(
        "Distribution: {} tallied, {} recorded",
        distribution.tallied_total, distribution.recorded_total
    );
    for mismatch in &distribution.mismatches {
        consistent = false;
        println!(
            "  ❌ {}: tallied {}, recorded {}",
            mismatch.reward_type, mismatch.tallied, mismatch.recorded
        );
    }

    if let Some(wallet) = wallet {
        let wallet = parse_wallet(&wallet)?;
        let audit = engine.audit_account(&wallet).await?;
        println!(
            "Account {}: {} keys, {} opened, {} records, {} keys credited, {} spent",
            audit.wallet_address,
            audit.key_count,
            audit.boxes_opened,
            audit.opened_records,
            audit.keys_credited,
            audit.keys_spent
        );
        if !audit.opens_consistent() {
            consistent = false;
            println!("  ❌ opened counter does not match reward records");
        }
        if !audit.keys_consistent() {
            consistent = false;
            println!("  ❌ key balance does not match credits minus spends");
        }
    }

    if !consistent {
        return Err(CliError::AuditFailed(
            "campaign state does not reconcile".to_string(),
        ));
    }
    println!("✅ Audit passed");
    Ok(())
}
