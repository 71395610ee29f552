/*!
# HiiBox Engine

Server-side core of a HiiBox campaign: users earn keys by completing tasks,
hold box tokens on-chain, and spend keys (and a box) to open a box for a
weighted-random reward.

## Guarantees

- **No double spend**: keys and boxes are reserved with a single conditional
  `UPDATE`, so concurrent opens against one account succeed at most as many
  times as the balances allow.
- **Reward conservation**: every successful open writes exactly one reward
  record; a failure after the reservation rolls the whole open back.
- **Bounded supply**: `total_boxes = available_boxes + opened_boxes` always
  holds for the campaign inventory.
- **Idempotent tasks**: a task credits keys at most once per account (NFT tasks
  may top up as holdings grow).

## Usage

```rust,no_run
use hiibox_bridge::InMemoryBridge;
use hiibox_engine::{BoxOpeningEngine, WalletAddress, new_writeable_campaign_db};
use std::sync::Arc;

# async fn run() -> Result<(), Box<dyn std::error::Error>> {
let db = new_writeable_campaign_db().await?;
let engine = BoxOpeningEngine::new(db, Arc::new(InMemoryBridge::new()));

let wallet: WalletAddress = "0x00000000000000000000000000000000000000aa".parse()?;
engine.sign_in(&wallet).await?;
engine.reconcile_boxes(&wallet).await?;
let opened = engine.open_box(&wallet, None).await?;
println!("won {}", opened.reward.name);
# Ok(())
# }
```
*/

pub mod accounts;
pub mod api;
pub mod campaign_database;
mod config;
mod draw_source;
mod engine;
mod engine_error;
pub mod inventory;
mod opened_box_ext;
mod pagination;
pub mod reward_records;
pub mod reward_table;
mod task_definition_ext;
pub mod task_ledger;
mod wallet;

pub use accounts::{BoxStatus, BoxSync};
pub use campaign_database::{
    backup_campaign_db, new_writeable_campaign_db, open_campaign_db, open_readonly_campaign_db,
};
pub use config::{EngineConfig, SupplyPolicy};
pub use hiibox_csvs::DEFAULT_BOX_TIER;
pub use draw_source::{DrawSource, FixedSource, SeededSource, ThreadRngSource};
pub use engine::{AccountAudit, BoxOpeningEngine, OpenedBox};
pub use engine_error::{EngineError, EngineResult};
pub use inventory::{DistributionAudit, DistributionMismatch, InventorySnapshot};
pub use opened_box_ext::OpenedBoxExt;
pub use pagination::{DEFAULT_PER_PAGE, MAX_PER_PAGE, Page, PageRequest};
pub use reward_table::{
    Rarity, RewardDefinition, RewardKind, RewardOdds, RewardPayload, RewardTable, SimulatedReward,
};
pub use task_definition_ext::TaskDefinitionExt;
pub use task_ledger::{GrantStatus, TaskEvidence, TaskGrant, TaskKind};
pub use wallet::{WalletAddress, WalletAddressError};
