/*!
# HiiBox CSV Schema Definitions

This crate provides the **authoritative CSV schemas** for the two admin-maintained
catalogues the reward engine consumes:

- **`rewards.csv`** → the reward table (draw order, weights, payloads)
- **`tasks.csv`** → the task catalogue (social, NFT-holding and on-chain tasks)

## Reward CSV (`rewards.csv`)
- `box_tier`: box tier drawing this reward (`bronze`, `gold`, ...); empty means
  `standard`
- `name`: display name, unique
- `type`: `token` | `collectible` | `ticket` | `points`
- `rarity`: `common` | `rare` | `epic` | `legendary`
- `weight`: relative probability mass; empty means "use the rarity default"
- `amount`, `symbol`, `collection`, `token_id`, `event`: payload columns, which
  ones are required depends on `type`

Row order is draw order within each tier.

## Tasks CSV (`tasks.csv`)
- `id`, `title`, `kind` (`social` | `nft` | `onchain`), `platform`, `reward_keys`
- `collection`, `min_balance`, `keys_per_nft`, `max_keys`: NFT tasks only

## Usage

```rust
use hiibox_csvs::{read_rewards_csv, read_tasks_csv, CsvResult};

fn example() -> CsvResult<()> {
    let rewards = read_rewards_csv("rewards.csv")?;
    let tasks = read_tasks_csv("tasks.csv")?;
    println!("{} rewards, {} tasks", rewards.len(), tasks.len());
    Ok(())
}
```
*/

pub mod errors;
pub mod schemas;
pub mod validation;

pub use errors::{CsvError, CsvResult};
pub use schemas::{
    RewardCsvRow, TaskCsvRow, DEFAULT_BOX_TIER, REWARDS_CSV_HEADERS, TASKS_CSV_HEADERS,
};
pub use validation::{
    read_rewards_csv, read_tasks_csv, validate_reward_rows, validate_task_rows, write_rewards_csv,
    write_tasks_csv,
};
