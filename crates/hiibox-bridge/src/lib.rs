/*!
# HiiBox On-Chain Bridge

The reward engine's view of the box contract: which box tokens a wallet holds,
how many NFTs of a collection it holds, and burning a box token once it has
been opened.

## Quick Start

```rust
use hiibox_bridge::{InMemoryBridge, OnChainBridge, RetryingBridge};

# async fn example() -> Result<(), Box<dyn std::error::Error>> {
let ledger = InMemoryBridge::new();
ledger.mint_boxes("0x00000000000000000000000000000000000000aa", [1, 2, 3]);

// Transient failures (timeouts, node outages) are retried with backoff
let bridge = RetryingBridge::new(ledger);
let owned = bridge
    .owned_box_ids("0x00000000000000000000000000000000000000aa")
    .await?;
assert_eq!(owned, vec![1, 2, 3]);
# Ok(())
# }
```

## Custom Configuration

```rust
# use hiibox_bridge::{BridgeConfig, InMemoryBridge, RetryingBridge};
let config = BridgeConfig {
    max_retries: 8,
    ..Default::default()
};
let bridge = RetryingBridge::with_config(InMemoryBridge::new(), config);
```
*/

mod bridge;
mod config;
mod error;
mod memory;

pub use bridge::{OnChainBridge, RetryingBridge};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use memory::InMemoryBridge;
