use backoff::ExponentialBackoff;
use hiibox_bridge::{BridgeConfig, InMemoryBridge, RetryingBridge};
use hiibox_engine::{
    BoxOpeningEngine, BoxSync, EngineConfig, InventorySnapshot, SeededSource, WalletAddress,
    accounts, new_writeable_campaign_db,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::{deterministic_wallet, standard_reward_rows, standard_task_rows};

/// Bridge retries allowed before a transient failure surfaces
pub const TEST_BRIDGE_RETRIES: usize = 2;

/// Seed behind every fixture's draws
pub const TEST_DRAW_SEED: u64 = 0x4842;

/// Engine configuration with millisecond-scale storage backoff
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        storage_retry: ExponentialBackoff {
            initial_interval: Duration::from_millis(2),
            max_interval: Duration::from_millis(50),
            max_elapsed_time: Some(Duration::from_secs(30)),
            multiplier: 1.5,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A fresh campaign database, an in-memory chain and an engine wired to both
pub struct TestFixture {
    pub engine: BoxOpeningEngine,
    bridge: Arc<RetryingBridge<InMemoryBridge>>,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(test_engine_config()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let db = new_writeable_campaign_db()
            .await
            .unwrap_or_else(|e| panic!("Failed to create campaign database: {e}"));

        let bridge = Arc::new(RetryingBridge::with_config(
            InMemoryBridge::new(),
            BridgeConfig::fast(TEST_BRIDGE_RETRIES),
        ));

        let engine = BoxOpeningEngine::with_config(db, bridge.clone(), config)
            .with_draw_source(Arc::new(SeededSource::new(TEST_DRAW_SEED)));

        Self { engine, bridge }
    }

    /// The chain behind the engine's retrying bridge
    pub fn ledger(&self) -> &InMemoryBridge {
        self.bridge.inner()
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.engine.db()
    }

    /// Import the standard reward and task catalogues and open `total_boxes` of supply
    pub async fn setup_campaign(&self, total_boxes: u64) {
        self.engine
            .import_rewards(&standard_reward_rows())
            .await
            .unwrap_or_else(|e| panic!("Failed to import rewards: {e}"));
        self.engine
            .import_tasks(&standard_task_rows())
            .await
            .unwrap_or_else(|e| panic!("Failed to import tasks: {e}"));
        self.engine
            .initialize_inventory(total_boxes)
            .await
            .unwrap_or_else(|e| panic!("Failed to initialize inventory: {e}"));
    }

    /// Sign in the wallet derived from `label`
    pub async fn sign_in(&self, label: &str) -> WalletAddress {
        let wallet = deterministic_wallet(label);
        self.engine
            .sign_in(&wallet)
            .await
            .unwrap_or_else(|e| panic!("Failed to sign in {label}: {e}"));
        wallet
    }

    /// Credit keys directly, bypassing the task ledger
    pub async fn credit_keys(&self, wallet: &WalletAddress, keys: u64) {
        let account = self.account(wallet).await;
        accounts::credit(self.db(), account.id, keys)
            .await
            .unwrap_or_else(|e| panic!("Failed to credit {keys} keys to {wallet}: {e}"));
    }

    /// Mint box tokens on the chain and mirror them into the ledger
    pub async fn mint_boxes(
        &self,
        wallet: &WalletAddress,
        token_ids: impl IntoIterator<Item = u64>,
    ) -> BoxSync {
        self.ledger().mint_boxes(wallet.as_str(), token_ids);
        self.engine
            .reconcile_boxes(wallet)
            .await
            .unwrap_or_else(|e| panic!("Failed to reconcile boxes for {wallet}: {e}"))
    }

    /// A signed-in wallet holding `keys` keys and the given box tokens
    pub async fn funded_user(
        &self,
        label: &str,
        keys: u64,
        token_ids: impl IntoIterator<Item = u64>,
    ) -> WalletAddress {
        let wallet = self.sign_in(label).await;
        self.credit_keys(&wallet, keys).await;
        self.mint_boxes(&wallet, token_ids).await;
        wallet
    }

    pub async fn account(&self, wallet: &WalletAddress) -> hiibox_entities::users::Model {
        self.engine
            .account(wallet)
            .await
            .unwrap_or_else(|e| panic!("Failed to load account {wallet}: {e}"))
    }

    pub async fn stats(&self) -> InventorySnapshot {
        self.engine
            .stats()
            .await
            .unwrap_or_else(|e| panic!("Failed to read campaign stats: {e}"))
    }
}
