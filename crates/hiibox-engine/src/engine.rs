/*!
# Box-Opening Engine

Ties accounts, the task ledger, the reward table and the campaign inventory
together behind the operations a web layer exposes.

An open targets one box tier, which sets its key price and the rewards it can
draw. It moves through `validating → reserving → drawing → recording → complete`
(or `failed` from any of them):

1. **Validating** runs without holding any lock: the tier must be priced, the
   account must exist, a named box must be held on-chain, and the balances must
   cover the open.
2. **Reserving** through **Recording** run in one database transaction inside a
   spawned task. Dropping the caller's future cannot cancel that work halfway;
   any failure rolls the whole transaction back, so a user is never charged
   without a record and a record never exists without a charge.

Transactions that lose a sqlite lock race are retried as a whole.
*/

use backoff::future::retry;
use hiibox_bridge::OnChainBridge;
use hiibox_csvs::{RewardCsvRow, TaskCsvRow};
use hiibox_entities::{opened_boxes, owned_boxes, task_records, users};
use sea_orm::{DatabaseConnection, TransactionTrait as _};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::accounts::{self, BoxSync, from_db};
use crate::inventory::{self, DistributionAudit, InventoryError, InventorySnapshot};
use crate::pagination::{Page, PageRequest};
use crate::reward_records;
use crate::reward_table::{self, RewardDefinition, RewardTable};
use crate::task_ledger::{self, TaskEvidence, TaskGrant, TaskKind};
use crate::{
    DEFAULT_BOX_TIER, DrawSource, EngineConfig, EngineError, EngineResult, SupplyPolicy,
    TaskDefinitionExt as _, ThreadRngSource, WalletAddress,
};

/// Result of a successful open
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedBox {
    pub record: opened_boxes::Model,
    pub reward: RewardDefinition,
    pub account: users::Model,
}

/// Event-log reconstruction of an account's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountAudit {
    pub wallet_address: String,
    pub key_count: u64,
    pub boxes_opened: u64,
    pub opened_records: u64,
    pub keys_credited: u64,
    pub keys_spent: u64,
}

impl AccountAudit {
    /// `boxes_opened` matches the number of reward records
    pub fn opens_consistent(&self) -> bool {
        self.boxes_opened == self.opened_records
    }

    /// Credited keys minus spent keys equals the current balance
    pub fn keys_consistent(&self) -> bool {
        self.keys_credited
            .checked_sub(self.keys_spent)
            .is_some_and(|expected| expected == self.key_count)
    }
}

#[derive(Clone)]
pub struct BoxOpeningEngine {
    db: DatabaseConnection,
    bridge: Arc<dyn OnChainBridge>,
    source: Arc<dyn DrawSource>,
    config: EngineConfig,
}

impl BoxOpeningEngine {
    /// Create a new engine with default configuration
    pub fn new(db: DatabaseConnection, bridge: Arc<dyn OnChainBridge>) -> Self {
        Self::with_config(db, bridge, EngineConfig::default())
    }

    /// Create a new engine with custom configuration
    pub fn with_config(
        db: DatabaseConnection,
        bridge: Arc<dyn OnChainBridge>,
        config: EngineConfig,
    ) -> Self {
        Self {
            db,
            bridge,
            source: Arc::new(ThreadRngSource),
            config,
        }
    }

    /// Replace the random source behind every draw
    pub fn with_draw_source(mut self, source: Arc<dyn DrawSource>) -> Self {
        self.source = source;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn with_storage_retry<T, F, Fut>(&self, operation: &'static str, call: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        retry_storage(&self.config, operation, call).await
    }

    async fn require_account(&self, address: &WalletAddress) -> EngineResult<users::Model> {
        accounts::find(&self.db, address)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(address.to_string()))
    }

    // ============================================================================================
    // Accounts
    // ============================================================================================

    /// Fetch or create the account of an authenticated wallet
    pub async fn sign_in(&self, address: &WalletAddress) -> EngineResult<users::Model> {
        let db = &self.db;
        self.with_storage_retry("sign_in", || async move {
            Ok(accounts::get_or_create(db, address).await?)
        })
        .await
    }

    pub async fn account(&self, address: &WalletAddress) -> EngineResult<users::Model> {
        self.require_account(address).await
    }

    /// Mirror the wallet's on-chain box tokens into the local ledger
    pub async fn reconcile_boxes(&self, address: &WalletAddress) -> EngineResult<BoxSync> {
        let account = self.require_account(address).await?;
        let token_ids = self.bridge.owned_box_ids(address.as_str()).await?;

        let (db, user_id, token_ids) = (&self.db, account.id, token_ids.as_slice());
        let sync = self
            .with_storage_retry("reconcile_boxes", || async move {
                let txn = db.begin().await?;
                let sync = accounts::sync_owned_boxes(&txn, user_id, token_ids).await?;
                txn.commit().await?;
                Ok(sync)
            })
            .await?;

        info!(
            "Reconciled {}: {} owned, {} added, {} released",
            address,
            sync.boxes_owned,
            sync.added.len(),
            sync.released.len()
        );
        Ok(sync)
    }

    pub async fn owned_boxes(
        &self,
        address: &WalletAddress,
        request: PageRequest,
    ) -> EngineResult<Page<owned_boxes::Model>> {
        let account = self.require_account(address).await?;
        Ok(accounts::list_owned_boxes(&self.db, account.id, request).await?)
    }

    pub async fn opened_boxes(
        &self,
        address: &WalletAddress,
        request: PageRequest,
    ) -> EngineResult<Page<opened_boxes::Model>> {
        let account = self.require_account(address).await?;
        Ok(reward_records::list_for_user(&self.db, account.id, request).await?)
    }

    /// Rebuild the account's counters from its task and reward records
    pub async fn audit_account(&self, address: &WalletAddress) -> EngineResult<AccountAudit> {
        let account = self.require_account(address).await?;
        let opened_records = reward_records::count_for_user(&self.db, account.id).await?;
        let keys_spent = reward_records::keys_spent_for_user(&self.db, account.id).await?;
        let keys_credited = task_ledger::keys_credited(&self.db, account.id).await?;

        let audit = AccountAudit {
            wallet_address: account.wallet_address,
            key_count: from_db(account.key_count),
            boxes_opened: from_db(account.boxes_opened),
            opened_records,
            keys_credited,
            keys_spent,
        };

        if !audit.opens_consistent() {
            error!(
                "Account {} counts {} opens but has {} reward records",
                address, audit.boxes_opened, audit.opened_records
            );
        }
        Ok(audit)
    }

    // ============================================================================================
    // Tasks
    // ============================================================================================

    /// Record a social or on-chain task the verification oracle has ruled on
    ///
    /// NFT holding tasks are refused here; they are granted from the bridge's
    /// balance through [`verify_nft_task`](Self::verify_nft_task).
    pub async fn submit_task(
        &self,
        address: &WalletAddress,
        task_id: &str,
        verified: bool,
    ) -> EngineResult<TaskGrant> {
        let account = self.require_account(address).await?;
        let task = task_ledger::find_task(&self.db, task_id).await?;
        if task.kind() == TaskKind::Nft {
            warn!("{} submitted NFT task {} for oracle verification", address, task_id);
            return Err(task_ledger::LedgerError::HoldingsRequired(task_id.to_string()).into());
        }

        let (db, user_id) = (&self.db, account.id);
        self.with_storage_retry("submit_task", || async move {
            Ok(task_ledger::record_task(
                db,
                user_id,
                task_id,
                TaskEvidence::Verified(verified),
            )
            .await?)
        })
        .await
    }

    /// Check the wallet's holdings for an NFT task and grant what they earn
    pub async fn verify_nft_task(
        &self,
        address: &WalletAddress,
        task_id: &str,
    ) -> EngineResult<TaskGrant> {
        let account = self.require_account(address).await?;
        let task = task_ledger::find_task(&self.db, task_id).await?;

        let collection = match (task.kind(), task.collection.as_deref()) {
            (TaskKind::Nft, Some(collection)) => collection,
            _ => return Err(task_ledger::LedgerError::NotNftTask(task_id.to_string()).into()),
        };

        let balance = self
            .bridge
            .nft_balance(address.as_str(), collection)
            .await?;
        debug!("{} holds {} of {}", address, balance, collection);

        let (db, user_id) = (&self.db, account.id);
        self.with_storage_retry("verify_nft_task", || async move {
            Ok(task_ledger::record_task(
                db,
                user_id,
                task_id,
                TaskEvidence::NftBalance(balance),
            )
            .await?)
        })
        .await
    }

    pub async fn completed_tasks(
        &self,
        address: &WalletAddress,
    ) -> EngineResult<Vec<task_records::Model>> {
        let account = self.require_account(address).await?;
        Ok(task_ledger::completed_tasks(&self.db, account.id).await?)
    }

    // ============================================================================================
    // Opening
    // ============================================================================================

    /// Spend keys (and a box) for one reward from the default tier
    pub async fn open_box(
        &self,
        address: &WalletAddress,
        box_id: Option<u64>,
    ) -> EngineResult<OpenedBox> {
        self.open_tier_box(address, DEFAULT_BOX_TIER, box_id).await
    }

    /// Spend a tier's key price (and a box) for one reward from that tier
    pub async fn open_tier_box(
        &self,
        address: &WalletAddress,
        box_tier: &str,
        box_id: Option<u64>,
    ) -> EngineResult<OpenedBox> {
        debug!(user = %address, box_tier, box_id = ?box_id, state = "validating", "open box");

        let result = self.validate_and_open(address, box_tier, box_id).await;
        match &result {
            Ok(opened) => info!(
                user = %address,
                box_tier,
                box_id = ?box_id,
                record_id = opened.record.id,
                state = "complete",
                "Opened box: {} ({})",
                opened.reward.name,
                opened.reward.rarity
            ),
            Err(e) => debug!(
                user = %address,
                box_tier,
                box_id = ?box_id,
                state = "failed",
                "open box: {}",
                e
            ),
        }
        result
    }

    async fn validate_and_open(
        &self,
        address: &WalletAddress,
        box_tier: &str,
        box_id: Option<u64>,
    ) -> EngineResult<OpenedBox> {
        let (keys, boxes) = self
            .config
            .open_cost(box_tier, box_id)
            .ok_or_else(|| EngineError::UnknownBoxTier(box_tier.to_string()))?;
        let account = self.require_account(address).await?;

        if let Some(token_id) = box_id {
            if self.config.verify_on_chain {
                let owned = self.bridge.owned_box_ids(address.as_str()).await?;
                if !owned.contains(&token_id) {
                    return Err(EngineError::NotOwner { token_id });
                }
            }
        }

        let key_count = from_db(account.key_count);
        if key_count < keys {
            return Err(EngineError::InsufficientKeys {
                required: keys,
                available: key_count,
            });
        }
        let boxes_owned = from_db(account.boxes_owned);
        if boxes_owned < boxes {
            return Err(EngineError::InsufficientBoxes {
                required: boxes,
                available: boxes_owned,
            });
        }

        // Detached so a dropped request cannot interrupt the transaction
        let db = self.db.clone();
        let source = Arc::clone(&self.source);
        let config = self.config.clone();
        let box_tier = box_tier.to_string();
        let user_id = account.id;

        let commit = tokio::spawn(async move {
            let (db, source, config) = (&db, source.as_ref(), &config);
            let box_tier = box_tier.as_str();
            let cost = (keys, boxes);
            retry_storage(config, "open_box", move || {
                open_in_transaction(db, source, config, user_id, box_tier, cost, box_id)
            })
            .await
        });

        commit
            .await
            .map_err(|e| EngineError::Storage(format!("open task failed: {e}")))?
    }

    // ============================================================================================
    // Reward records
    // ============================================================================================

    pub async fn attach_tx_hash(&self, record_id: i32, tx_hash: &str) -> EngineResult<()> {
        let db = &self.db;
        self.with_storage_retry("attach_tx_hash", || async move {
            Ok(reward_records::attach_tx_hash(db, record_id, tx_hash).await?)
        })
        .await?;
        info!("Attached tx {} to opened box #{}", tx_hash, record_id);
        Ok(())
    }

    /// Burn the box token behind a record and attach the burn transaction
    pub async fn burn_and_attach(&self, record_id: i32) -> EngineResult<String> {
        let record = reward_records::get_record(&self.db, record_id).await?;
        if let Some(tx_hash) = record.tx_hash {
            return Ok(tx_hash);
        }

        let token_id = record.box_token_id.map(from_db).ok_or_else(|| {
            EngineError::InvalidRequest(format!("opened box #{record_id} has no box token"))
        })?;
        let account = accounts::get(&self.db, record.user_id).await?;

        let tx_hash = self
            .bridge
            .burn_or_transfer(&account.wallet_address, token_id)
            .await?;
        self.attach_tx_hash(record_id, &tx_hash).await?;
        Ok(tx_hash)
    }

    /// Burn in the background; failures are logged and never reach the open
    pub fn spawn_burn(&self, record_id: i32) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.burn_and_attach(record_id).await {
                warn!("Burn for opened box #{} failed: {}", record_id, e);
            }
        })
    }

    // ============================================================================================
    // Campaign
    // ============================================================================================

    pub async fn stats(&self) -> EngineResult<InventorySnapshot> {
        Ok(inventory::snapshot(&self.db).await?)
    }

    pub async fn initialize_inventory(&self, total_boxes: u64) -> EngineResult<InventorySnapshot> {
        Ok(inventory::initialize(&self.db, total_boxes).await?)
    }

    pub async fn add_supply(&self, boxes: u64) -> EngineResult<InventorySnapshot> {
        inventory::add_supply(&self.db, boxes).await?;
        self.stats().await
    }

    pub async fn audit_distribution(&self) -> EngineResult<DistributionAudit> {
        Ok(inventory::audit_distribution(&self.db).await?)
    }

    pub async fn reward_table(&self) -> EngineResult<RewardTable> {
        Ok(RewardTable::load(&self.db).await?)
    }

    pub async fn import_rewards(&self, rows: &[RewardCsvRow]) -> EngineResult<usize> {
        let table = RewardTable::from_csv_rows(rows)?;
        Ok(reward_table::import_reward_table(&self.db, &table).await?)
    }

    pub async fn import_tasks(&self, rows: &[TaskCsvRow]) -> EngineResult<usize> {
        Ok(task_ledger::import_task_definitions(&self.db, rows).await?)
    }
}

async fn retry_storage<T, F, Fut>(
    config: &EngineConfig,
    operation: &'static str,
    mut call: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    retry(config.storage_retry.clone(), || {
        let fut = call();
        async move {
            fut.await.map_err(|e| {
                if matches!(e, EngineError::StorageBusy(_)) {
                    warn!("{} hit storage contention, retrying: {}", operation, e);
                    backoff::Error::Transient {
                        err: e,
                        retry_after: None,
                    }
                } else {
                    backoff::Error::Permanent(e)
                }
            })
        }
    })
    .await
}

/// Reserve, draw and record one open atomically
async fn open_in_transaction(
    db: &DatabaseConnection,
    source: &dyn DrawSource,
    config: &EngineConfig,
    user_id: i32,
    box_tier: &str,
    (keys, boxes): (u64, u64),
    box_id: Option<u64>,
) -> EngineResult<OpenedBox> {
    let txn = db.begin().await?;

    debug!(user_id, box_id = ?box_id, state = "reserving", "open box");
    accounts::reserve(&txn, user_id, keys, boxes).await?;
    let box_token_id = match box_id {
        Some(token_id) => {
            accounts::consume_box(&txn, user_id, token_id).await?;
            Some(token_id)
        }
        None if boxes > 0 => Some(accounts::consume_next_box(&txn, user_id).await?),
        None => None,
    };

    debug!(user_id, box_id = ?box_token_id, state = "drawing", "open box");
    let table = match RewardTable::load_tier(&txn, box_tier).await {
        Ok(table) => table,
        Err(e) => {
            let err = EngineError::from(e);
            if matches!(err, EngineError::InvalidRewardTable(_)) {
                error!(
                    "Reward table for tier {} unusable, undoing reservation for user #{}: {}",
                    box_tier, user_id, err
                );
            }
            txn.rollback().await?;
            return Err(err);
        }
    };
    let reward = table.draw(source).clone();

    debug!(user_id, box_id = ?box_token_id, state = "recording", reward = %reward.name, "open box");
    let record =
        reward_records::insert_record(&txn, user_id, box_token_id, keys, &reward).await?;

    match inventory::record_open(&txn, reward.kind()).await {
        Ok(()) => {}
        Err(InventoryError::SupplyExhausted | InventoryError::NotInitialized)
            if config.supply_policy == SupplyPolicy::BestEffort =>
        {
            warn!(
                "Campaign supply exhausted; opening for user #{} anyway (best effort)",
                user_id
            );
            inventory::record_distribution(&txn, reward.kind()).await?;
        }
        Err(e) => {
            txn.rollback().await?;
            return Err(e.into());
        }
    }

    let account = accounts::get(&txn, user_id).await?;
    txn.commit().await?;

    Ok(OpenedBox {
        record,
        reward,
        account,
    })
}
