use hiibox_engine::{InventorySnapshot, WalletAddress, reward_records};
use std::collections::HashMap;

use crate::TestFixture;

/// Counters of one account, plus the reward records behind them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountState {
    pub key_count: i64,
    pub boxes_owned: i64,
    pub boxes_opened: i64,
    pub opened_records: u64,
}

/// Campaign state for before/after comparisons
///
/// Captures the inventory and distribution tally, and optionally the counters
/// of tracked accounts, so a test can assert exactly what an operation changed.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignSnapshot {
    pub inventory: InventorySnapshot,
    pub tracked_accounts: HashMap<WalletAddress, AccountState>,
}

impl CampaignSnapshot {
    pub async fn capture_all(test: &TestFixture) -> Self {
        Self {
            inventory: test.stats().await,
            tracked_accounts: HashMap::new(),
        }
    }

    pub async fn capture_with_accounts(test: &TestFixture, wallets: &[&WalletAddress]) -> Self {
        let mut snapshot = Self::capture_all(test).await;

        for wallet in wallets {
            let account = test.account(wallet).await;
            let opened_records = reward_records::count_for_user(test.db(), account.id)
                .await
                .unwrap_or_else(|e| panic!("Failed to count records for {wallet}: {e}"));

            snapshot.tracked_accounts.insert(
                (*wallet).clone(),
                AccountState {
                    key_count: account.key_count,
                    boxes_owned: account.boxes_owned,
                    boxes_opened: account.boxes_opened,
                    opened_records,
                },
            );
        }

        snapshot
    }

    pub fn account(&self, wallet: &WalletAddress) -> AccountState {
        self.tracked_accounts
            .get(wallet)
            .copied()
            .unwrap_or_else(|| panic!("{wallet} was not tracked"))
    }

    /// Total rewards tallied across every type
    pub fn total_distributed(&self) -> u64 {
        self.inventory.reward_distribution.values().sum()
    }

    /// Assert the listed changes happened between `self` and `other`
    pub fn assert_changes(&self, other: &Self, expected_changes: &[StateChange]) {
        for change in expected_changes {
            match change {
                StateChange::Keys { wallet, delta } => {
                    let actual = other.account(wallet).key_count - self.account(wallet).key_count;
                    assert_eq!(actual, *delta, "Key delta mismatch for {wallet}");
                }
                StateChange::BoxesOwned { wallet, delta } => {
                    let actual =
                        other.account(wallet).boxes_owned - self.account(wallet).boxes_owned;
                    assert_eq!(actual, *delta, "Owned box delta mismatch for {wallet}");
                }
                StateChange::Opened { wallet, delta } => {
                    let before = self.account(wallet);
                    let after = other.account(wallet);
                    assert_eq!(
                        after.boxes_opened - before.boxes_opened,
                        *delta,
                        "Opened counter delta mismatch for {wallet}"
                    );
                    assert_eq!(
                        after.opened_records as i64 - before.opened_records as i64,
                        *delta,
                        "Reward record delta mismatch for {wallet}"
                    );
                }
                StateChange::AvailableSupply { delta } => {
                    let actual = other.inventory.available_boxes as i64
                        - self.inventory.available_boxes as i64;
                    assert_eq!(actual, *delta, "Available supply delta mismatch");
                }
                StateChange::Distributed { delta } => {
                    let actual =
                        other.total_distributed() as i64 - self.total_distributed() as i64;
                    assert_eq!(actual, *delta, "Distribution tally delta mismatch");
                }
            }
        }
    }
}

/// Expected state changes for surgical verification
#[derive(Debug, Clone)]
pub enum StateChange {
    Keys { wallet: WalletAddress, delta: i64 },
    BoxesOwned { wallet: WalletAddress, delta: i64 },
    Opened { wallet: WalletAddress, delta: i64 },
    AvailableSupply { delta: i64 },
    Distributed { delta: i64 },
}
