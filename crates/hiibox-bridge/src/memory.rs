use crate::{BridgeError, BridgeResult, OnChainBridge};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct LedgerState {
    boxes: HashMap<String, BTreeSet<u64>>,
    nft_balances: HashMap<(String, String), u64>,
    burned: Vec<(String, u64)>,
    injected_failures: VecDeque<BridgeError>,
    calls: usize,
}

/// Process-local box ledger
///
/// Backs tests and local runs of the CLI. Failures can be injected ahead of
/// time to exercise retry and error-classification paths.
#[derive(Default)]
pub struct InMemoryBridge {
    state: Mutex<LedgerState>,
}

impl InMemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Give `owner` the listed box tokens
    pub fn mint_boxes(&self, owner: &str, token_ids: impl IntoIterator<Item = u64>) {
        let mut state = self.state();
        let owned = state.boxes.entry(owner.to_lowercase()).or_default();
        owned.extend(token_ids);
    }

    /// Move a box token to another owner, as a secondary-market sale would
    pub fn transfer_box(&self, from: &str, to: &str, token_id: u64) -> BridgeResult<()> {
        let mut state = self.state();
        let removed = state
            .boxes
            .get_mut(&from.to_lowercase())
            .is_some_and(|owned| owned.remove(&token_id));
        if !removed {
            return Err(BridgeError::NotTokenOwner {
                owner: from.to_lowercase(),
                token_id,
            });
        }
        state
            .boxes
            .entry(to.to_lowercase())
            .or_default()
            .insert(token_id);
        Ok(())
    }

    pub fn set_nft_balance(&self, owner: &str, collection: &str, balance: u64) {
        self.state()
            .nft_balances
            .insert((owner.to_lowercase(), collection.to_string()), balance);
    }

    /// Make the next `count` calls fail with `error`
    pub fn fail_next(&self, count: usize, error: BridgeError) {
        let mut state = self.state();
        for _ in 0..count {
            state.injected_failures.push_back(error.clone());
        }
    }

    /// Tokens burned so far, in order
    pub fn burned(&self) -> Vec<(String, u64)> {
        self.state().burned.clone()
    }

    /// Total calls received, including injected failures
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    fn begin_call(&self) -> BridgeResult<MutexGuard<'_, LedgerState>> {
        let mut state = self.state();
        state.calls += 1;
        match state.injected_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl OnChainBridge for InMemoryBridge {
    async fn owned_box_ids(&self, owner: &str) -> BridgeResult<Vec<u64>> {
        let state = self.begin_call()?;
        Ok(state
            .boxes
            .get(&owner.to_lowercase())
            .map(|owned| owned.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn nft_balance(&self, owner: &str, collection: &str) -> BridgeResult<u64> {
        let state = self.begin_call()?;
        Ok(state
            .nft_balances
            .get(&(owner.to_lowercase(), collection.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn burn_or_transfer(&self, owner: &str, token_id: u64) -> BridgeResult<String> {
        let mut state = self.begin_call()?;
        let owner = owner.to_lowercase();

        let known = state.boxes.values().any(|owned| owned.contains(&token_id));
        if !known {
            return Err(BridgeError::UnknownToken { token_id });
        }

        let removed = state
            .boxes
            .get_mut(&owner)
            .is_some_and(|owned| owned.remove(&token_id));
        if !removed {
            return Err(BridgeError::NotTokenOwner { owner, token_id });
        }

        state.burned.push((owner, token_id));
        Ok(format!("0x{:064x}", state.burned.len() as u64 * 0x1_0000 + token_id))
    }
}
