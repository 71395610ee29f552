use hiibox_entities::task_definitions;

use crate::accounts::from_db;
use crate::task_ledger::{TaskEvidence, TaskKind};

pub trait TaskDefinitionExt {
    fn kind(&self) -> TaskKind;
    fn reward_keys(&self) -> u64;
    fn min_balance(&self) -> u64;

    /// Keys the evidence entitles the holder to in total, or `None` when the
    /// task is not satisfied
    ///
    /// NFT tasks are satisfied only by a reported balance; oracle verdicts
    /// satisfy only social and on-chain tasks.
    fn entitlement(&self, evidence: TaskEvidence) -> Option<u64>;
}

impl TaskDefinitionExt for task_definitions::Model {
    fn kind(&self) -> TaskKind {
        let kind = self.kind.parse::<TaskKind>();
        debug_assert!(kind.is_ok(), "Invalid task kind {}", self.kind);
        kind.unwrap_or(TaskKind::Social)
    }

    fn reward_keys(&self) -> u64 {
        from_db(self.reward_keys)
    }

    fn min_balance(&self) -> u64 {
        self.min_balance.map(from_db).unwrap_or(1).max(1)
    }

    fn entitlement(&self, evidence: TaskEvidence) -> Option<u64> {
        let balance = match (self.kind(), evidence) {
            (TaskKind::Nft, TaskEvidence::NftBalance(balance)) => balance,
            (TaskKind::Nft, TaskEvidence::Verified(_)) => return None,
            (_, TaskEvidence::Verified(true)) => return Some(self.reward_keys()),
            (_, TaskEvidence::Verified(false) | TaskEvidence::NftBalance(_)) => return None,
        };

        if balance < self.min_balance() {
            return None;
        }
        match self.keys_per_nft.map(from_db) {
            Some(keys_per_nft) => {
                let keys = balance.saturating_mul(keys_per_nft);
                Some(match self.max_keys.map(from_db) {
                    Some(max_keys) => keys.min(max_keys),
                    None => keys,
                })
            }
            None => Some(self.reward_keys()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nft_task(keys_per_nft: Option<i64>, max_keys: Option<i64>) -> task_definitions::Model {
        task_definitions::Model {
            id: "hold-bayc".to_string(),
            title: "Hold a Bored Ape".to_string(),
            kind: "nft".to_string(),
            platform: "apechain".to_string(),
            reward_keys: 3,
            collection: Some("bayc".to_string()),
            min_balance: Some(2),
            keys_per_nft,
            max_keys,
        }
    }

    #[test]
    fn test_flat_nft_entitlement() {
        let task = nft_task(None, None);
        assert_eq!(task.kind(), TaskKind::Nft);
        assert_eq!(task.entitlement(TaskEvidence::NftBalance(1)), None);
        assert_eq!(task.entitlement(TaskEvidence::NftBalance(2)), Some(3));
        assert_eq!(task.entitlement(TaskEvidence::NftBalance(50)), Some(3));
    }

    #[test]
    fn test_proportional_entitlement_is_capped() {
        let task = nft_task(Some(2), Some(10));
        assert_eq!(task.entitlement(TaskEvidence::NftBalance(3)), Some(6));
        assert_eq!(task.entitlement(TaskEvidence::NftBalance(8)), Some(10));
        assert_eq!(task.entitlement(TaskEvidence::NftBalance(u64::MAX)), Some(10));
    }

    #[test]
    fn test_verified_evidence() {
        let social = task_definitions::Model {
            id: "follow-x".to_string(),
            kind: "social".to_string(),
            platform: "twitter".to_string(),
            collection: None,
            min_balance: None,
            ..nft_task(None, None)
        };
        assert_eq!(social.entitlement(TaskEvidence::Verified(true)), Some(3));
        assert_eq!(social.entitlement(TaskEvidence::Verified(false)), None);
        assert_eq!(social.entitlement(TaskEvidence::NftBalance(10)), None);
    }

    #[test]
    fn test_oracle_verdict_never_satisfies_nft_task() {
        let task = nft_task(None, None);
        assert_eq!(task.entitlement(TaskEvidence::Verified(true)), None);
        assert_eq!(task.entitlement(TaskEvidence::Verified(false)), None);
    }
}
