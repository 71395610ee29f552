use hiibox_csvs::{RewardCsvRow, TaskCsvRow};
use hiibox_engine::WalletAddress;
use rand::{Rng as _, SeedableRng as _, rngs::StdRng};
use rust_decimal::dec;

/// Collection checked by the standard NFT task
pub const TEST_NFT_COLLECTION: &str = "0x00000000000000000000000000000000000a9e50";

pub const SOCIAL_TASK_ID: &str = "follow-x";
pub const NFT_TASK_ID: &str = "hold-apes";
pub const ONCHAIN_TASK_ID: &str = "bridge-eth";

/// Keys granted by the standard social task
pub const SOCIAL_TASK_KEYS: u64 = 1;
pub const ONCHAIN_TASK_KEYS: u64 = 2;
/// Cap on keys the standard NFT task can grant
pub const NFT_TASK_MAX_KEYS: u64 = 5;

/// Wallet derived from a label, stable across runs
pub fn deterministic_wallet(label: &str) -> WalletAddress {
    // FNV-1a
    let seed = label.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    let bytes: [u8; 20] = StdRng::seed_from_u64(seed).r#gen();

    format!("0x{}", hex::encode(bytes))
        .parse()
        .unwrap_or_else(|e| panic!("Failed to derive wallet for {label}: {e}"))
}

fn reward_row(name: &str, reward_type: &str, rarity: &str) -> RewardCsvRow {
    RewardCsvRow {
        box_tier: None,
        name: name.to_string(),
        reward_type: reward_type.to_string(),
        rarity: rarity.to_string(),
        weight: None,
        amount: None,
        symbol: None,
        collection: None,
        token_id: None,
        event: None,
    }
}

/// One reward per rarity, default weights (74 / 20 / 5 / 1)
pub fn standard_reward_rows() -> Vec<RewardCsvRow> {
    vec![
        RewardCsvRow {
            amount: Some(dec!(100)),
            ..reward_row("100 Points", "points", "common")
        },
        RewardCsvRow {
            amount: Some(dec!(25)),
            symbol: Some("HII".to_string()),
            ..reward_row("25 HII", "token", "rare")
        },
        RewardCsvRow {
            event: Some("HiiBox Summit".to_string()),
            ..reward_row("Summit Ticket", "ticket", "epic")
        },
        RewardCsvRow {
            collection: Some("HiiBox Genesis".to_string()),
            token_id: Some(1),
            ..reward_row("Genesis Collectible", "collectible", "legendary")
        },
    ]
}

/// Box tier priced by [`GOLD_TIER_KEYS`] in tiered fixtures
pub const GOLD_TIER: &str = "gold";
pub const GOLD_TIER_KEYS: u64 = 3;

/// Rewards only a gold box can draw
pub fn gold_reward_rows() -> Vec<RewardCsvRow> {
    vec![
        RewardCsvRow {
            box_tier: Some(GOLD_TIER.to_string()),
            amount: Some(dec!(500)),
            symbol: Some("HII".to_string()),
            ..reward_row("500 HII", "token", "epic")
        },
        RewardCsvRow {
            box_tier: Some(GOLD_TIER.to_string()),
            collection: Some("HiiBox Genesis".to_string()),
            token_id: Some(2),
            ..reward_row("Gold Genesis Collectible", "collectible", "legendary")
        },
    ]
}

pub fn standard_task_rows() -> Vec<TaskCsvRow> {
    vec![
        TaskCsvRow {
            id: SOCIAL_TASK_ID.to_string(),
            title: "Follow HiiBox on X".to_string(),
            kind: "social".to_string(),
            platform: "x".to_string(),
            reward_keys: SOCIAL_TASK_KEYS,
            collection: None,
            min_balance: None,
            keys_per_nft: None,
            max_keys: None,
        },
        TaskCsvRow {
            id: NFT_TASK_ID.to_string(),
            title: "Hold an Ape".to_string(),
            kind: "nft".to_string(),
            platform: "ethereum".to_string(),
            reward_keys: 1,
            collection: Some(TEST_NFT_COLLECTION.to_string()),
            min_balance: Some(1),
            keys_per_nft: Some(1),
            max_keys: Some(NFT_TASK_MAX_KEYS),
        },
        TaskCsvRow {
            id: ONCHAIN_TASK_ID.to_string(),
            title: "Bridge ETH to HiiBox".to_string(),
            kind: "onchain".to_string(),
            platform: "ethereum".to_string(),
            reward_keys: ONCHAIN_TASK_KEYS,
            collection: None,
            min_balance: None,
            keys_per_nft: None,
            max_keys: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_wallet_is_stable() {
        assert_eq!(deterministic_wallet("alice"), deterministic_wallet("alice"));
        assert_ne!(deterministic_wallet("alice"), deterministic_wallet("bob"));
    }

    #[test]
    fn test_standard_rows_validate() {
        hiibox_csvs::validate_reward_rows(&standard_reward_rows()).unwrap();
        hiibox_csvs::validate_reward_rows(&gold_reward_rows()).unwrap();
        hiibox_csvs::validate_task_rows(&standard_task_rows()).unwrap();
    }
}
