/*!
# CSV Schema Definitions

Row types for the reward and task catalogues. These are the contract between
whoever curates the campaign (spreadsheet exports, the `hiibox` CLI) and the
engine's import functions.
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ================================================================================================
// Rewards CSV Schema
// ================================================================================================

/// Expected headers for rewards.csv in exact order
pub const REWARDS_CSV_HEADERS: &[&str] = &[
    "box_tier",
    "name",
    "type",
    "rarity",
    "weight",
    "amount",
    "symbol",
    "collection",
    "token_id",
    "event",
];

/// Tier a reward belongs to when its `box_tier` cell is blank
pub const DEFAULT_BOX_TIER: &str = "standard";

/// Recognised values of the `type` column
pub const REWARD_TYPES: &[&str] = &["token", "collectible", "ticket", "points"];

/// Recognised values of the `rarity` column
pub const RARITIES: &[&str] = &["common", "rare", "epic", "legendary"];

/// Row structure for rewards.csv
///
/// **File**: `rewards.csv`
/// **Purpose**: One reward definition per row, in draw order
/// **Consumers**: `import-rewards` command, engine reward table import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardCsvRow {
    /// Box tier whose draws include this reward (e.g. "bronze", "gold");
    /// blank means [`DEFAULT_BOX_TIER`]
    pub box_tier: Option<String>,

    /// Display name (e.g. "10 APE", "Gold VIP NFT")
    pub name: String,

    /// Reward category: token, collectible, ticket or points
    #[serde(rename = "type")]
    pub reward_type: String,

    /// Display tier: common, rare, epic or legendary
    pub rarity: String,

    /// Relative probability mass; `None` falls back to the rarity default
    pub weight: Option<f64>,

    /// Token or points amount
    pub amount: Option<Decimal>,

    /// Token symbol (token rewards)
    pub symbol: Option<String>,

    /// Collection name or address (collectible rewards)
    pub collection: Option<String>,

    /// Specific token id inside the collection, when pre-minted
    pub token_id: Option<u64>,

    /// Event the ticket admits to (ticket rewards)
    pub event: Option<String>,
}

impl RewardCsvRow {
    pub fn box_tier(&self) -> &str {
        match self.box_tier.as_deref() {
            Some(tier) if !tier.is_empty() => tier,
            _ => DEFAULT_BOX_TIER,
        }
    }
}

// ================================================================================================
// Tasks CSV Schema
// ================================================================================================

/// Expected headers for tasks.csv in exact order
pub const TASKS_CSV_HEADERS: &[&str] = &[
    "id",
    "title",
    "kind",
    "platform",
    "reward_keys",
    "collection",
    "min_balance",
    "keys_per_nft",
    "max_keys",
];

/// Recognised values of the `kind` column
pub const TASK_KINDS: &[&str] = &["social", "nft", "onchain"];

/// Row structure for tasks.csv
///
/// **File**: `tasks.csv`
/// **Purpose**: Task catalogue; each completed task grants keys once
/// **Consumers**: `import-tasks` command, engine task ledger import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCsvRow {
    /// Stable task identifier (e.g. "follow-twitter")
    pub id: String,

    /// Human readable title
    pub title: String,

    /// social, nft or onchain
    pub kind: String,

    /// twitter, discord, telegram, apechain, ...
    pub platform: String,

    /// Flat key award
    pub reward_keys: u64,

    /// NFT collection checked for holding tasks
    pub collection: Option<String>,

    /// Minimum holding required to satisfy the task
    pub min_balance: Option<u64>,

    /// Keys granted per held NFT; absent means the flat award applies
    pub keys_per_nft: Option<u64>,

    /// Upper bound on keys granted by proportional awards
    pub max_keys: Option<u64>,
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_reward_csv_row_empty_optionals() {
        let csv_data = "\
box_tier,name,type,rarity,weight,amount,symbol,collection,token_id,event
,10 APE,token,common,,10,APE,,,
gold,ApeFest Ticket,ticket,legendary,1,,,,,ApeFest Las Vegas
";
        let mut rdr = csv::Reader::from_reader(csv_data.as_bytes());
        let rows: Vec<RewardCsvRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        let row = &rows[0];

        assert_eq!(row.box_tier(), DEFAULT_BOX_TIER);
        assert_eq!(row.name, "10 APE");
        assert_eq!(row.reward_type, "token");
        assert_eq!(row.weight, None);
        assert_eq!(row.amount, Some(Decimal::from_str("10").unwrap()));
        assert_eq!(row.symbol.as_deref(), Some("APE"));
        assert_eq!(row.collection, None);
        assert_eq!(row.token_id, None);

        assert_eq!(rows[1].box_tier(), "gold");
        assert_eq!(rows[1].event.as_deref(), Some("ApeFest Las Vegas"));
    }

    #[test]
    fn test_task_csv_row_nft_columns() {
        let csv_data = "\
id,title,kind,platform,reward_keys,collection,min_balance,keys_per_nft,max_keys
hold-bayc,Hold Bored Ape NFT,nft,apechain,3,bayc,1,2,10
";
        let mut rdr = csv::Reader::from_reader(csv_data.as_bytes());
        let row: TaskCsvRow = rdr.deserialize().next().unwrap().unwrap();

        assert_eq!(row.kind, "nft");
        assert_eq!(row.collection.as_deref(), Some("bayc"));
        assert_eq!(row.min_balance, Some(1));
        assert_eq!(row.keys_per_nft, Some(2));
        assert_eq!(row.max_keys, Some(10));
    }
}
