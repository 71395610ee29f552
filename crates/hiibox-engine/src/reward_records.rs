use chrono::Utc;
use hiibox_entities::opened_boxes;
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ColumnTrait as _, ConnectionTrait, EntityTrait as _,
    PaginatorTrait as _, QueryFilter as _, QueryOrder as _, QuerySelect as _, prelude::Expr,
};

use crate::accounts::{AccountError, from_db, to_db};
use crate::pagination::{Page, PageRequest, fetch_page};
use crate::RewardDefinition;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Opened box record #{0} not found")]
    RecordNotFound(i32),

    #[error("Opened box record #{record_id} already has tx hash {tx_hash}")]
    AlreadyAttached { record_id: i32, tx_hash: String },

    #[error("Invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;

/// Canonical form of a transaction hash: `0x` + 64 lowercase hex digits
pub fn normalize_tx_hash(tx_hash: &str) -> RecordResult<String> {
    let invalid = || RecordError::InvalidTxHash(tx_hash.to_string());
    let digits = tx_hash.trim().strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() != 64 || hex::decode(digits).is_err() {
        return Err(invalid());
    }
    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

/// Persist the record of one successful open
pub async fn insert_record<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    box_token_id: Option<u64>,
    keys_spent: u64,
    reward: &RewardDefinition,
) -> RecordResult<opened_boxes::Model> {
    let record = opened_boxes::ActiveModel {
        user_id: Set(user_id),
        box_token_id: Set(box_token_id.map(to_db).transpose()?),
        box_tier: Set(reward.box_tier.clone()),
        keys_spent: Set(to_db(keys_spent)?),
        reward_type: Set(reward.kind().as_str().to_string()),
        reward_name: Set(reward.name.clone()),
        reward_data: Set(serde_json::to_string(&reward.payload)?),
        reward_tier: Set(reward.rarity.as_str().to_string()),
        opened_at: Set(Utc::now()),
        tx_hash: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(record)
}

pub async fn get_record<C: ConnectionTrait>(
    db: &C,
    record_id: i32,
) -> RecordResult<opened_boxes::Model> {
    opened_boxes::Entity::find_by_id(record_id)
        .one(db)
        .await?
        .ok_or(RecordError::RecordNotFound(record_id))
}

/// Attach the burn transaction hash to a record, once
///
/// Attaching the same hash again succeeds; a different hash fails.
pub async fn attach_tx_hash<C: ConnectionTrait>(
    db: &C,
    record_id: i32,
    tx_hash: &str,
) -> RecordResult<()> {
    let tx_hash = normalize_tx_hash(tx_hash)?;

    let result = opened_boxes::Entity::update_many()
        .col_expr(opened_boxes::Column::TxHash, Expr::value(tx_hash.clone()))
        .filter(opened_boxes::Column::Id.eq(record_id))
        .filter(opened_boxes::Column::TxHash.is_null())
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        return Ok(());
    }

    let record = get_record(db, record_id).await?;
    match record.tx_hash {
        Some(existing) if existing == tx_hash => Ok(()),
        Some(existing) => Err(RecordError::AlreadyAttached {
            record_id,
            tx_hash: existing,
        }),
        None => Err(RecordError::RecordNotFound(record_id)),
    }
}

pub async fn count_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> RecordResult<u64> {
    let count = opened_boxes::Entity::find()
        .filter(opened_boxes::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    Ok(count)
}

/// Keys a user has spent across every recorded open
pub async fn keys_spent_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> RecordResult<u64> {
    let spent = opened_boxes::Entity::find()
        .select_only()
        .column_as(opened_boxes::Column::KeysSpent.sum(), "keys_spent")
        .filter(opened_boxes::Column::UserId.eq(user_id))
        .into_tuple::<Option<i64>>()
        .one(db)
        .await?
        .flatten();
    Ok(spent.map(from_db).unwrap_or(0))
}

/// A user's reward history, newest first
pub async fn list_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    request: PageRequest,
) -> RecordResult<Page<opened_boxes::Model>> {
    let select = opened_boxes::Entity::find()
        .filter(opened_boxes::Column::UserId.eq(user_id))
        .order_by_desc(opened_boxes::Column::OpenedAt)
        .order_by_desc(opened_boxes::Column::Id);

    Ok(fetch_page(db, select, request).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RewardPayload, Rarity, WalletAddress, accounts, new_writeable_campaign_db};

    const HASH_A: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const HASH_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn ticket() -> RewardDefinition {
        RewardDefinition {
            box_tier: "gold".to_string(),
            name: "ApeFest Ticket".to_string(),
            rarity: Rarity::Epic,
            weight: 5.0,
            payload: RewardPayload::Ticket {
                event: "ApeFest".to_string(),
            },
        }
    }

    #[test]
    fn test_normalize_tx_hash() {
        assert_eq!(normalize_tx_hash(HASH_A).unwrap(), HASH_A.to_lowercase());
        assert!(normalize_tx_hash("0x1234").is_err());
        assert!(normalize_tx_hash(&HASH_B[2..]).is_err());
    }

    #[tokio::test]
    async fn test_tx_hash_attaches_once() {
        let db = new_writeable_campaign_db().await.unwrap();
        let address: WalletAddress = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let account = accounts::get_or_create(&db, &address).await.unwrap();

        let record = insert_record(&db, account.id, Some(4), 5, &ticket()).await.unwrap();
        assert_eq!(record.box_token_id, Some(4));
        assert_eq!(record.reward_type, "ticket");
        assert_eq!(record.box_tier, "gold");

        attach_tx_hash(&db, record.id, HASH_A).await.unwrap();
        attach_tx_hash(&db, record.id, HASH_A).await.unwrap();
        assert!(matches!(
            attach_tx_hash(&db, record.id, HASH_B).await,
            Err(RecordError::AlreadyAttached { .. })
        ));
        assert!(matches!(
            attach_tx_hash(&db, record.id + 1, HASH_B).await,
            Err(RecordError::RecordNotFound(_))
        ));

        let stored = get_record(&db, record.id).await.unwrap();
        assert_eq!(stored.tx_hash.as_deref(), Some(HASH_A.to_lowercase().as_str()));
        assert_eq!(count_for_user(&db, account.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_keys_spent_sums_tier_prices() {
        let db = new_writeable_campaign_db().await.unwrap();
        let address: WalletAddress = "0x00000000000000000000000000000000000000bb".parse().unwrap();
        let account = accounts::get_or_create(&db, &address).await.unwrap();
        assert_eq!(keys_spent_for_user(&db, account.id).await.unwrap(), 0);

        insert_record(&db, account.id, None, 5, &ticket()).await.unwrap();
        insert_record(&db, account.id, None, 1, &ticket()).await.unwrap();
        assert_eq!(keys_spent_for_user(&db, account.id).await.unwrap(), 6);
    }
}
