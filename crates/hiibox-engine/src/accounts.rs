/*!
# Key & Box Accounts

Per-wallet counters (`key_count`, `boxes_owned`, `boxes_opened`) and the local
mirror of on-chain box tokens.

Every mutation is a single conditional `UPDATE`, so two callers racing on the
same account cannot both spend the same key or box: whichever statement runs
second sees the decremented row and matches nothing.
*/

use chrono::Utc;
use hiibox_entities::{owned_boxes, users};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ColumnTrait as _, ConnectionTrait, EntityTrait as _,
    PaginatorTrait as _, QueryFilter as _, QueryOrder as _, prelude::Expr, sea_query::OnConflict,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info};

use crate::pagination::{Page, PageRequest, fetch_page};
use crate::WalletAddress;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient keys: need {required}, have {available}")]
    InsufficientKeys { required: u64, available: u64 },

    #[error("Insufficient boxes: need {required}, have {available}")]
    InsufficientBoxes { required: u64, available: u64 },

    #[error("Box {token_id} is not owned by this account")]
    NotOwner { token_id: u64 },

    #[error("Amount out of range: {0}")]
    AmountOutOfRange(u64),

    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),
}

pub type AccountResult<T> = std::result::Result<T, AccountError>;

/// Lifecycle of a mirrored box token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxStatus {
    /// Held by the account and available to open
    Owned,
    /// Consumed by an open; the on-chain burn may still be pending
    Opened,
    /// No longer reported by the chain for this account
    Released,
}

impl BoxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BoxStatus::Owned => "owned",
            BoxStatus::Opened => "opened",
            BoxStatus::Released => "released",
        }
    }
}

impl fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reconciling an account against the chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoxSync {
    pub added: Vec<u64>,
    pub released: Vec<u64>,
    pub boxes_owned: u64,
}

pub(crate) fn to_db(amount: u64) -> AccountResult<i64> {
    i64::try_from(amount).map_err(|_| AccountError::AmountOutOfRange(amount))
}

pub(crate) fn from_db(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

// ================================================================================================
// Lookup
// ================================================================================================

/// Fetch the account for `address`, creating an empty one on first sight
pub async fn get_or_create<C: ConnectionTrait>(
    db: &C,
    address: &WalletAddress,
) -> AccountResult<users::Model> {
    let now = Utc::now();
    let inserted = users::Entity::insert(users::ActiveModel {
        wallet_address: Set(address.to_string()),
        key_count: Set(0),
        boxes_owned: Set(0),
        boxes_opened: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(users::Column::WalletAddress)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    if inserted > 0 {
        info!("Created account {}", address);
    }

    find(db, address)
        .await?
        .ok_or_else(|| AccountError::AccountNotFound(address.to_string()))
}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    address: &WalletAddress,
) -> AccountResult<Option<users::Model>> {
    let account = users::Entity::find()
        .filter(users::Column::WalletAddress.eq(address.as_str()))
        .one(db)
        .await?;
    Ok(account)
}

pub async fn get<C: ConnectionTrait>(db: &C, user_id: i32) -> AccountResult<users::Model> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AccountError::AccountNotFound(format!("user #{user_id}")))
}

// ================================================================================================
// Counters
// ================================================================================================

/// Add keys to an account
pub async fn credit<C: ConnectionTrait>(db: &C, user_id: i32, keys: u64) -> AccountResult<()> {
    let result = users::Entity::update_many()
        .col_expr(
            users::Column::KeyCount,
            Expr::col(users::Column::KeyCount).add(to_db(keys)?),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(users::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AccountError::AccountNotFound(format!("user #{user_id}")));
    }

    debug!("Credited {} keys to user #{}", keys, user_id);
    Ok(())
}

/// Spend `keys` and `boxes` for one open and count it
///
/// Fails without touching the row when either balance is short. Keys are
/// reported first when both are.
pub async fn reserve<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    keys: u64,
    boxes: u64,
) -> AccountResult<()> {
    let (db_keys, db_boxes) = (to_db(keys)?, to_db(boxes)?);

    let result = users::Entity::update_many()
        .col_expr(
            users::Column::KeyCount,
            Expr::col(users::Column::KeyCount).sub(db_keys),
        )
        .col_expr(
            users::Column::BoxesOwned,
            Expr::col(users::Column::BoxesOwned).sub(db_boxes),
        )
        .col_expr(
            users::Column::BoxesOpened,
            Expr::col(users::Column::BoxesOpened).add(1),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::KeyCount.gte(db_keys))
        .filter(users::Column::BoxesOwned.gte(db_boxes))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        debug!(
            "Reserved {} keys and {} boxes from user #{}",
            keys, boxes, user_id
        );
        return Ok(());
    }

    let account = get(db, user_id).await?;
    let available_keys = from_db(account.key_count);
    if available_keys < keys {
        return Err(AccountError::InsufficientKeys {
            required: keys,
            available: available_keys,
        });
    }
    Err(AccountError::InsufficientBoxes {
        required: boxes,
        available: from_db(account.boxes_owned),
    })
}

/// Undo a committed [`reserve`]
pub async fn refund<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    keys: u64,
    boxes: u64,
) -> AccountResult<()> {
    let result = users::Entity::update_many()
        .col_expr(
            users::Column::KeyCount,
            Expr::col(users::Column::KeyCount).add(to_db(keys)?),
        )
        .col_expr(
            users::Column::BoxesOwned,
            Expr::col(users::Column::BoxesOwned).add(to_db(boxes)?),
        )
        .col_expr(
            users::Column::BoxesOpened,
            Expr::col(users::Column::BoxesOpened).sub(1),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::BoxesOpened.gte(1))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AccountError::AccountNotFound(format!(
            "user #{user_id} with an open to refund"
        )));
    }

    info!(
        "Refunded {} keys and {} boxes to user #{}",
        keys, boxes, user_id
    );
    Ok(())
}

// ================================================================================================
// Owned boxes
// ================================================================================================

async fn recount_owned<C: ConnectionTrait>(db: &C, user_id: i32) -> AccountResult<u64> {
    let owned = owned_boxes::Entity::find()
        .filter(owned_boxes::Column::UserId.eq(user_id))
        .filter(owned_boxes::Column::Status.eq(BoxStatus::Owned.as_str()))
        .count(db)
        .await?;

    users::Entity::update_many()
        .col_expr(users::Column::BoxesOwned, Expr::value(to_db(owned)?))
        .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(users::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    Ok(owned)
}

/// Make the local mirror match the token ids the chain reports for `user_id`
///
/// New tokens become `owned` (taking them over from a previous holder when they
/// changed hands), tokens the chain no longer reports become `released`, and
/// `boxes_owned` is reset to the owned count. Tokens already `opened` here stay
/// opened even while the chain still lists them.
pub async fn sync_owned_boxes<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    token_ids: &[u64],
) -> AccountResult<BoxSync> {
    let now = Utc::now();
    let chain: BTreeSet<u64> = token_ids.iter().copied().collect();
    let chain_ids = chain
        .iter()
        .map(|&token_id| to_db(token_id))
        .collect::<AccountResult<Vec<i64>>>()?;

    let existing: HashMap<i64, owned_boxes::Model> = owned_boxes::Entity::find()
        .filter(owned_boxes::Column::TokenId.is_in(chain_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.token_id, row))
        .collect();

    let mut sync = BoxSync::default();
    let mut new_rows = Vec::new();
    let mut previous_holders = BTreeSet::new();

    for token_id in chain_ids {
        match existing.get(&token_id) {
            None => {
                new_rows.push(owned_boxes::ActiveModel {
                    token_id: Set(token_id),
                    user_id: Set(user_id),
                    status: Set(BoxStatus::Owned.as_str().to_string()),
                    acquired_at: Set(now),
                    updated_at: Set(now),
                });
                sync.added.push(from_db(token_id));
            }
            Some(row) if row.status == BoxStatus::Opened.as_str() => {}
            Some(row) if row.user_id == user_id && row.status == BoxStatus::Owned.as_str() => {}
            Some(row) => {
                if row.user_id != user_id && row.status == BoxStatus::Owned.as_str() {
                    previous_holders.insert(row.user_id);
                }
                let mut active: owned_boxes::ActiveModel = row.clone().into();
                active.user_id = Set(user_id);
                active.status = Set(BoxStatus::Owned.as_str().to_string());
                active.acquired_at = Set(now);
                active.updated_at = Set(now);
                active.update(db).await?;
                sync.added.push(from_db(token_id));
            }
        }
    }

    if !new_rows.is_empty() {
        owned_boxes::Entity::insert_many(new_rows)
            .exec_without_returning(db)
            .await?;
    }

    let vanished: Vec<i64> = owned_boxes::Entity::find()
        .filter(owned_boxes::Column::UserId.eq(user_id))
        .filter(owned_boxes::Column::Status.eq(BoxStatus::Owned.as_str()))
        .order_by_asc(owned_boxes::Column::TokenId)
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.token_id)
        .filter(|token_id| !chain.contains(&from_db(*token_id)))
        .collect();

    if !vanished.is_empty() {
        owned_boxes::Entity::update_many()
            .col_expr(
                owned_boxes::Column::Status,
                Expr::value(BoxStatus::Released.as_str()),
            )
            .col_expr(owned_boxes::Column::UpdatedAt, Expr::value(now))
            .filter(owned_boxes::Column::TokenId.is_in(vanished.clone()))
            .exec(db)
            .await?;
        sync.released = vanished.into_iter().map(from_db).collect();
    }

    sync.boxes_owned = recount_owned(db, user_id).await?;
    for holder in previous_holders {
        recount_owned(db, holder).await?;
    }

    debug!(
        "Synced boxes for user #{}: +{} -{} = {}",
        user_id,
        sync.added.len(),
        sync.released.len(),
        sync.boxes_owned
    );
    Ok(sync)
}

/// Mark a specific owned box as opened
pub async fn consume_box<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    token_id: u64,
) -> AccountResult<()> {
    let result = owned_boxes::Entity::update_many()
        .col_expr(
            owned_boxes::Column::Status,
            Expr::value(BoxStatus::Opened.as_str()),
        )
        .col_expr(owned_boxes::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(owned_boxes::Column::TokenId.eq(to_db(token_id)?))
        .filter(owned_boxes::Column::UserId.eq(user_id))
        .filter(owned_boxes::Column::Status.eq(BoxStatus::Owned.as_str()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AccountError::NotOwner { token_id });
    }
    Ok(())
}

/// Mark the lowest-numbered owned box as opened, returning its token id
pub async fn consume_next_box<C: ConnectionTrait>(db: &C, user_id: i32) -> AccountResult<u64> {
    let next = owned_boxes::Entity::find()
        .filter(owned_boxes::Column::UserId.eq(user_id))
        .filter(owned_boxes::Column::Status.eq(BoxStatus::Owned.as_str()))
        .order_by_asc(owned_boxes::Column::TokenId)
        .one(db)
        .await?;

    let Some(next) = next else {
        return Err(AccountError::InsufficientBoxes {
            required: 1,
            available: 0,
        });
    };

    let token_id = from_db(next.token_id);
    consume_box(db, user_id, token_id).await?;
    Ok(token_id)
}

pub async fn list_owned_boxes<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    request: PageRequest,
) -> AccountResult<Page<owned_boxes::Model>> {
    let select = owned_boxes::Entity::find()
        .filter(owned_boxes::Column::UserId.eq(user_id))
        .filter(owned_boxes::Column::Status.eq(BoxStatus::Owned.as_str()))
        .order_by_asc(owned_boxes::Column::TokenId);

    Ok(fetch_page(db, select, request).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_writeable_campaign_db;
    use sea_orm::DatabaseConnection;

    fn wallet(n: u8) -> WalletAddress {
        format!("0x{:040x}", n).parse().unwrap()
    }

    async fn account_with(db: &DatabaseConnection, n: u8, keys: u64, boxes: &[u64]) -> i32 {
        let account = get_or_create(db, &wallet(n)).await.unwrap();
        credit(db, account.id, keys).await.unwrap();
        sync_owned_boxes(db, account.id, boxes).await.unwrap();
        account.id
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = new_writeable_campaign_db().await.unwrap();
        let first = get_or_create(&db, &wallet(1)).await.unwrap();
        let second = get_or_create(&db, &wallet(1)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.key_count, 0);
        assert!(find(&db, &wallet(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserve_and_refund() {
        let db = new_writeable_campaign_db().await.unwrap();
        let user_id = account_with(&db, 1, 2, &[10]).await;

        reserve(&db, user_id, 1, 1).await.unwrap();
        let account = get(&db, user_id).await.unwrap();
        assert_eq!(
            (account.key_count, account.boxes_owned, account.boxes_opened),
            (1, 0, 1)
        );

        refund(&db, user_id, 1, 1).await.unwrap();
        let account = get(&db, user_id).await.unwrap();
        assert_eq!(
            (account.key_count, account.boxes_owned, account.boxes_opened),
            (2, 1, 0)
        );
    }

    #[tokio::test]
    async fn test_reserve_reports_keys_before_boxes() {
        let db = new_writeable_campaign_db().await.unwrap();
        let user_id = account_with(&db, 1, 0, &[]).await;

        assert!(matches!(
            reserve(&db, user_id, 1, 1).await,
            Err(AccountError::InsufficientKeys {
                required: 1,
                available: 0
            })
        ));

        credit(&db, user_id, 1).await.unwrap();
        assert!(matches!(
            reserve(&db, user_id, 1, 1).await,
            Err(AccountError::InsufficientBoxes { .. })
        ));

        let account = get(&db, user_id).await.unwrap();
        assert_eq!(account.key_count, 1);
        assert_eq!(account.boxes_opened, 0);
    }

    #[tokio::test]
    async fn test_sync_adds_releases_and_transfers() {
        let db = new_writeable_campaign_db().await.unwrap();
        let alice = account_with(&db, 1, 0, &[1, 2, 3]).await;
        assert_eq!(get(&db, alice).await.unwrap().boxes_owned, 3);

        // Box 3 sold to bob, box 4 newly minted to alice
        let bob = account_with(&db, 2, 0, &[3]).await;
        assert_eq!(get(&db, bob).await.unwrap().boxes_owned, 1);
        assert_eq!(get(&db, alice).await.unwrap().boxes_owned, 2);

        let sync = sync_owned_boxes(&db, alice, &[1, 2, 4]).await.unwrap();
        assert_eq!(sync.added, vec![4]);
        assert!(sync.released.is_empty());
        assert_eq!(sync.boxes_owned, 3);

        let sync = sync_owned_boxes(&db, alice, &[4]).await.unwrap();
        assert_eq!(sync.released, vec![1, 2]);
        assert_eq!(sync.boxes_owned, 1);
    }

    #[tokio::test]
    async fn test_opened_boxes_stay_opened_on_resync() {
        let db = new_writeable_campaign_db().await.unwrap();
        let user_id = account_with(&db, 1, 1, &[7, 8]).await;

        reserve(&db, user_id, 1, 1).await.unwrap();
        assert_eq!(consume_next_box(&db, user_id).await.unwrap(), 7);

        // Chain has not burned box 7 yet
        let sync = sync_owned_boxes(&db, user_id, &[7, 8]).await.unwrap();
        assert!(sync.added.is_empty());
        assert_eq!(sync.boxes_owned, 1);

        assert!(matches!(
            consume_box(&db, user_id, 7).await,
            Err(AccountError::NotOwner { token_id: 7 })
        ));

        let page = list_owned_boxes(&db, user_id, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].token_id, 8);
    }
}
