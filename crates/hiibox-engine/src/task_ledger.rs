/*!
# Task Ledger

A task record per `(user, task)` is the single source of truth for "keys were
credited for this task". Recording a task that already has a record is a no-op,
except for NFT holding tasks whose entitlement grew: those grant only the
difference, guarded by a compare-and-swap on `keys_credited`. Entitlements that
shrink never claw keys back.
*/

use chrono::Utc;
use hiibox_csvs::TaskCsvRow;
use hiibox_entities::{task_definitions, task_records};
use sea_orm::{
    ActiveValue::Set, ColumnTrait as _, ConnectionTrait, DatabaseConnection, EntityTrait as _,
    QueryFilter as _, QueryOrder as _, TransactionTrait as _, prelude::Expr,
    sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::accounts::{self, AccountError, from_db, to_db};
use crate::TaskDefinitionExt as _;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task {0} is not an NFT holding task")]
    NotNftTask(String),

    #[error("Task {0} is granted from on-chain holdings, not oracle verification")]
    HoldingsRequired(String),

    #[error("Invalid task definition {id}: {message}")]
    InvalidDefinition { id: String, message: String },

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Social,
    Nft,
    Onchain,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Social => "social",
            TaskKind::Nft => "nft",
            TaskKind::Onchain => "onchain",
        }
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "social" => Ok(TaskKind::Social),
            "nft" => Ok(TaskKind::Nft),
            "onchain" => Ok(TaskKind::Onchain),
            other => Err(format!("Unknown task kind: {other}")),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof offered for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvidence {
    /// Answer of the social / on-chain verification oracle
    Verified(bool),
    /// Holdings of the task's collection, as reported by the bridge
    NftBalance(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Granted,
    ToppedUp,
    AlreadyCompleted,
    NotSatisfied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskGrant {
    pub granted: bool,
    pub keys_awarded: u64,
    pub status: GrantStatus,
}

impl TaskGrant {
    fn awarded(keys: u64, status: GrantStatus) -> Self {
        Self {
            granted: true,
            keys_awarded: keys,
            status,
        }
    }

    fn unchanged(status: GrantStatus) -> Self {
        Self {
            granted: false,
            keys_awarded: 0,
            status,
        }
    }
}

// ================================================================================================
// Catalogue
// ================================================================================================

pub async fn find_task<C: ConnectionTrait>(
    db: &C,
    task_id: &str,
) -> LedgerResult<task_definitions::Model> {
    task_definitions::Entity::find_by_id(task_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::TaskNotFound(task_id.to_string()))
}

pub async fn list_tasks<C: ConnectionTrait>(db: &C) -> LedgerResult<Vec<task_definitions::Model>> {
    let tasks = task_definitions::Entity::find()
        .order_by_asc(task_definitions::Column::Id)
        .all(db)
        .await?;
    Ok(tasks)
}

/// Insert or update task definitions from catalogue rows
///
/// Existing definitions are updated in place; records already granted against
/// them are kept.
pub async fn import_task_definitions(
    db: &DatabaseConnection,
    rows: &[TaskCsvRow],
) -> LedgerResult<usize> {
    let mut models = Vec::with_capacity(rows.len());
    for row in rows {
        row.kind
            .parse::<TaskKind>()
            .map_err(|message| LedgerError::InvalidDefinition {
                id: row.id.clone(),
                message,
            })?;

        models.push(task_definitions::ActiveModel {
            id: Set(row.id.clone()),
            title: Set(row.title.clone()),
            kind: Set(row.kind.clone()),
            platform: Set(row.platform.clone()),
            reward_keys: Set(to_db(row.reward_keys)?),
            collection: Set(row.collection.clone()),
            min_balance: Set(row.min_balance.map(to_db).transpose()?),
            keys_per_nft: Set(row.keys_per_nft.map(to_db).transpose()?),
            max_keys: Set(row.max_keys.map(to_db).transpose()?),
        });
    }

    if models.is_empty() {
        return Ok(0);
    }

    let count = models.len();
    let txn = db.begin().await?;
    task_definitions::Entity::insert_many(models)
        .on_conflict(
            OnConflict::column(task_definitions::Column::Id)
                .update_columns([
                    task_definitions::Column::Title,
                    task_definitions::Column::Kind,
                    task_definitions::Column::Platform,
                    task_definitions::Column::RewardKeys,
                    task_definitions::Column::Collection,
                    task_definitions::Column::MinBalance,
                    task_definitions::Column::KeysPerNft,
                    task_definitions::Column::MaxKeys,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    info!("Imported {} task definitions", count);
    Ok(count)
}

// ================================================================================================
// Records
// ================================================================================================

/// Record a task for a user and credit the keys it earns
///
/// The record write and the key credit share one transaction.
pub async fn record_task(
    db: &DatabaseConnection,
    user_id: i32,
    task_id: &str,
    evidence: TaskEvidence,
) -> LedgerResult<TaskGrant> {
    let txn = db.begin().await?;

    let definition = find_task(&txn, task_id).await?;
    let entitled = definition.entitlement(evidence);

    let existing = task_records::Entity::find()
        .filter(task_records::Column::UserId.eq(user_id))
        .filter(task_records::Column::TaskId.eq(task_id))
        .one(&txn)
        .await?;

    let grant = match (existing, entitled) {
        (None, None) => TaskGrant::unchanged(GrantStatus::NotSatisfied),

        (None, Some(keys)) => {
            let now = Utc::now();
            let inserted = task_records::Entity::insert(task_records::ActiveModel {
                user_id: Set(user_id),
                task_id: Set(task_id.to_string()),
                platform: Set(definition.platform.clone()),
                keys_credited: Set(to_db(keys)?),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            })
            .on_conflict(
                OnConflict::columns([task_records::Column::UserId, task_records::Column::TaskId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

            if inserted == 0 {
                TaskGrant::unchanged(GrantStatus::AlreadyCompleted)
            } else {
                accounts::credit(&txn, user_id, keys).await?;
                TaskGrant::awarded(keys, GrantStatus::Granted)
            }
        }

        (Some(record), Some(keys)) if keys > from_db(record.keys_credited) => {
            let delta = keys - from_db(record.keys_credited);
            let swapped = task_records::Entity::update_many()
                .col_expr(task_records::Column::KeysCredited, Expr::value(to_db(keys)?))
                .col_expr(task_records::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(task_records::Column::Id.eq(record.id))
                .filter(task_records::Column::KeysCredited.eq(record.keys_credited))
                .exec(&txn)
                .await?;

            if swapped.rows_affected == 0 {
                TaskGrant::unchanged(GrantStatus::AlreadyCompleted)
            } else {
                accounts::credit(&txn, user_id, delta).await?;
                TaskGrant::awarded(delta, GrantStatus::ToppedUp)
            }
        }

        (Some(_), _) => TaskGrant::unchanged(GrantStatus::AlreadyCompleted),
    };

    txn.commit().await?;

    if grant.granted {
        info!(
            "Task {} {:?} for user #{}: +{} keys",
            task_id, grant.status, user_id, grant.keys_awarded
        );
    } else {
        debug!("Task {} {:?} for user #{}", task_id, grant.status, user_id);
    }
    Ok(grant)
}

pub async fn completed_tasks<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> LedgerResult<Vec<task_records::Model>> {
    let records = task_records::Entity::find()
        .filter(task_records::Column::UserId.eq(user_id))
        .order_by_asc(task_records::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(records)
}

/// Keys credited to a user across all task records
pub async fn keys_credited<C: ConnectionTrait>(db: &C, user_id: i32) -> LedgerResult<u64> {
    Ok(completed_tasks(db, user_id)
        .await?
        .iter()
        .map(|record| from_db(record.keys_credited))
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WalletAddress, new_writeable_campaign_db};

    fn task_row(id: &str, kind: &str, keys_per_nft: Option<u64>) -> TaskCsvRow {
        let nft = kind == "nft";
        TaskCsvRow {
            id: id.to_string(),
            title: id.to_string(),
            kind: kind.to_string(),
            platform: if nft { "apechain" } else { "twitter" }.to_string(),
            reward_keys: 2,
            collection: nft.then(|| "bayc".to_string()),
            min_balance: nft.then_some(1),
            keys_per_nft,
            max_keys: keys_per_nft.map(|_| 20),
        }
    }

    async fn setup() -> (DatabaseConnection, i32) {
        let db = new_writeable_campaign_db().await.unwrap();
        import_task_definitions(
            &db,
            &[
                task_row("follow-twitter", "social", None),
                task_row("hold-bayc", "nft", Some(3)),
            ],
        )
        .await
        .unwrap();

        let address: WalletAddress = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let account = accounts::get_or_create(&db, &address).await.unwrap();
        (db, account.id)
    }

    #[tokio::test]
    async fn test_social_task_grants_once() {
        let (db, user_id) = setup().await;

        let first = record_task(&db, user_id, "follow-twitter", TaskEvidence::Verified(true))
            .await
            .unwrap();
        assert_eq!(first, TaskGrant::awarded(2, GrantStatus::Granted));

        let second = record_task(&db, user_id, "follow-twitter", TaskEvidence::Verified(true))
            .await
            .unwrap();
        assert_eq!(second, TaskGrant::unchanged(GrantStatus::AlreadyCompleted));

        assert_eq!(accounts::get(&db, user_id).await.unwrap().key_count, 2);
        assert_eq!(completed_tasks(&db, user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsatisfied_task_writes_nothing() {
        let (db, user_id) = setup().await;

        let grant = record_task(&db, user_id, "follow-twitter", TaskEvidence::Verified(false))
            .await
            .unwrap();
        assert_eq!(grant.status, GrantStatus::NotSatisfied);
        assert!(completed_tasks(&db, user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verified_flag_cannot_satisfy_nft_task() {
        let (db, user_id) = setup().await;

        let grant = record_task(&db, user_id, "hold-bayc", TaskEvidence::Verified(true))
            .await
            .unwrap();
        assert_eq!(grant, TaskGrant::unchanged(GrantStatus::NotSatisfied));
        assert_eq!(accounts::get(&db, user_id).await.unwrap().key_count, 0);
        assert!(completed_tasks(&db, user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let (db, user_id) = setup().await;
        assert!(matches!(
            record_task(&db, user_id, "nope", TaskEvidence::Verified(true)).await,
            Err(LedgerError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_nft_top_up_without_clawback() {
        let (db, user_id) = setup().await;

        let grant = record_task(&db, user_id, "hold-bayc", TaskEvidence::NftBalance(2))
            .await
            .unwrap();
        assert_eq!(grant, TaskGrant::awarded(6, GrantStatus::Granted));

        let grant = record_task(&db, user_id, "hold-bayc", TaskEvidence::NftBalance(5))
            .await
            .unwrap();
        assert_eq!(grant, TaskGrant::awarded(9, GrantStatus::ToppedUp));

        let grant = record_task(&db, user_id, "hold-bayc", TaskEvidence::NftBalance(1))
            .await
            .unwrap();
        assert_eq!(grant.status, GrantStatus::AlreadyCompleted);

        assert_eq!(accounts::get(&db, user_id).await.unwrap().key_count, 15);
        assert_eq!(keys_credited(&db, user_id).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_reimport_updates_definitions() {
        let (db, _) = setup().await;
        let mut row = task_row("follow-twitter", "social", None);
        row.reward_keys = 5;
        import_task_definitions(&db, &[row]).await.unwrap();

        let task = find_task(&db, "follow-twitter").await.unwrap();
        assert_eq!(task.reward_keys, 5);
        assert_eq!(list_tasks(&db).await.unwrap().len(), 2);
    }
}
