/*!
# Campaign Inventory

The singleton supply row (`total = available + opened`) and the per-type tally of
issued rewards. Opens decrement supply with one conditional `UPDATE`, so the
campaign can never be oversold regardless of how many opens race.
*/

use chrono::Utc;
use hiibox_entities::{campaign_inventory, opened_boxes, reward_distribution};
use sea_orm::{
    ActiveValue::Set, ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _,
    QueryOrder as _, QuerySelect as _, prelude::Expr, sea_query::OnConflict,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, info};

use crate::accounts::{AccountError, from_db, to_db};
use crate::RewardKind;

/// Primary key of the singleton inventory row
const INVENTORY_ID: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Campaign inventory has not been initialized")]
    NotInitialized,

    #[error("Campaign supply exhausted")]
    SupplyExhausted,

    #[error(
        "Inventory invariant violated: available {available} + opened {opened} != total {total}"
    )]
    InvariantViolated {
        total: i64,
        available: i64,
        opened: i64,
    },

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),
}

pub type InventoryResult<T> = std::result::Result<T, InventoryError>;

/// Campaign-wide stats
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySnapshot {
    pub total_boxes: u64,
    pub available_boxes: u64,
    pub opened_boxes: u64,
    pub opening_percentage: f64,
    pub reward_distribution: BTreeMap<String, u64>,
    pub next_box_position: u64,
}

impl InventorySnapshot {
    fn new(total: u64, available: u64, opened: u64, distribution: BTreeMap<String, u64>) -> Self {
        let opening_percentage = if total == 0 {
            0.0
        } else {
            opened as f64 / total as f64 * 100.0
        };

        Self {
            total_boxes: total,
            available_boxes: available,
            opened_boxes: opened,
            opening_percentage,
            reward_distribution: distribution,
            next_box_position: opened + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionMismatch {
    pub reward_type: String,
    pub tallied: u64,
    pub recorded: u64,
}

/// Tally vs. opened-box records, grouped by reward type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionAudit {
    pub tallied_total: u64,
    pub recorded_total: u64,
    pub mismatches: Vec<DistributionMismatch>,
}

impl DistributionAudit {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Create the inventory with `total_boxes` available; a no-op once it exists
pub async fn initialize<C: ConnectionTrait>(
    db: &C,
    total_boxes: u64,
) -> InventoryResult<InventorySnapshot> {
    let total = to_db(total_boxes)?;
    let inserted = campaign_inventory::Entity::insert(campaign_inventory::ActiveModel {
        id: Set(INVENTORY_ID),
        total_boxes: Set(total),
        available_boxes: Set(total),
        opened_boxes: Set(0),
        updated_at: Set(Utc::now()),
    })
    .on_conflict(
        OnConflict::column(campaign_inventory::Column::Id)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    if inserted > 0 {
        info!("Initialized campaign inventory with {} boxes", total_boxes);
    }
    snapshot(db).await
}

/// Grow the supply by `boxes`
pub async fn add_supply<C: ConnectionTrait>(db: &C, boxes: u64) -> InventoryResult<()> {
    let boxes_db = to_db(boxes)?;
    let result = campaign_inventory::Entity::update_many()
        .col_expr(
            campaign_inventory::Column::TotalBoxes,
            Expr::col(campaign_inventory::Column::TotalBoxes).add(boxes_db),
        )
        .col_expr(
            campaign_inventory::Column::AvailableBoxes,
            Expr::col(campaign_inventory::Column::AvailableBoxes).add(boxes_db),
        )
        .col_expr(campaign_inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(campaign_inventory::Column::Id.eq(INVENTORY_ID))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(InventoryError::NotInitialized);
    }

    info!("Added {} boxes to campaign supply", boxes);
    Ok(())
}

/// Take one box from supply and tally the reward it produced
pub async fn record_open<C: ConnectionTrait>(db: &C, kind: RewardKind) -> InventoryResult<()> {
    let result = campaign_inventory::Entity::update_many()
        .col_expr(
            campaign_inventory::Column::AvailableBoxes,
            Expr::col(campaign_inventory::Column::AvailableBoxes).sub(1),
        )
        .col_expr(
            campaign_inventory::Column::OpenedBoxes,
            Expr::col(campaign_inventory::Column::OpenedBoxes).add(1),
        )
        .col_expr(campaign_inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(campaign_inventory::Column::Id.eq(INVENTORY_ID))
        .filter(campaign_inventory::Column::AvailableBoxes.gt(0))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let exists = campaign_inventory::Entity::find_by_id(INVENTORY_ID)
            .one(db)
            .await?
            .is_some();
        return Err(if exists {
            InventoryError::SupplyExhausted
        } else {
            InventoryError::NotInitialized
        });
    }

    record_distribution(db, kind).await
}

/// Tally a reward without touching supply
pub async fn record_distribution<C: ConnectionTrait>(
    db: &C,
    kind: RewardKind,
) -> InventoryResult<()> {
    reward_distribution::Entity::insert(reward_distribution::ActiveModel {
        reward_type: Set(kind.as_str().to_string()),
        issued: Set(1),
    })
    .on_conflict(
        OnConflict::column(reward_distribution::Column::RewardType)
            .value(
                reward_distribution::Column::Issued,
                Expr::col(reward_distribution::Column::Issued).add(1),
            )
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    Ok(())
}

async fn distribution<C: ConnectionTrait>(db: &C) -> InventoryResult<BTreeMap<String, u64>> {
    Ok(reward_distribution::Entity::find()
        .order_by_asc(reward_distribution::Column::RewardType)
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.reward_type, from_db(row.issued)))
        .collect())
}

/// Current stats; an uninitialized campaign reports zero supply
pub async fn snapshot<C: ConnectionTrait>(db: &C) -> InventoryResult<InventorySnapshot> {
    let distribution = distribution(db).await?;

    let Some(row) = campaign_inventory::Entity::find_by_id(INVENTORY_ID)
        .one(db)
        .await?
    else {
        return Ok(InventorySnapshot::new(0, 0, 0, distribution));
    };

    if row.available_boxes + row.opened_boxes != row.total_boxes
        || row.available_boxes < 0
        || row.opened_boxes < 0
    {
        error!(
            "Campaign inventory inconsistent: total {} available {} opened {}",
            row.total_boxes, row.available_boxes, row.opened_boxes
        );
        return Err(InventoryError::InvariantViolated {
            total: row.total_boxes,
            available: row.available_boxes,
            opened: row.opened_boxes,
        });
    }

    Ok(InventorySnapshot::new(
        from_db(row.total_boxes),
        from_db(row.available_boxes),
        from_db(row.opened_boxes),
        distribution,
    ))
}

/// Compare the distribution tally with the opened-box records
pub async fn audit_distribution<C: ConnectionTrait>(db: &C) -> InventoryResult<DistributionAudit> {
    let tallied = distribution(db).await?;

    let recorded: BTreeMap<String, u64> = opened_boxes::Entity::find()
        .select_only()
        .column(opened_boxes::Column::RewardType)
        .column_as(Expr::col(opened_boxes::Column::Id).count(), "issued")
        .group_by(opened_boxes::Column::RewardType)
        .into_tuple::<(String, i64)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(reward_type, issued)| (reward_type, from_db(issued)))
        .collect();

    let reward_types: BTreeSet<&String> = tallied.keys().chain(recorded.keys()).collect();
    let mismatches = reward_types
        .into_iter()
        .filter_map(|reward_type| {
            let tallied = tallied.get(reward_type).copied().unwrap_or(0);
            let recorded = recorded.get(reward_type).copied().unwrap_or(0);
            (tallied != recorded).then(|| DistributionMismatch {
                reward_type: reward_type.clone(),
                tallied,
                recorded,
            })
        })
        .collect::<Vec<_>>();

    if !mismatches.is_empty() {
        error!("Reward distribution drifted from records: {:?}", mismatches);
    }

    Ok(DistributionAudit {
        tallied_total: tallied.values().sum(),
        recorded_total: recorded.values().sum(),
        mismatches,
    })
}
