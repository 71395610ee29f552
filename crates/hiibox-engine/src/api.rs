/*!
# API Surface

Request, response and error values a web layer mounts on top of
[`BoxOpeningEngine`](crate::BoxOpeningEngine). Field names follow the JSON the
HiiBox frontend reads.
*/

use chrono::{DateTime, Utc};
use hiibox_entities::{opened_boxes, owned_boxes, users};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::from_db;
use crate::{
    DEFAULT_BOX_TIER, EngineError, GrantStatus, InventorySnapshot, OpenedBox, OpenedBoxExt as _, Rarity,
    RewardDefinition, RewardKind, RewardPayload, TaskGrant,
};

/// Shown instead of internal failure details
const TRY_AGAIN_LATER: &str = "Something went wrong on our side, please try again later";

pub type StatsResponse = InventorySnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBoxRequest {
    #[serde(default)]
    pub box_id: Option<u64>,

    /// Tier to open; absent means the default tier
    #[serde(default)]
    pub box_tier: Option<String>,
}

impl OpenBoxRequest {
    pub fn box_tier(&self) -> &str {
        self.box_tier.as_deref().unwrap_or(DEFAULT_BOX_TIER)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardView {
    #[serde(rename = "type")]
    pub kind: RewardKind,
    pub name: String,
    pub rarity: Rarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

impl From<&RewardDefinition> for RewardView {
    fn from(reward: &RewardDefinition) -> Self {
        Self {
            kind: reward.kind(),
            name: reward.name.clone(),
            rarity: reward.rarity,
            amount: reward.payload.amount(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenBoxResponse {
    pub message: String,
    pub reward: RewardView,
    pub record_id: i32,
    pub box_id: Option<u64>,
    pub box_tier: String,
    pub keys_spent: u64,
    pub keys_remaining: u64,
}

impl From<&OpenedBox> for OpenBoxResponse {
    fn from(opened: &OpenedBox) -> Self {
        Self {
            message: format!("You won {}!", opened.reward.name),
            reward: RewardView::from(&opened.reward),
            record_id: opened.record.id,
            box_id: opened.record.box_token_id(),
            box_tier: opened.record.box_tier.clone(),
            keys_spent: from_db(opened.record.keys_spent),
            keys_remaining: from_db(opened.account.key_count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    pub wallet_address: String,
    pub key_count: u64,
    pub boxes_owned: u64,
    pub boxes_opened: u64,
}

impl From<&users::Model> for MeResponse {
    fn from(account: &users::Model) -> Self {
        Self {
            wallet_address: account.wallet_address.clone(),
            key_count: from_db(account.key_count),
            boxes_owned: from_db(account.boxes_owned),
            boxes_opened: from_db(account.boxes_opened),
        }
    }
}

/// A verification oracle's ruling on one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub task_id: String,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGrantResponse {
    pub granted: bool,
    pub keys_awarded: u64,
    pub status: GrantStatus,
    pub message: String,
}

impl From<TaskGrant> for TaskGrantResponse {
    fn from(grant: TaskGrant) -> Self {
        let message = match grant.status {
            GrantStatus::Granted => format!("Task complete, {} keys awarded", grant.keys_awarded),
            GrantStatus::ToppedUp => format!("Holdings grew, {} more keys", grant.keys_awarded),
            GrantStatus::AlreadyCompleted => "Task already completed".to_string(),
            GrantStatus::NotSatisfied => "Task requirements not met".to_string(),
        };

        Self {
            granted: grant.granted,
            keys_awarded: grant.keys_awarded,
            status: grant.status,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedBoxView {
    pub token_id: u64,
    pub status: String,
    pub acquired_at: DateTime<Utc>,
}

impl From<owned_boxes::Model> for OwnedBoxView {
    fn from(model: owned_boxes::Model) -> Self {
        Self {
            token_id: from_db(model.token_id),
            status: model.status,
            acquired_at: model.acquired_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenedBoxView {
    pub id: i32,
    pub box_id: Option<u64>,
    pub box_tier: String,
    pub reward_name: String,
    pub rarity: Option<Rarity>,
    pub reward: Option<RewardPayload>,
    pub opened_at: DateTime<Utc>,
    pub tx_hash: Option<String>,
}

impl From<opened_boxes::Model> for OpenedBoxView {
    fn from(model: opened_boxes::Model) -> Self {
        Self {
            id: model.id,
            box_id: model.box_token_id(),
            rarity: model.rarity(),
            reward: model.payload(),
            box_tier: model.box_tier,
            reward_name: model.reward_name,
            opened_at: model.opened_at,
            tx_hash: model.tx_hash,
        }
    }
}

/// Error body: `{ "status": 400, "detail": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub detail: String,
}

impl From<&EngineError> for ApiError {
    fn from(err: &EngineError) -> Self {
        let status = err.status_code();
        let detail = match err {
            EngineError::InvalidRewardTable(_)
            | EngineError::InventoryInvariantViolated(_)
            | EngineError::Storage(_) => TRY_AGAIN_LATER.to_string(),
            other => other.to_string(),
        };
        Self { status, detail }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::from(&err)
    }
}
