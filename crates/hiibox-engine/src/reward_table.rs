/*!
# Reward Table & Weighted Draw

An ordered list of reward definitions, each with a positive relative weight.
A draw samples `r` uniformly in `[0, total)` and walks the list in its fixed
order, subtracting weights until the remainder drops to zero or below.

Every definition belongs to a box tier, and a draw only ever runs over the
definitions of the tier being opened. The catalogue is stored in
`reward_definitions` keyed by `position`, so the draw order survives a round
trip through the database. Every open reloads its tier's table inside its
transaction; an unusable table aborts that transaction.
*/

use hiibox_csvs::RewardCsvRow;
use hiibox_entities::reward_definitions;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive as _;
use sea_orm::{
    ActiveValue::Set, ColumnTrait as _, ConnectionTrait, DatabaseConnection, EntityTrait as _,
    QueryFilter as _, QueryOrder as _, TransactionTrait as _,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::DrawSource;

#[derive(Debug, thiserror::Error)]
pub enum RewardTableError {
    #[error("Reward table is empty")]
    Empty,

    #[error("Box tier '{0}' has no rewards")]
    EmptyTier(String),

    #[error("Reward '{name}' has invalid weight {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("Reward weights sum to {0}")]
    NonPositiveTotal(f64),

    #[error("Reward '{name}': {message}")]
    InvalidDefinition { name: String, message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),
}

pub type RewardTableResult<T> = std::result::Result<T, RewardTableError>;

// ================================================================================================
// Rarity & Kind
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Weight applied when a catalogue row leaves `weight` blank
    pub fn default_weight(self) -> f64 {
        match self {
            Rarity::Common => 74.0,
            Rarity::Rare => 20.0,
            Rarity::Epic => 5.0,
            Rarity::Legendary => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Rarity::Common),
            "rare" => Ok(Rarity::Rare),
            "epic" => Ok(Rarity::Epic),
            "legendary" => Ok(Rarity::Legendary),
            other => Err(format!("Unknown rarity: {other}")),
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Token,
    Collectible,
    Ticket,
    Points,
}

impl RewardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardKind::Token => "token",
            RewardKind::Collectible => "collectible",
            RewardKind::Ticket => "ticket",
            RewardKind::Points => "points",
        }
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ================================================================================================
// Definitions
// ================================================================================================

/// What the winner actually receives; stored as JSON in `reward_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardPayload {
    Token { amount: Decimal, symbol: String },
    Collectible {
        collection: String,
        token_id: Option<u64>,
    },
    Ticket { event: String },
    Points { amount: u64 },
}

impl RewardPayload {
    pub fn kind(&self) -> RewardKind {
        match self {
            RewardPayload::Token { .. } => RewardKind::Token,
            RewardPayload::Collectible { .. } => RewardKind::Collectible,
            RewardPayload::Ticket { .. } => RewardKind::Ticket,
            RewardPayload::Points { .. } => RewardKind::Points,
        }
    }

    /// Quantity shown to the winner, for the kinds that have one
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            RewardPayload::Token { amount, .. } => Some(*amount),
            RewardPayload::Points { amount } => Some(Decimal::from(*amount)),
            RewardPayload::Collectible { .. } | RewardPayload::Ticket { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardDefinition {
    pub box_tier: String,
    pub name: String,
    pub rarity: Rarity,
    pub weight: f64,
    pub payload: RewardPayload,
}

impl RewardDefinition {
    pub fn kind(&self) -> RewardKind {
        self.payload.kind()
    }

    fn from_csv_row(row: &RewardCsvRow) -> RewardTableResult<Self> {
        let invalid = |message: &str| RewardTableError::InvalidDefinition {
            name: row.name.clone(),
            message: message.to_string(),
        };

        let rarity = Rarity::from_str(&row.rarity).map_err(|e| invalid(&e))?;

        let payload = match row.reward_type.as_str() {
            "token" => RewardPayload::Token {
                amount: row.amount.ok_or_else(|| invalid("token reward needs an amount"))?,
                symbol: row
                    .symbol
                    .clone()
                    .ok_or_else(|| invalid("token reward needs a symbol"))?,
            },
            "collectible" => RewardPayload::Collectible {
                collection: row
                    .collection
                    .clone()
                    .ok_or_else(|| invalid("collectible reward needs a collection"))?,
                token_id: row.token_id,
            },
            "ticket" => RewardPayload::Ticket {
                event: row
                    .event
                    .clone()
                    .ok_or_else(|| invalid("ticket reward needs an event"))?,
            },
            "points" => RewardPayload::Points {
                amount: row
                    .amount
                    .filter(|amount| amount.fract().is_zero())
                    .and_then(|amount| amount.to_u64())
                    .ok_or_else(|| invalid("points reward needs a whole amount"))?,
            },
            other => return Err(invalid(&format!("unknown reward type {other}"))),
        };

        Ok(Self {
            box_tier: row.box_tier().to_string(),
            name: row.name.clone(),
            rarity,
            weight: row.weight.unwrap_or_else(|| rarity.default_weight()),
            payload,
        })
    }

    fn from_model(model: reward_definitions::Model) -> RewardTableResult<Self> {
        let rarity =
            Rarity::from_str(&model.rarity).map_err(|message| RewardTableError::InvalidDefinition {
                name: model.name.clone(),
                message,
            })?;
        let payload: RewardPayload = serde_json::from_str(&model.reward_data)?;

        Ok(Self {
            box_tier: model.box_tier,
            name: model.name,
            rarity,
            weight: model.weight,
            payload,
        })
    }
}

/// Probability of a single definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardOdds {
    pub box_tier: String,
    pub name: String,
    pub kind: RewardKind,
    pub rarity: Rarity,
    pub weight: f64,
    pub probability: f64,
}

/// Empirical outcome of a simulated run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedReward {
    pub name: String,
    pub draws: u64,
    pub expected: f64,
    pub observed: f64,
}

// ================================================================================================
// Table
// ================================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RewardTable {
    definitions: Vec<RewardDefinition>,
    total_weight: f64,
}

impl RewardTable {
    /// Build a table, rejecting empty tables and non-positive or non-finite weights
    pub fn new(definitions: Vec<RewardDefinition>) -> RewardTableResult<Self> {
        if definitions.is_empty() {
            return Err(RewardTableError::Empty);
        }

        for definition in &definitions {
            if !definition.weight.is_finite() || definition.weight <= 0.0 {
                return Err(RewardTableError::InvalidWeight {
                    name: definition.name.clone(),
                    weight: definition.weight,
                });
            }
        }

        let total_weight: f64 = definitions.iter().map(|d| d.weight).sum();
        if !total_weight.is_finite() || total_weight <= 0.0 {
            return Err(RewardTableError::NonPositiveTotal(total_weight));
        }

        Ok(Self {
            definitions,
            total_weight,
        })
    }

    pub fn from_csv_rows(rows: &[RewardCsvRow]) -> RewardTableResult<Self> {
        let definitions = rows
            .iter()
            .map(RewardDefinition::from_csv_row)
            .collect::<RewardTableResult<Vec<_>>>()?;
        Self::new(definitions)
    }

    /// Load the whole stored catalogue in draw order
    pub async fn load<C: ConnectionTrait>(db: &C) -> RewardTableResult<Self> {
        let models = reward_definitions::Entity::find()
            .order_by_asc(reward_definitions::Column::Position)
            .all(db)
            .await?;

        let definitions = models
            .into_iter()
            .map(RewardDefinition::from_model)
            .collect::<RewardTableResult<Vec<_>>>()?;
        Self::new(definitions)
    }

    /// Load the table one box tier draws from
    pub async fn load_tier<C: ConnectionTrait>(db: &C, box_tier: &str) -> RewardTableResult<Self> {
        let models = reward_definitions::Entity::find()
            .filter(reward_definitions::Column::BoxTier.eq(box_tier))
            .order_by_asc(reward_definitions::Column::Position)
            .all(db)
            .await?;
        if models.is_empty() {
            return Err(RewardTableError::EmptyTier(box_tier.to_string()));
        }

        let definitions = models
            .into_iter()
            .map(RewardDefinition::from_model)
            .collect::<RewardTableResult<Vec<_>>>()?;
        Self::new(definitions)
    }

    /// The sub-table of one box tier, in draw order
    pub fn for_tier(&self, box_tier: &str) -> RewardTableResult<Self> {
        let definitions: Vec<_> = self
            .definitions
            .iter()
            .filter(|definition| definition.box_tier == box_tier)
            .cloned()
            .collect();
        if definitions.is_empty() {
            return Err(RewardTableError::EmptyTier(box_tier.to_string()));
        }
        Self::new(definitions)
    }

    /// Tiers present in the table, in order of first appearance
    pub fn box_tiers(&self) -> Vec<&str> {
        let mut tiers: Vec<&str> = Vec::new();
        for definition in &self.definitions {
            if !tiers.contains(&definition.box_tier.as_str()) {
                tiers.push(&definition.box_tier);
            }
        }
        tiers
    }

    pub fn definitions(&self) -> &[RewardDefinition] {
        &self.definitions
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Select the definition whose cumulative weight band contains `r`
    pub fn draw_at(&self, r: f64) -> &RewardDefinition {
        &self.definitions[self.index_at(r)]
    }

    pub fn draw(&self, source: &dyn DrawSource) -> &RewardDefinition {
        self.draw_at(source.sample(self.total_weight))
    }

    pub fn odds(&self) -> Vec<RewardOdds> {
        self.definitions
            .iter()
            .map(|definition| RewardOdds {
                box_tier: definition.box_tier.clone(),
                name: definition.name.clone(),
                kind: definition.kind(),
                rarity: definition.rarity,
                weight: definition.weight,
                probability: definition.weight / self.total_weight,
            })
            .collect()
    }

    /// Draw `draws` times and tally the outcomes against the configured odds
    pub fn simulate(&self, draws: u64, source: &dyn DrawSource) -> Vec<SimulatedReward> {
        let mut counts = vec![0u64; self.definitions.len()];
        for _ in 0..draws {
            let r = source.sample(self.total_weight);
            let index = self.index_at(r);
            counts[index] += 1;
        }

        self.definitions
            .iter()
            .zip(counts)
            .map(|(definition, count)| SimulatedReward {
                name: definition.name.clone(),
                draws: count,
                expected: definition.weight / self.total_weight,
                observed: if draws == 0 {
                    0.0
                } else {
                    count as f64 / draws as f64
                },
            })
            .collect()
    }

    fn index_at(&self, r: f64) -> usize {
        let mut remainder = r;
        for (index, definition) in self.definitions.iter().enumerate() {
            remainder -= definition.weight;
            if remainder <= 0.0 {
                return index;
            }
        }
        // Rounding can leave a sliver past the final band
        self.definitions.len() - 1
    }
}

/// Replace the stored reward table
///
/// The whole table is swapped in one transaction, so concurrent opens see
/// either the old table or the new one.
pub async fn import_reward_table(db: &DatabaseConnection, table: &RewardTable) -> RewardTableResult<usize> {
    let models = table
        .definitions()
        .iter()
        .enumerate()
        .map(|(position, definition)| {
            Ok(reward_definitions::ActiveModel {
                position: Set(position as i32),
                box_tier: Set(definition.box_tier.clone()),
                name: Set(definition.name.clone()),
                reward_type: Set(definition.kind().as_str().to_string()),
                rarity: Set(definition.rarity.as_str().to_string()),
                weight: Set(definition.weight),
                reward_data: Set(serde_json::to_string(&definition.payload)?),
            })
        })
        .collect::<RewardTableResult<Vec<_>>>()?;

    let count = models.len();
    let txn = db.begin().await?;
    reward_definitions::Entity::delete_many().exec(&txn).await?;
    reward_definitions::Entity::insert_many(models)
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    info!("Imported {} reward definitions", count);
    Ok(count)
}
