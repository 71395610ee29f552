use hiibox_bridge::BridgeError;
use sea_orm::DbErr;

use crate::accounts::AccountError;
use crate::campaign_database;
use crate::inventory::InventoryError;
use crate::reward_records::RecordError;
use crate::reward_table::RewardTableError;
use crate::task_ledger::LedgerError;
use crate::wallet::WalletAddressError;

/// Every failure the engine reports to its callers
///
/// Storage failures are carried as messages so the error stays `Clone` and
/// comparable, and so driver details never leak into API types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown box tier: {0}")]
    UnknownBoxTier(String),

    #[error("Insufficient keys: need {required}, have {available}")]
    InsufficientKeys { required: u64, available: u64 },

    #[error("Insufficient boxes: need {required}, have {available}")]
    InsufficientBoxes { required: u64, available: u64 },

    #[error("Box {token_id} is not owned by this wallet")]
    NotOwner { token_id: u64 },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Opened box record #{0} not found")]
    RecordNotFound(i32),

    #[error("Campaign supply exhausted")]
    SupplyExhausted,

    #[error("Opened box record #{record_id} already has tx hash {tx_hash}")]
    AlreadyAttached { record_id: i32, tx_hash: String },

    #[error("Chain unavailable: {0}")]
    Unavailable(String),

    #[error("Chain rejected the request: {0}")]
    BridgeRejected(String),

    #[error("Storage busy: {0}")]
    StorageBusy(String),

    #[error("Invalid reward table: {0}")]
    InvalidRewardTable(String),

    #[error("Inventory invariant violated: {0}")]
    InventoryInvariantViolated(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// HTTP status an API layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::InvalidRequest(_)
            | EngineError::UnknownBoxTier(_)
            | EngineError::InsufficientKeys { .. }
            | EngineError::InsufficientBoxes { .. } => 400,
            EngineError::NotOwner { .. } => 403,
            EngineError::AccountNotFound(_)
            | EngineError::TaskNotFound(_)
            | EngineError::RecordNotFound(_) => 404,
            EngineError::SupplyExhausted | EngineError::AlreadyAttached { .. } => 409,
            EngineError::BridgeRejected(_) => 502,
            EngineError::Unavailable(_) | EngineError::StorageBusy(_) => 503,
            EngineError::InvalidRewardTable(_)
            | EngineError::InventoryInvariantViolated(_)
            | EngineError::Storage(_) => 500,
        }
    }

    /// The caller can fix this by changing the request or their account state
    pub fn is_client_actionable(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// The same request may succeed if tried again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Unavailable(_) | EngineError::StorageBusy(_)
        )
    }
}

/// sqlite reports writer contention as SQLITE_BUSY / SQLITE_LOCKED
fn is_contention(err: &DbErr) -> bool {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        return true;
    }
    let message = err.to_string();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("(code: 5)")
        || message.contains("(code: 6)")
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        if is_contention(&err) {
            EngineError::StorageBusy(err.to_string())
        } else {
            EngineError::Storage(err.to_string())
        }
    }
}

impl From<campaign_database::Error> for EngineError {
    fn from(err: campaign_database::Error) -> Self {
        match err {
            campaign_database::Error::SeaOrm(err) => err.into(),
            campaign_database::Error::Io(err) => EngineError::Storage(err.to_string()),
        }
    }
}

impl From<WalletAddressError> for EngineError {
    fn from(err: WalletAddressError) -> Self {
        EngineError::InvalidRequest(err.to_string())
    }
}

impl From<AccountError> for EngineError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::AccountNotFound(account) => EngineError::AccountNotFound(account),
            AccountError::InsufficientKeys {
                required,
                available,
            } => EngineError::InsufficientKeys {
                required,
                available,
            },
            AccountError::InsufficientBoxes {
                required,
                available,
            } => EngineError::InsufficientBoxes {
                required,
                available,
            },
            AccountError::NotOwner { token_id } => EngineError::NotOwner { token_id },
            AccountError::AmountOutOfRange(_) => EngineError::InvalidRequest(err.to_string()),
            AccountError::SeaOrm(err) => err.into(),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::TaskNotFound(task_id) => EngineError::TaskNotFound(task_id),
            LedgerError::NotNftTask(_)
            | LedgerError::HoldingsRequired(_)
            | LedgerError::InvalidDefinition { .. } => {
                EngineError::InvalidRequest(err.to_string())
            }
            LedgerError::Account(err) => err.into(),
            LedgerError::SeaOrm(err) => err.into(),
        }
    }
}

impl From<InventoryError> for EngineError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotInitialized | InventoryError::SupplyExhausted => {
                EngineError::SupplyExhausted
            }
            InventoryError::InvariantViolated { .. } => {
                EngineError::InventoryInvariantViolated(err.to_string())
            }
            InventoryError::Account(err) => err.into(),
            InventoryError::SeaOrm(err) => err.into(),
        }
    }
}

impl From<RewardTableError> for EngineError {
    fn from(err: RewardTableError) -> Self {
        match err {
            RewardTableError::SeaOrm(err) => err.into(),
            other => EngineError::InvalidRewardTable(other.to_string()),
        }
    }
}

impl From<RecordError> for EngineError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::RecordNotFound(record_id) => EngineError::RecordNotFound(record_id),
            RecordError::AlreadyAttached { record_id, tx_hash } => {
                EngineError::AlreadyAttached { record_id, tx_hash }
            }
            RecordError::InvalidTxHash(_) => EngineError::InvalidRequest(err.to_string()),
            RecordError::Account(err) => err.into(),
            RecordError::Json(err) => EngineError::Storage(err.to_string()),
            RecordError::SeaOrm(err) => err.into(),
        }
    }
}

impl From<BridgeError> for EngineError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotTokenOwner { token_id, .. } => EngineError::NotOwner { token_id },
            BridgeError::Rejected(_) | BridgeError::UnknownToken { .. } => {
                EngineError::BridgeRejected(err.to_string())
            }
            BridgeError::Timeout(_)
            | BridgeError::Unavailable(_)
            | BridgeError::RetriesExhausted { .. } => EngineError::Unavailable(err.to_string()),
        }
    }
}
