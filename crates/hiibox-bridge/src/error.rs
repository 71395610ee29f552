use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors reported by an on-chain box ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Chain request timed out: {0}")]
    Timeout(String),

    #[error("Chain node unavailable: {0}")]
    Unavailable(String),

    #[error("Chain rejected the request: {0}")]
    Rejected(String),

    #[error("Unknown box token {token_id}")]
    UnknownToken { token_id: u64 },

    #[error("Box token {token_id} is not owned by {owner}")]
    NotTokenOwner { owner: String, token_id: u64 },

    #[error("Chain request failed after {retries} retries: {last_error}")]
    RetriesExhausted { retries: usize, last_error: String },
}

impl BridgeError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Timeout(_) | BridgeError::Unavailable(_))
    }
}
