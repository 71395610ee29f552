use hiibox_engine::{EngineError, WalletAddressError, campaign_database};
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] hiibox_csvs::CsvError),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] campaign_database::Error),

    #[error("Invalid wallet address: {0}")]
    InvalidWallet(#[from] WalletAddressError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Audit failed: {0}")]
    AuditFailed(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
