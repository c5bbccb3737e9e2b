use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),
    #[error("Credential error: {0}")]
    Credential(String),
}
