//! Infrastructure error types.
//!
//! These errors describe failures of the collaborators behind the data-flow service (the
//! relational store, the messaging queue, startup configuration). They never reach callers
//! of the service directly: the service maps them onto an
//! [`ErrorRepresentation`](crate::error_representation::ErrorRepresentation).

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no matching record: {0}")]
    NotFound(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
    #[error("store connection lock was poisoned")]
    LockPoisoned,
    #[error("blocking store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("messaging queue is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
