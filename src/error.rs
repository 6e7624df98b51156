use thiserror::Error;

/// Failures raised by the settings and correction stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored value could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database lock poisoned")]
    Poisoned,
    #[error("blocking database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("failed to persist correction: {0}")]
    Store(#[from] StoreError),
}

/// Outbound delivery failures. The remote error text is kept verbatim.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid snowflake '{0}'")]
    InvalidId(String),
    #[error("discord rejected the message: {0}")]
    Discord(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Correction(#[from] CorrectionError),
}
