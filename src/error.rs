use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Buffer of {0} bytes is not a whole number of records")]
    Misaligned(usize),

    #[error("Store connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    #[error("Batch write to {table} failed after {attempts} attempt(s): {source}")]
    WriteFailed {
        table: String,
        attempts: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("Timestamp {0} does not fit a BIGINT column")]
    TimestampOutOfRange(u64),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
