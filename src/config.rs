use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Fixed prefix of every `.scid` file. Never decoded.
pub const SCID_HEADER_SIZE: u64 = 56;

/// Size of one intraday record on disk.
pub const SCID_RECORD_SIZE: u64 = 40;

/// Default pause between polling passes (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 1_000;

/// Backoff before each retry of a store connect or batch write, in milliseconds.
/// Attempts = len + 1; the error surfaces after the last entry is used up.
pub const RETRY_BACKOFF_MS: &[u64] = &[100, 200, 400, 800];

/// Rows per INSERT statement. 4 binds per row keeps this well under SQLite's
/// host-parameter limit.
pub const INSERT_CHUNK_ROWS: usize = 1_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the instrument's `.scid` file (SCID_FILE)
    pub scid_file: PathBuf,
    /// Destination table and checkpoint key (TABLE_NAME)
    pub table_name: String,
    pub db_path: String,
    pub checkpoint_path: PathBuf,
    pub poll_interval: Duration,
    /// Start the first pass from the header unless the checkpoint says it was done (INITIAL_LOAD)
    pub initial_load: bool,
    /// Run CREATE TABLE IF NOT EXISTS before the first pass (CREATE_TABLE)
    pub create_table: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let table_name = std::env::var("TABLE_NAME")
            .map_err(|_| AppError::Config("TABLE_NAME must be set".to_string()))?;
        validate_table_name(&table_name)?;

        Ok(Self {
            scid_file: std::env::var("SCID_FILE")
                .map(PathBuf::from)
                .map_err(|_| AppError::Config("SCID_FILE must be set".to_string()))?,
            table_name,
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "scid.db".to_string()),
            checkpoint_path: std::env::var("CHECKPOINT_PATH")
                .unwrap_or_else(|_| "checkpoint.json".to_string())
                .into(),
            poll_interval: Duration::from_millis(
                std::env::var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| POLL_INTERVAL_MS.to_string())
                    .parse::<u64>()
                    .map_err(|_| {
                        AppError::Config("POLL_INTERVAL_MS must be a whole number".to_string())
                    })?,
            ),
            initial_load: parse_flag("INITIAL_LOAD", true)?,
            create_table: parse_flag("CREATE_TABLE", false)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn db_url(&self) -> String {
        format!("sqlite:{}", self.db_path)
    }
}

fn parse_flag(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(AppError::Config(format!("{name} must be true or false, got {v:?}"))),
        },
    }
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidTableName(name.to_string()))
    }
}
