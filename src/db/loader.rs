use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection};
use tracing::warn;

use crate::config::{INSERT_CHUNK_ROWS, RETRY_BACKOFF_MS};
use crate::db::models::TickRow;
use crate::error::{AppError, Result};

/// Writes transformed ticks into the destination SQLite database.
///
/// A fresh connection is opened per pass. Both connect and write are retried
/// with the delays in `backoff` before the error is surfaced.
pub struct SqliteLoader {
    options: SqliteConnectOptions,
    backoff: &'static [u64],
}

impl SqliteLoader {
    pub fn new(db_url: &str, create_if_missing: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(db_url)
            .map_err(AppError::ConnectionFailed)?
            .create_if_missing(create_if_missing);
        Ok(Self { options, backoff: RETRY_BACKOFF_MS })
    }

    #[cfg(test)]
    pub fn with_backoff(mut self, backoff: &'static [u64]) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn connect(&self) -> Result<SqliteConnection> {
        let mut attempt = 0usize;
        loop {
            match SqliteConnection::connect_with(&self.options).await {
                Ok(conn) => return Ok(conn),
                Err(e) => match self.backoff.get(attempt) {
                    Some(&delay_ms) => {
                        warn!(attempt = attempt + 1, "Store connect failed, retrying in {delay_ms}ms: {e}");
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        attempt += 1;
                    }
                    None => return Err(AppError::ConnectionFailed(e)),
                },
            }
        }
    }

    /// Insert all rows inside one transaction. Either every row lands or none do.
    pub async fn write(&self, conn: &mut SqliteConnection, table: &str, rows: &[TickRow]) -> Result<()> {
        let mut attempt = 0usize;
        loop {
            match write_batch(conn, table, rows).await {
                Ok(()) => return Ok(()),
                Err(e) => match self.backoff.get(attempt) {
                    Some(&delay_ms) => {
                        warn!(
                            table,
                            rows = rows.len(),
                            attempt = attempt + 1,
                            "Batch write failed, retrying in {delay_ms}ms: {e}"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        attempt += 1;
                    }
                    None => {
                        return Err(AppError::WriteFailed {
                            table: table.to_string(),
                            attempts: attempt + 1,
                            source: e,
                        });
                    }
                },
            }
        }
    }

    pub async fn close(&self, conn: SqliteConnection) {
        if let Err(e) = conn.close().await {
            warn!("Store disconnect error: {e}");
        }
    }
}

async fn write_batch(conn: &mut SqliteConnection, table: &str, rows: &[TickRow]) -> sqlx::Result<()> {
    let mut tx = conn.begin().await?;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!(r#"INSERT INTO "{table}" (scdatetime, price, quantity, side) "#));
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.scdatetime)
                .push_bind(row.price)
                .push_bind(row.quantity)
                .push_bind(row.side);
        });
        qb.build().execute(&mut *tx).await?;
    }
    tx.commit().await
}
