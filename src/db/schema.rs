use sqlx::SqliteConnection;
use tracing::info;

use crate::config::validate_table_name;
use crate::error::Result;

/// One-time DDL for a destination table. Not part of a sync pass.
pub async fn ensure_table(conn: &mut SqliteConnection, table: &str) -> Result<()> {
    validate_table_name(table)?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{table}" (
            scdatetime BIGINT,
            price REAL,
            quantity INTEGER,
            side INTEGER
        )
        "#
    ))
    .execute(&mut *conn)
    .await?;
    info!(table, "Destination table ready");
    Ok(())
}
