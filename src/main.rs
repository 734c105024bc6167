mod config;
mod db;
mod error;
mod scid;
mod state;
mod sync;
mod transform;
mod types;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::schema::ensure_table;
use crate::db::SqliteLoader;
use crate::error::Result;
use crate::state::CheckpointStore;
use crate::sync::SyncTask;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let loader = SqliteLoader::new(&cfg.db_url(), cfg.create_table)?;

    // --- Optional one-time DDL ---
    if cfg.create_table {
        let mut conn = loader.connect().await?;
        ensure_table(&mut conn, &cfg.table_name).await?;
        loader.close(conn).await;
    }

    let checkpoints = CheckpointStore::new(&cfg.checkpoint_path);
    info!(
        source = %cfg.table_name,
        file = %cfg.scid_file.display(),
        db = %cfg.db_path,
        checkpoint = %checkpoints.path().display(),
        poll_ms = cfg.poll_interval.as_millis() as u64,
        "Syncing {} into {} every {}ms",
        cfg.scid_file.display(),
        cfg.table_name,
        cfg.poll_interval.as_millis(),
    );

    let task = SyncTask::new(&cfg, checkpoints, loader)?;

    // --- Shutdown on Ctrl-C, checked between passes ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, finishing current pass");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("Ctrl-C handler unavailable, running until killed: {e}");
                std::future::pending::<()>().await;
            }
        }
    });

    task.run(shutdown_rx).await;
    Ok(())
}
