use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::SqliteConnection;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::{validate_table_name, Config};
use crate::db::SqliteLoader;
use crate::error::Result;
use crate::scid;
use crate::state::CheckpointStore;
use crate::transform;
use crate::types::{PassOutcome, PassState};

/// Replicates one `.scid` file into its destination table, pass by pass.
pub struct SyncTask {
    /// Destination table name, also the checkpoint key.
    source: String,
    scid_file: PathBuf,
    poll_interval: Duration,
    initial_load: bool,
    checkpoints: Arc<CheckpointStore>,
    loader: SqliteLoader,
    /// Checkpoint offset as of the last successful load or save.
    last_position: AtomicU64,
}

impl SyncTask {
    pub fn new(cfg: &Config, checkpoints: Arc<CheckpointStore>, loader: SqliteLoader) -> Result<Self> {
        validate_table_name(&cfg.table_name)?;
        Ok(Self {
            source: cfg.table_name.clone(),
            scid_file: cfg.scid_file.clone(),
            poll_interval: cfg.poll_interval,
            initial_load: cfg.initial_load,
            checkpoints,
            loader,
            last_position: AtomicU64::new(0),
        })
    }

    /// Run passes until `shutdown` flips to true or its sender goes away.
    ///
    /// The first pass is the initial load when one is still owed. A failed pass
    /// is logged and retried on the next tick; the checkpoint makes that safe.
    /// A pass in flight always finishes before shutdown is honoured.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        match self.checkpoints.load(&self.source).await {
            Ok(cp) if self.initial_load && !cp.initial_load_done => {
                self.last_position.store(cp.last_position, Ordering::Relaxed);
                info!(source = %self.source, "Initial load starting from the file header");
            }
            Ok(cp) => {
                self.last_position.store(cp.last_position, Ordering::Relaxed);
                info!(source = %self.source, position = cp.last_position, "Resuming from checkpoint");
            }
            Err(e) => error!(source = %self.source, "Checkpoint unreadable: {e}"),
        }

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.pass(self.initial_load).await {
                error!(source = %self.source, "Sync pass failed: {e}");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(source = %self.source, "Sync loop stopped");
    }

    /// One ingestion pass: connect, decode past the checkpoint, load, save, disconnect.
    ///
    /// With `initial_load` set and the checkpoint not yet marked done, the saved
    /// offset is ignored and decoding restarts at the header.
    pub async fn pass(&self, initial_load: bool) -> Result<PassOutcome> {
        let started = Instant::now();
        self.enter(PassState::Connecting);
        let mut conn = self.loader.connect().await.inspect_err(|e| {
            error!(
                source = %self.source,
                position = self.last_known_position(),
                "Store unreachable, checkpoint stays at {}: {e}",
                self.last_known_position(),
            );
        })?;

        let result = self.pass_on(&mut conn, initial_load).await;

        self.loader.close(conn).await;
        self.enter(PassState::Disconnected);

        if let Ok(PassOutcome::Loaded { rows, from, to }) = &result {
            info!(
                source = %self.source,
                rows,
                from,
                to,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Loaded {rows} ticks in {:.2}s",
                started.elapsed().as_secs_f64(),
            );
        }
        self.enter(PassState::Idle);
        result
    }

    async fn pass_on(&self, conn: &mut SqliteConnection, initial_load: bool) -> Result<PassOutcome> {
        let mut checkpoint = self.checkpoints.load(&self.source).await?;
        self.last_position.store(checkpoint.last_position, Ordering::Relaxed);
        self.enter(PassState::CheckpointLoaded);
        if initial_load && !checkpoint.initial_load_done {
            checkpoint.last_position = 0;
        }

        self.enter(PassState::Decoding);
        let chunk = scid::read_from(&self.scid_file, checkpoint.last_position)
            .await
            .inspect_err(|e| {
                error!(
                    source = %self.source,
                    from = checkpoint.last_position,
                    file = %self.scid_file.display(),
                    "Decode failed: {e}"
                );
            })?;

        if chunk.records.is_empty() {
            self.enter(PassState::NoNewData);
            return Ok(PassOutcome::NoNewData { position: chunk.end });
        }

        self.enter(PassState::Transforming);
        let rows = transform::to_rows(&chunk.records).inspect_err(|e| {
            error!(source = %self.source, from = chunk.start, to = chunk.end, "Transform failed: {e}");
        })?;

        self.enter(PassState::Loading);
        self.loader
            .write(conn, &self.source, &rows)
            .await
            .inspect_err(|e| {
                error!(
                    source = %self.source,
                    from = chunk.start,
                    to = chunk.end,
                    rows = rows.len(),
                    "Load failed, checkpoint left at {}: {e}",
                    checkpoint.last_position,
                );
            })?;

        self.checkpoints
            .save(&self.source, chunk.end, true)
            .await
            .inspect_err(|e| {
                error!(
                    source = %self.source,
                    from = chunk.start,
                    to = chunk.end,
                    rows = rows.len(),
                    "Rows committed but checkpoint save failed, range will be re-sent: {e}"
                );
            })?;
        self.last_position.store(chunk.end, Ordering::Relaxed);
        self.enter(PassState::CheckpointSaved);

        Ok(PassOutcome::Loaded { rows: rows.len(), from: chunk.start, to: chunk.end })
    }

    pub fn last_known_position(&self) -> u64 {
        self.last_position.load(Ordering::Relaxed)
    }

    fn enter(&self, state: PassState) {
        debug!(source = %self.source, state = %state, "pass state");
    }
}
