use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::Checkpoint;

/// JSON-file checkpoint store keyed by source name.
///
/// File shape: `{"esm24": {"last_position": 4056, "initial_load_done": true}, ...}`.
/// Each `save` upserts one key and carries the other entries over unchanged,
/// malformed ones included. Writes go to a sibling `.tmp` file
/// that is then renamed over the real one.
pub struct CheckpointStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles from tasks in this process.
    lock: Mutex<()>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checkpoint for `source`, or the zero checkpoint if the file is missing,
    /// unparseable, or has no well-formed entry for it.
    pub async fn load(&self, source: &str) -> Result<Checkpoint> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        let Some(entry) = all.remove(source) else {
            return Ok(Checkpoint::default());
        };
        match serde_json::from_value(entry) {
            Ok(cp) => Ok(cp),
            Err(e) => {
                warn!(source, path = %self.path.display(), "Checkpoint entry is corrupt, starting over: {e}");
                Ok(Checkpoint::default())
            }
        }
    }

    pub async fn save(&self, source: &str, last_position: u64, initial_load_done: bool) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(
            source.to_string(),
            serde_json::to_value(Checkpoint { last_position, initial_load_done })?,
        );

        let body = serde_json::to_vec_pretty(&all)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(source, last_position, initial_load_done, "Checkpoint saved");
        Ok(())
    }

    /// Raw entries by source. Entries are validated one at a time in `load`.
    async fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(all) => Ok(all),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "Checkpoint file is corrupt, starting over: {e}"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
