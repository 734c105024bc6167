use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw on-disk record
// ---------------------------------------------------------------------------

/// One intraday record as laid out in a `.scid` file (40 bytes, little-endian).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRecord {
    /// Exchange timestamp, microseconds since the file's epoch.
    pub scdatetime: u64,
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
    pub numtrades: u32,
    pub totalvolume: u32,
    pub bidvolume: u32,
    pub askvolume: u32,
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub last_position: u64,
    #[serde(default)]
    pub initial_load_done: bool,
}

// ---------------------------------------------------------------------------
// Pass lifecycle
// ---------------------------------------------------------------------------

/// Where a single ingestion pass currently is. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Connecting,
    CheckpointLoaded,
    Decoding,
    NoNewData,
    Transforming,
    Loading,
    CheckpointSaved,
    Disconnected,
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PassState::Idle => "idle",
            PassState::Connecting => "connecting",
            PassState::CheckpointLoaded => "checkpoint_loaded",
            PassState::Decoding => "decoding",
            PassState::NoNewData => "no_new_data",
            PassState::Transforming => "transforming",
            PassState::Loading => "loading",
            PassState::CheckpointSaved => "checkpoint_saved",
            PassState::Disconnected => "disconnected",
        };
        write!(f, "{s}")
    }
}

/// Result of one completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing new past the checkpoint.
    NoNewData { position: u64 },
    /// `rows` records written and the checkpoint moved from `from` to `to`.
    Loaded { rows: usize, from: u64, to: u64 },
}
