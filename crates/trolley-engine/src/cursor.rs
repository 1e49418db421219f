//! Durable iteration checkpoint.
//!
//! A single integer on disk: the index of the next address record to
//! attempt. Read once at run start, written once per completed iteration.
//! Persistence faults are never fatal — a missing or corrupt file loads
//! as 0, a failed write only loses resumability.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Environment override for the checkpoint location.
pub const STATE_PATH_ENV: &str = "TROLLEY_STATE_PATH";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(default)]
    last_index: u64,
}

pub struct PersistentCursor {
    path: PathBuf,
}

impl PersistentCursor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Resolve the storage location: `TROLLEY_STATE_PATH` wins over the
    /// configured path.
    pub fn from_config(path: &Path) -> Self {
        match std::env::var(STATE_PATH_ENV) {
            Ok(p) if !p.is_empty() => Self::new(p),
            _ => Self::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last saved index, or 0 when no prior state exists or the stored
    /// state is unreadable.
    pub fn load(&self) -> u64 {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<CheckpointFile>(&raw) {
                Ok(state) => {
                    debug!(index = state.last_index, path = %self.path.display(), "Loaded checkpoint");
                    state.last_index
                }
                Err(e) => {
                    warn!(path = %self.path.display(), "Checkpoint is corrupt ({e}), starting from 0");
                    0
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                warn!(path = %self.path.display(), "Could not read checkpoint ({e}), starting from 0");
                0
            }
        }
    }

    /// Durably write `index`, creating missing parent directories. The
    /// in-memory index stays authoritative when the write fails.
    pub fn save(&self, index: u64) {
        match self.try_save(index) {
            Ok(()) => debug!(index, path = %self.path.display(), "Saved checkpoint"),
            Err(e) => error!(index, path = %self.path.display(), "Could not save checkpoint: {e}"),
        }
    }

    fn try_save(&self, index: u64) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let body = serde_json::to_string_pretty(&CheckpointFile { last_index: index })?;
        std::fs::write(&self.path, body)
    }
}
