use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ReleaseNotifierError, Result};
use crate::types::Snapshot;

/// Loads and saves the last-seen release snapshot as a JSON file.
///
/// The whole map is rewritten on every save; there is no incremental update.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot. A missing file yields an empty snapshot (first run).
    pub fn load(&self) -> Result<Snapshot> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no snapshot found, starting fresh");
                return Ok(Snapshot::new());
            }
            Err(source) => {
                return Err(ReleaseNotifierError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Snapshot::new());
        }

        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|source| {
            ReleaseNotifierError::CorruptSnapshot {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!(entries = snapshot.len(), "loaded snapshot");
        Ok(snapshot)
    }

    /// Writes the complete snapshot, replacing the previous file.
    ///
    /// The content goes to a sibling temp file first and is renamed into place,
    /// so a failed write never leaves a truncated snapshot behind.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");

        let persist = |source| ReleaseNotifierError::Persistence {
            path: self.path.clone(),
            source,
        };
        fs::write(&tmp, content).map_err(persist)?;
        fs::rename(&tmp, &self.path).map_err(persist)?;

        debug!(entries = snapshot.len(), path = %self.path.display(), "saved snapshot");
        Ok(())
    }
}
