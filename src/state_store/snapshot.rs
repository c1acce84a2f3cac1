//! Snapshot persistence for the sequence store
//!
//! On shutdown the live store entries are written to
//! `<data_dir>/snapshots/latest.jsonl`; the previous snapshot is kept as
//! `previous.jsonl`. The first line holds metadata, every following line
//! one `StoreEntry`.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::store::StoreEntry;
use crate::utils::{atomic_write_with, cleanup_temp_files, current_millis};

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while reading or writing snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot corrupted: {0}")]
    Corrupted(String),
}

/// Snapshot metadata - first line in snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Always "snapshot_meta" to identify this as metadata
    #[serde(rename = "type")]
    pub meta_type: String,

    /// Wall-clock time the snapshot was written (epoch millis)
    pub created_at: i64,

    /// Number of store entries in the snapshot
    pub entry_count: usize,

    /// Version of snapshot format
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl SnapshotMeta {
    pub fn new(entry_count: usize) -> Self {
        Self {
            meta_type: "snapshot_meta".to_string(),
            created_at: current_millis(),
            entry_count,
            version: 1,
        }
    }
}

/// Writes and loads store snapshots below a data directory
pub struct SnapshotManager {
    data_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn latest_path(&self) -> PathBuf {
        self.snapshots_dir().join("latest.jsonl")
    }

    pub fn previous_path(&self) -> PathBuf {
        self.snapshots_dir().join("previous.jsonl")
    }

    pub fn snapshot_exists(&self) -> bool {
        self.latest_path().exists()
    }

    /// Write `entries` as the latest snapshot, keeping the old one as backup
    pub fn save(&self, entries: &[StoreEntry]) -> SnapshotResult<SnapshotMeta> {
        let meta = SnapshotMeta::new(entries.len());
        let meta_line = serde_json::to_string(&meta)?;
        let lines = entries
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        atomic_write_with(self.latest_path(), Some(self.previous_path()), |file| {
            writeln!(file, "{}", meta_line)?;
            for line in &lines {
                writeln!(file, "{}", line)?;
            }
            Ok(())
        })?;

        info!(entries = entries.len(), path = %self.latest_path().display(), "store snapshot written");
        Ok(meta)
    }

    /// Load the latest snapshot, `None` if there is none
    pub fn load(&self) -> SnapshotResult<Option<(SnapshotMeta, Vec<StoreEntry>)>> {
        cleanup_temp_files(self.snapshots_dir())?;

        let path = self.latest_path();
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut lines = reader.lines();

        let meta_line = lines
            .next()
            .ok_or_else(|| SnapshotError::Corrupted("empty snapshot file".to_string()))??;
        let meta: SnapshotMeta = serde_json::from_str(&meta_line)
            .map_err(|e| SnapshotError::Corrupted(format!("metadata: {}", e)))?;

        let mut entries = Vec::with_capacity(meta.entry_count);
        for (line_num, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: StoreEntry = serde_json::from_str(&line).map_err(|e| {
                SnapshotError::Corrupted(format!("line {}: {}", line_num + 2, e))
            })?;
            entries.push(entry);
        }

        if entries.len() != meta.entry_count {
            warn!(
                expected = meta.entry_count,
                found = entries.len(),
                "snapshot entry count mismatch"
            );
        }

        Ok(Some((meta, entries)))
    }
}
