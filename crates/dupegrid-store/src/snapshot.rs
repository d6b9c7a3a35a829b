//! Snapshot files: store deliveries captured as JSON.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::raw::RawRecord;

/// Errors loading a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read.
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a record array or an array of record arrays.
    #[error("Failed to parse snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Deliveries(Vec<Vec<RawRecord>>),
    Single(Vec<RawRecord>),
}

fn read(path: &Path) -> Result<SnapshotFile, SnapshotError> {
    let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load one delivery. A multi-delivery file yields its last delivery.
pub fn load_snapshot(path: &Path) -> Result<Vec<RawRecord>, SnapshotError> {
    Ok(match read(path)? {
        SnapshotFile::Single(records) => records,
        SnapshotFile::Deliveries(mut deliveries) => deliveries.pop().unwrap_or_default(),
    })
}

/// Load a sequence of deliveries. A single-delivery file yields one delivery.
pub fn load_deliveries(path: &Path) -> Result<Vec<Vec<RawRecord>>, SnapshotError> {
    Ok(match read(path)? {
        SnapshotFile::Single(records) => vec![records],
        SnapshotFile::Deliveries(deliveries) => deliveries,
    })
}
