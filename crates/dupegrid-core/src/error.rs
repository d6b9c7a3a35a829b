//! Error and warning types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{DomainKey, Ino, PathKey};

/// Errors that make a single raw record unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record carries no inode number.
    #[error("Record is missing an inode number")]
    MissingIno,

    /// A required field is absent.
    #[error("Record {ino} is missing field {field}")]
    MissingField { ino: String, field: &'static str },

    /// A field could not be coerced to its numeric type.
    #[error("Invalid {field} {value:?} in record {ino}")]
    InvalidField {
        ino: String,
        field: &'static str,
        value: String,
    },

    /// The record lists no paths.
    #[error("Record {ino} lists no paths")]
    NoPaths { ino: Ino },

    /// The record reports a link count of zero.
    #[error("Record {ino} reports a link count of zero")]
    ZeroLinks { ino: Ino },
}

impl RecordError {
    /// Create an invalid field error.
    pub fn invalid(ino: impl Into<String>, field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidField {
            ino: ino.into(),
            field,
            value: value.into(),
        }
    }
}

/// Errors from selection actions.
///
/// None of these are fatal; a rejected action leaves the selection state as
/// it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The pair is not a member of the group's current hierarchy.
    #[error("Invalid selection: {pair} is not a member of group {key}")]
    InvalidSelection { key: DomainKey, pair: PathKey },

    /// No duplicate group currently owns the pair.
    #[error("Invalid selection: {pair} does not belong to any duplicate group")]
    Unowned { pair: PathKey },

    /// The group does not exist in the current hierarchy.
    #[error("Unknown duplicate group {key}")]
    UnknownGroup { key: DomainKey },

    /// The pair is marked as original and cannot be marked for deletion.
    #[error("{pair} is the original of group {key}; clear it before marking it for deletion")]
    OriginalLocked { key: DomainKey, pair: PathKey },
}

impl SelectionError {
    /// Check if the action referenced state that no longer exists.
    ///
    /// Stale actions are expected after a reconciliation; callers drop them
    /// and re-render.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::InvalidSelection { .. } | Self::Unowned { .. } | Self::UnknownGroup { .. }
        )
    }
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value failed validation.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Kind of data-integrity warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// Reported link count disagrees with the number of listed paths.
    LinkCountMismatch,
    /// Link count above one but only a single path listed.
    UnresolvedLinks,
    /// The same path was listed twice for one inode.
    DuplicatePath,
    /// The same inode was delivered twice in one snapshot.
    DuplicateIno,
}

/// Non-fatal data-integrity warning about one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityWarning {
    /// Inode the warning is about.
    pub ino: Ino,
    /// Kind of warning.
    pub kind: WarningKind,
    /// Human-readable message.
    pub message: String,
}

impl IntegrityWarning {
    /// Create a new integrity warning.
    pub fn new(ino: Ino, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            ino,
            kind,
            message: message.into(),
        }
    }

    /// Create a link count mismatch warning.
    pub fn link_count_mismatch(ino: Ino, nlink: u32, paths: usize) -> Self {
        Self::new(
            ino,
            WarningKind::LinkCountMismatch,
            format!("Inode {ino} reports nlink {nlink} but lists {paths} path(s)"),
        )
    }

    /// Create an unresolved links warning.
    pub fn unresolved_links(ino: Ino, nlink: u32) -> Self {
        Self::new(
            ino,
            WarningKind::UnresolvedLinks,
            format!("Inode {ino} reports nlink {nlink} but only one path is known"),
        )
    }

    /// Create a duplicate path warning.
    pub fn duplicate_path(ino: Ino, path: &str) -> Self {
        Self::new(
            ino,
            WarningKind::DuplicatePath,
            format!("Inode {ino} lists {path} more than once"),
        )
    }

    /// Create a duplicate inode warning.
    pub fn duplicate_ino(ino: Ino) -> Self {
        Self::new(
            ino,
            WarningKind::DuplicateIno,
            format!("Inode {ino} delivered more than once; keeping the last record"),
        )
    }
}
