//! Core types and traits for dupegrid.
//!
//! This crate provides the fundamental data structures shared by the record
//! store adapter, the grouping engine and the presentation layer: inode
//! records, group and pair keys, error types and configuration.

mod config;
mod error;
mod record;

pub use config::{ReviewConfig, ReviewConfigBuilder};
pub use error::{ConfigError, IntegrityWarning, RecordError, SelectionError, WarningKind};
pub use record::{ContentHash, DomainKey, FileRecord, Ino, PathKey};
