//! Record store adapter for dupegrid.
//!
//! The external store holds one entity per inode with every field encoded as
//! a string and the path list joined by a delimiter. This crate turns those
//! entities into [`FileRecord`]s and keeps the current record set:
//!
//! - **Parsing** - coerce numeric fields, split the path list, reject
//!   malformed entities without aborting the batch
//! - **Record set** - ino-keyed, remembers first-seen order across deliveries
//! - **Snapshots** - load deliveries captured as JSON files
//!
//! ```rust,ignore
//! use dupegrid_store::{ingest, load_snapshot, RecordSet};
//!
//! let raws = load_snapshot("records.json".as_ref())?;
//! let batch = ingest(raws, '|');
//!
//! let mut records = RecordSet::new();
//! records.replace_all(batch.records);
//! println!("{} records, {} rejected", records.len(), batch.rejected.len());
//! ```

mod raw;
mod record_set;
mod snapshot;

pub use raw::{Ingested, RawPaths, RawRecord, Rejected, ingest, join_paths, parse, split_paths};
pub use record_set::{MoveOutcome, RecordSet, ReplaceSummary};
pub use snapshot::{SnapshotError, load_deliveries, load_snapshot};

// Re-export core types
pub use dupegrid_core::{FileRecord, Ino, IntegrityWarning, RecordError};
