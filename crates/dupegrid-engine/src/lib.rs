//! Grouping, selection and reconciliation for dupegrid.
//!
//! This crate turns a set of inode records into a reviewable hierarchy and
//! keeps the user's choices attached to it:
//!
//! - **Grouping** - Partition records by `(hash, size)` into duplicate groups
//! - **Selection** - One exclusive original plus a delete set per group
//! - **Reconciliation** - Carry selections across full rebuilds
//!
//! # Grouping
//!
//! A duplicate group needs at least two distinct inodes. Hardlinks of one
//! inode share storage, so they are never duplicates of each other:
//!
//! ```rust,ignore
//! use dupegrid_engine::{RecordFilter, build};
//!
//! let hierarchy = build(&records, &RecordFilter::new());
//! for group in &hierarchy.groups {
//!     println!("{}: {} inodes, {} paths", group.key, group.inode_count(), group.path_count());
//! }
//! ```
//!
//! # Reconciliation
//!
//! Each delivery is authoritative. The reconciler rebuilds the hierarchy and
//! keeps every selection whose pair still exists:
//!
//! ```rust,ignore
//! use dupegrid_engine::{Reconciler, ReviewState};
//!
//! let reconciler = Reconciler::default();
//! let (mut state, _) = reconciler.reconcile(&ReviewState::new(), &first);
//! state.set_original(&key, ino, "/mnt/user/share/single.txt")?;
//!
//! let (state, report) = reconciler.reconcile(&state, &second);
//! println!("Dropped {} stale selections", report.dropped);
//! ```

mod filter;
mod grouping;
mod plan;
mod reconcile;
mod selection;

pub use filter::RecordFilter;
pub use grouping::{DuplicateGroup, Hierarchy, InodeGroup, InodeKind, PathEntry, build};
pub use plan::{DeletionPlan, PlanEntry, PlanFailure};
pub use reconcile::{ReconcileReport, Reconciler, ReviewState};
pub use selection::{SelectionDomain, SelectionSnapshot, Selections};
