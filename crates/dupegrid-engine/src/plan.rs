//! Deletion plans derived from the current selections.
//!
//! A plan is data only. It lists the pairs the user queued for deletion,
//! each resolved against the original kept for its group; nothing here
//! touches the filesystem.

use compact_str::CompactString;
use serde::Serialize;

use dupegrid_core::{DomainKey, Ino};

use crate::reconcile::ReviewState;

/// One path queued for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// Inode of the path to delete.
    pub ino: Ino,
    /// Path to delete.
    pub path: CompactString,
    /// Path kept as the group's original.
    pub original: CompactString,
    /// Size of the file in bytes.
    pub size: u64,
}

/// A group whose delete marks cannot be planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlanFailure {
    /// Paths are marked for deletion but no original is kept.
    NoOriginal {
        /// Group identity.
        key: DomainKey,
        /// Number of delete marks in the group.
        deletes: usize,
    },
}

impl std::fmt::Display for PlanFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOriginal { key, deletes } => write!(
                f,
                "Group {key} has {deletes} paths marked for deletion but no original"
            ),
        }
    }
}

/// Everything the user has queued for deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    /// Planned deletions in display order.
    pub entries: Vec<PlanEntry>,
    /// Groups skipped because they cannot be planned.
    pub failures: Vec<PlanFailure>,
    /// Bytes freed once every entry is deleted.
    ///
    /// An inode counts only when all of its paths are queued; deleting some
    /// links of a hardlinked file frees nothing.
    pub reclaimable_bytes: u64,
}

impl DeletionPlan {
    /// Build a plan from the delete marks of every live group.
    pub fn from_state(state: &ReviewState) -> Self {
        let mut plan = Self::default();

        for group in &state.hierarchy.groups {
            let snapshot = state.snapshot(&group.key);
            if snapshot.deletes.is_empty() {
                continue;
            }

            let Some(original) = snapshot.original else {
                plan.failures.push(PlanFailure::NoOriginal {
                    key: group.key.clone(),
                    deletes: snapshot.deletes.len(),
                });
                continue;
            };

            for inode in &group.inodes {
                let mut all_queued = true;
                for entry in &inode.paths {
                    if snapshot.deletes.contains(&entry.key()) {
                        plan.entries.push(PlanEntry {
                            ino: entry.ino,
                            path: entry.path.clone(),
                            original: original.path.clone(),
                            size: group.size(),
                        });
                    } else {
                        all_queued = false;
                    }
                }
                if all_queued {
                    plan.reclaimable_bytes += group.size();
                }
            }
        }

        plan
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.failures.is_empty()
    }

    /// Check if every group with delete marks could be planned.
    pub fn is_ready(&self) -> bool {
        self.failures.is_empty()
    }

    /// Get a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("{} paths queued for deletion", self.entries.len())
        } else {
            format!(
                "{} paths queued for deletion, {} groups without an original",
                self.entries.len(),
                self.failures.len()
            )
        }
    }
}
