//! Reconciliation of selection state against new record deliveries.
//!
//! Every delivery is treated as the authoritative record set. The hierarchy
//! is rebuilt from scratch and the previous selection domains are re-keyed
//! onto it by `(hash, size)`; pairs that are no longer in a live group are
//! dropped. An orphaned domain keeps every pair until its group returns. The
//! result is a fresh [`ReviewState`] that the owner swaps in whole, so a
//! reconciliation is never partially applied.

use std::collections::BTreeMap;

use tracing::{info, warn};

use dupegrid_core::{ConfigError, DomainKey, FileRecord, Ino, ReviewConfig, SelectionError};

use crate::filter::RecordFilter;
use crate::grouping::{Hierarchy, build};
use crate::selection::{SelectionSnapshot, Selections};

/// A hierarchy together with the selections attached to it.
#[derive(Debug, Clone, Default)]
pub struct ReviewState {
    /// Number of reconciliations that produced this state.
    pub generation: u64,
    /// The grouped view of the current record set.
    pub hierarchy: Hierarchy,
    /// Selection domains, including orphaned ones.
    pub selections: Selections,
}

impl ReviewState {
    /// An empty state with no records and no selections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an initial state from one record set.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a FileRecord>,
        filter: &RecordFilter,
    ) -> Self {
        Self {
            generation: 0,
            hierarchy: build(records, filter),
            selections: Selections::new(),
        }
    }

    /// Key of the group owning an inode.
    pub fn owner_of(&self, ino: Ino) -> Option<&DomainKey> {
        self.hierarchy.owner_of(ino)
    }

    /// Mark a pair as its group's original.
    pub fn set_original(
        &mut self,
        key: &DomainKey,
        ino: Ino,
        path: &str,
    ) -> Result<(), SelectionError> {
        self.selections.set_original(&self.hierarchy, key, ino, path)
    }

    /// Flip the delete mark of a pair. Returns the new mark.
    pub fn toggle_delete(
        &mut self,
        key: &DomainKey,
        ino: Ino,
        path: &str,
    ) -> Result<bool, SelectionError> {
        self.selections.toggle_delete(&self.hierarchy, key, ino, path)
    }

    /// Mark every non-original pair of a group for deletion.
    pub fn mark_group_delete(&mut self, key: &DomainKey) -> Result<usize, SelectionError> {
        self.selections.mark_group_delete(&self.hierarchy, key)
    }

    /// Read-only view of a group's selections.
    pub fn snapshot(&self, key: &DomainKey) -> SelectionSnapshot {
        self.selections.snapshot(key)
    }

    /// Check if every non-original pair of a group is marked for deletion.
    pub fn is_all_set(&self, key: &DomainKey) -> bool {
        self.selections.is_all_set(&self.hierarchy, key)
    }
}

/// What happened to the previous selection domains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Domains whose group still exists.
    pub carried: usize,
    /// Domains whose group dropped below two inodes in this pass.
    pub orphaned: usize,
    /// Orphaned domains whose group came back.
    pub revived: usize,
    /// Domains whose key no longer has any hashed record.
    pub discarded: usize,
    /// Orphaned domains dropped after their grace period.
    pub collected: usize,
    /// Selections dropped because their pair is not in the live group.
    pub dropped: usize,
}

/// Merges record deliveries into a [`ReviewState`].
#[derive(Debug, Clone)]
pub struct Reconciler {
    filter: RecordFilter,
    orphan_grace: u64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            filter: RecordFilter::new(),
            orphan_grace: u64::from(ReviewConfig::default().orphan_grace),
        }
    }
}

impl Reconciler {
    /// Create a reconciler with the given filter and orphan grace period.
    pub fn new(filter: RecordFilter, orphan_grace: u32) -> Self {
        Self {
            filter,
            orphan_grace: u64::from(orphan_grace),
        }
    }

    /// Create a reconciler from configuration.
    pub fn from_config(config: &ReviewConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(RecordFilter::from_config(config)?, config.orphan_grace))
    }

    /// The filter applied before grouping.
    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    /// Build the next state from the previous one and a full delivery.
    pub fn reconcile<'a>(
        &self,
        previous: &ReviewState,
        records: impl IntoIterator<Item = &'a FileRecord>,
    ) -> (ReviewState, ReconcileReport) {
        let generation = previous.generation + 1;
        let hierarchy = build(records, &self.filter);
        let mut report = ReconcileReport::default();

        let known = &previous.hierarchy.warnings;
        for warning in hierarchy.warnings.iter().filter(|w| !known.contains(*w)) {
            warn!(ino = %warning.ino, kind = ?warning.kind, "{}", warning.message);
        }

        let mut domains = BTreeMap::new();
        for (key, domain) in previous.selections.iter() {
            let mut domain = domain.clone();

            if let Some(group) = hierarchy.group(key) {
                report.dropped += domain.retain(|pair| group.contains_pair(pair));
                if domain.revive() {
                    report.revived += 1;
                }
                report.carried += 1;
            } else if hierarchy.unmatched_record(key).is_some() {
                // Pairs stay frozen until the group revives or is collected
                let since = domain.mark_orphaned(generation);
                if generation - since >= self.orphan_grace {
                    report.collected += 1;
                    continue;
                }
                if since == generation {
                    report.orphaned += 1;
                }
            } else {
                report.discarded += 1;
                continue;
            }

            domains.insert(key.clone(), domain);
        }

        info!(
            generation,
            groups = hierarchy.group_count(),
            pending = hierarchy.pending.len(),
            carried = report.carried,
            orphaned = report.orphaned,
            revived = report.revived,
            discarded = report.discarded,
            collected = report.collected,
            dropped = report.dropped,
            "Reconciled delivery"
        );

        let state = ReviewState {
            generation,
            hierarchy,
            selections: Selections::from_domains(domains),
        };
        (state, report)
    }
}
