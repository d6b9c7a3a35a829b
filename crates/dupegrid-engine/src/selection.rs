//! Per-group selection state: one exclusive original plus a delete set.
//!
//! Selection is modelled per duplicate group, not per presentation row. Any
//! row referencing a pair (group header, inode row or path row) reads and
//! writes the same [`SelectionDomain`], so marking an original at one level
//! is immediately reflected at the others.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use dupegrid_core::{DomainKey, Ino, PathKey, SelectionError};

use crate::grouping::Hierarchy;

/// Selection state of one duplicate group.
///
/// Invariant: the original pair is never in the delete set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionDomain {
    original: Option<PathKey>,
    deletes: BTreeSet<PathKey>,
    orphaned_since: Option<u64>,
}

impl SelectionDomain {
    /// The pair marked as original, if any.
    pub fn original(&self) -> Option<&PathKey> {
        self.original.as_ref()
    }

    /// Pairs marked for deletion.
    pub fn deletes(&self) -> &BTreeSet<PathKey> {
        &self.deletes
    }

    /// Check if a pair is the original.
    pub fn is_original(&self, pair: &PathKey) -> bool {
        self.original.as_ref() == Some(pair)
    }

    /// Check if a pair is marked for deletion.
    pub fn is_delete(&self, pair: &PathKey) -> bool {
        self.deletes.contains(pair)
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.original.is_none() && self.deletes.is_empty()
    }

    /// Generation at which the group dropped below two inodes.
    pub fn orphaned_since(&self) -> Option<u64> {
        self.orphaned_since
    }

    fn set_original(&mut self, pair: PathKey) {
        self.deletes.remove(&pair);
        self.original = Some(pair);
    }

    pub(crate) fn mark_orphaned(&mut self, generation: u64) -> u64 {
        *self.orphaned_since.get_or_insert(generation)
    }

    pub(crate) fn revive(&mut self) -> bool {
        self.orphaned_since.take().is_some()
    }

    /// Drop every selection whose pair fails `keep`. Returns the number dropped.
    pub(crate) fn retain(&mut self, keep: impl Fn(&PathKey) -> bool) -> usize {
        let mut dropped = 0;
        if self.original.as_ref().is_some_and(|pair| !keep(pair)) {
            self.original = None;
            dropped += 1;
        }
        let before = self.deletes.len();
        self.deletes.retain(|pair| keep(pair));
        dropped + (before - self.deletes.len())
    }
}

/// Read-only view of one domain for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSnapshot {
    /// The pair marked as original, if any.
    pub original: Option<PathKey>,
    /// Pairs marked for deletion.
    pub deletes: BTreeSet<PathKey>,
}

impl SelectionSnapshot {
    /// Check if a pair is the original.
    pub fn is_original(&self, pair: &PathKey) -> bool {
        self.original.as_ref() == Some(pair)
    }

    /// Check if a pair is marked for deletion.
    pub fn is_delete(&self, pair: &PathKey) -> bool {
        self.deletes.contains(pair)
    }
}

/// Selection domains for every duplicate group, keyed by `(hash, size)`.
///
/// Domains are created lazily on the first action against a group and
/// outlive hierarchy rebuilds.
#[derive(Debug, Clone, Default)]
pub struct Selections {
    domains: BTreeMap<DomainKey, SelectionDomain>,
}

/// Resolve a pair that must be a current member of the group.
fn member(
    hierarchy: &Hierarchy,
    key: &DomainKey,
    ino: Ino,
    path: &str,
) -> Result<PathKey, SelectionError> {
    let pair = PathKey::new(ino, path);
    if hierarchy.contains(key, ino, path) {
        Ok(pair)
    } else {
        Err(SelectionError::InvalidSelection {
            key: key.clone(),
            pair,
        })
    }
}

impl Selections {
    /// Create an empty selection state.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_domains(domains: BTreeMap<DomainKey, SelectionDomain>) -> Self {
        Self { domains }
    }

    /// Mark a pair as the group's original.
    ///
    /// Clears any previous original in the same group and the pair's own
    /// delete mark. Delete marks on other pairs are untouched.
    pub fn set_original(
        &mut self,
        hierarchy: &Hierarchy,
        key: &DomainKey,
        ino: Ino,
        path: &str,
    ) -> Result<(), SelectionError> {
        let pair = member(hierarchy, key, ino, path)?;
        debug!(group = %key, %pair, "Setting original");
        self.domains.entry(key.clone()).or_default().set_original(pair);
        Ok(())
    }

    /// Clear the group's original. Returns the pair that was original.
    pub fn clear_original(&mut self, key: &DomainKey) -> Option<PathKey> {
        self.domains.get_mut(key).and_then(|d| d.original.take())
    }

    /// Flip the delete mark of a pair. Returns the new mark.
    ///
    /// Fails if the pair is the original; the original must be cleared first.
    pub fn toggle_delete(
        &mut self,
        hierarchy: &Hierarchy,
        key: &DomainKey,
        ino: Ino,
        path: &str,
    ) -> Result<bool, SelectionError> {
        let pair = member(hierarchy, key, ino, path)?;
        let domain = self.domains.entry(key.clone()).or_default();

        if domain.is_original(&pair) {
            return Err(SelectionError::OriginalLocked {
                key: key.clone(),
                pair,
            });
        }

        if domain.deletes.remove(&pair) {
            Ok(false)
        } else {
            domain.deletes.insert(pair);
            Ok(true)
        }
    }

    /// Mark every pair of a group except the original for deletion.
    ///
    /// Returns the number of newly marked pairs.
    pub fn mark_group_delete(
        &mut self,
        hierarchy: &Hierarchy,
        key: &DomainKey,
    ) -> Result<usize, SelectionError> {
        let group = hierarchy
            .group(key)
            .ok_or_else(|| SelectionError::UnknownGroup { key: key.clone() })?;
        let domain = self.domains.entry(key.clone()).or_default();

        let mut marked = 0;
        for entry in group.entries() {
            let pair = entry.key();
            if !domain.is_original(&pair) && domain.deletes.insert(pair) {
                marked += 1;
            }
        }
        Ok(marked)
    }

    /// Clear every delete mark in a group. Returns the number cleared.
    pub fn clear_group_deletes(&mut self, key: &DomainKey) -> usize {
        self.domains.get_mut(key).map_or(0, |domain| {
            let cleared = domain.deletes.len();
            domain.deletes.clear();
            cleared
        })
    }

    /// Clear every delete mark in every group. Returns the number cleared.
    pub fn clear_all_deletes(&mut self) -> usize {
        self.domains
            .values_mut()
            .map(|domain| {
                let cleared = domain.deletes.len();
                domain.deletes.clear();
                cleared
            })
            .sum()
    }

    /// Read-only view of a group's selections.
    pub fn snapshot(&self, key: &DomainKey) -> SelectionSnapshot {
        self.domains
            .get(key)
            .map(|d| SelectionSnapshot {
                original: d.original.clone(),
                deletes: d.deletes.clone(),
            })
            .unwrap_or_default()
    }

    /// Check if every non-original pair of a group is marked for deletion.
    ///
    /// False for groups with no non-original pair.
    pub fn is_all_set(&self, hierarchy: &Hierarchy, key: &DomainKey) -> bool {
        let (Some(group), Some(domain)) = (hierarchy.group(key), self.domains.get(key)) else {
            return false;
        };

        let mut has_candidates = false;
        for entry in group.entries() {
            let pair = entry.key();
            if domain.is_original(&pair) {
                continue;
            }
            has_candidates = true;
            if !domain.is_delete(&pair) {
                return false;
            }
        }
        has_candidates
    }

    /// Get a domain by key.
    pub fn domain(&self, key: &DomainKey) -> Option<&SelectionDomain> {
        self.domains.get(key)
    }

    /// Iterate over all domains in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&DomainKey, &SelectionDomain)> {
        self.domains.iter()
    }

    /// Get the number of domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Check if no domain exists.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Total number of delete marks.
    pub fn delete_count(&self) -> usize {
        self.domains.values().map(|d| d.deletes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RecordFilter;
    use crate::grouping::build;
    use dupegrid_core::FileRecord;

    const A: &str = "/mnt/user/share/hardlink_A.txt";
    const B: &str = "/mnt/user/share/hardlink_B.txt";
    const S: &str = "/mnt/user/share/single.txt";

    fn fixture() -> (Hierarchy, DomainKey) {
        let records = vec![
            FileRecord::new(Ino::new(999), [A, B], 1024).with_hash("H"),
            FileRecord::new(Ino::new(888), [S], 1024).with_hash("H"),
        ];
        (build(&records, &RecordFilter::new()), DomainKey::new("H", 1024))
    }

    #[test]
    fn test_set_original_is_exclusive_across_inodes() {
        let (hierarchy, key) = fixture();
        let mut selections = Selections::new();

        selections.set_original(&hierarchy, &key, Ino::new(999), A).unwrap();
        selections.set_original(&hierarchy, &key, Ino::new(888), S).unwrap();

        let snapshot = selections.snapshot(&key);
        assert_eq!(snapshot.original, Some(PathKey::new(Ino::new(888), S)));
        assert!(!snapshot.is_original(&PathKey::new(Ino::new(999), A)));
    }

    #[test]
    fn test_set_original_clears_own_delete_only() {
        let (hierarchy, key) = fixture();
        let mut selections = Selections::new();

        selections.toggle_delete(&hierarchy, &key, Ino::new(999), A).unwrap();
        selections.toggle_delete(&hierarchy, &key, Ino::new(999), B).unwrap();
        selections.set_original(&hierarchy, &key, Ino::new(999), A).unwrap();

        let snapshot = selections.snapshot(&key);
        assert!(!snapshot.is_delete(&PathKey::new(Ino::new(999), A)));
        assert!(snapshot.is_delete(&PathKey::new(Ino::new(999), B)));
    }

    #[test]
    fn test_toggle_delete_on_original_fails() {
        let (hierarchy, key) = fixture();
        let mut selections = Selections::new();

        selections.set_original(&hierarchy, &key, Ino::new(888), S).unwrap();
        let err = selections
            .toggle_delete(&hierarchy, &key, Ino::new(888), S)
            .unwrap_err();
        assert!(matches!(err, SelectionError::OriginalLocked { .. }));

        // Explicit two-step: clear, then mark
        assert!(selections.clear_original(&key).is_some());
        assert!(selections.toggle_delete(&hierarchy, &key, Ino::new(888), S).unwrap());
    }

    #[test]
    fn test_toggle_delete_flips() {
        let (hierarchy, key) = fixture();
        let mut selections = Selections::new();

        assert!(selections.toggle_delete(&hierarchy, &key, Ino::new(888), S).unwrap());
        assert!(!selections.toggle_delete(&hierarchy, &key, Ino::new(888), S).unwrap());
        assert!(selections.snapshot(&key).deletes.is_empty());
    }

    #[test]
    fn test_non_member_is_invalid() {
        let (hierarchy, key) = fixture();
        let mut selections = Selections::new();

        // Path of another inode
        let err = selections
            .set_original(&hierarchy, &key, Ino::new(888), A)
            .unwrap_err();
        assert!(matches!(err, SelectionError::InvalidSelection { .. }));

        // Unknown group
        let err = selections
            .toggle_delete(&hierarchy, &DomainKey::new("X", 1), Ino::new(888), S)
            .unwrap_err();
        assert!(err.is_stale());
        assert!(selections.is_empty());
    }

    #[test]
    fn test_group_level_marks_skip_original() {
        let (hierarchy, key) = fixture();
        let mut selections = Selections::new();

        selections.set_original(&hierarchy, &key, Ino::new(888), S).unwrap();
        assert!(!selections.is_all_set(&hierarchy, &key));

        assert_eq!(selections.mark_group_delete(&hierarchy, &key).unwrap(), 2);
        assert!(selections.is_all_set(&hierarchy, &key));
        assert!(!selections.snapshot(&key).is_delete(&PathKey::new(Ino::new(888), S)));

        assert_eq!(selections.clear_group_deletes(&key), 2);
        assert!(!selections.is_all_set(&hierarchy, &key));
    }

    #[test]
    fn test_clear_all_deletes() {
        let (hierarchy, key) = fixture();
        let mut selections = Selections::new();

        selections.mark_group_delete(&hierarchy, &key).unwrap();
        assert_eq!(selections.delete_count(), 3);
        assert_eq!(selections.clear_all_deletes(), 3);
        assert_eq!(selections.delete_count(), 0);
    }

    #[test]
    fn test_retain_drops_stale_pairs() {
        let mut domain = SelectionDomain::default();
        domain.set_original(PathKey::new(Ino::new(1), "/a"));
        domain.deletes.insert(PathKey::new(Ino::new(2), "/b"));
        domain.deletes.insert(PathKey::new(Ino::new(3), "/c"));

        let dropped = domain.retain(|pair| pair.ino != Ino::new(1) && pair.ino != Ino::new(3));
        assert_eq!(dropped, 2);
        assert!(domain.original().is_none());
        assert_eq!(domain.deletes().len(), 1);
    }
}
