//! The current set of file records, keyed by inode.

use compact_str::CompactString;
use indexmap::IndexMap;
use tracing::{debug, warn};

use dupegrid_core::{FileRecord, Ino, IntegrityWarning};

/// Changes applied by [`RecordSet::replace_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Inodes seen for the first time.
    pub added: usize,
    /// Known inodes whose record changed.
    pub updated: usize,
    /// Known inodes absent from the delivery.
    pub removed: usize,
    /// Warnings raised while merging the delivery.
    pub warnings: Vec<IntegrityWarning>,
}

/// Outcome of a path move event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The old path was replaced in place.
    Renamed,
    /// The old path was unknown; the new path was appended.
    Appended,
    /// No record exists for the inode.
    UnknownIno,
}

/// Ino-keyed record set that remembers first-seen order.
///
/// Iteration yields records in the order their inode was first seen. An
/// inode keeps its position for as long as every delivery contains it.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: IndexMap<Ino, FileRecord>,
}

impl RecordSet {
    /// Create an empty record set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record set from one delivery.
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut set = Self::new();
        set.replace_all(records);
        set
    }

    /// Replace the whole set with an authoritative delivery.
    ///
    /// Inodes absent from the delivery are dropped. Known inodes keep their
    /// first-seen position; new inodes are appended in delivery order. When
    /// an inode appears twice in the delivery the later record wins.
    pub fn replace_all(&mut self, delivery: impl IntoIterator<Item = FileRecord>) -> ReplaceSummary {
        let mut summary = ReplaceSummary::default();

        let mut incoming: IndexMap<Ino, FileRecord> = IndexMap::new();
        for record in delivery {
            let ino = record.ino;
            if incoming.insert(ino, record).is_some() {
                let warning = IntegrityWarning::duplicate_ino(ino);
                warn!(ino = %ino, "{}", warning.message);
                summary.warnings.push(warning);
            }
        }

        let before = self.records.len();
        self.records.retain(|ino, _| incoming.contains_key(ino));
        summary.removed = before - self.records.len();

        for (ino, record) in incoming {
            match self.records.get_mut(&ino) {
                Some(existing) => {
                    if *existing != record {
                        *existing = record;
                        summary.updated += 1;
                    }
                }
                None => {
                    self.records.insert(ino, record);
                    summary.added += 1;
                }
            }
        }

        debug!(
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            total = self.records.len(),
            "Replaced record set"
        );
        summary
    }

    /// Insert or replace one record. Returns the previous record.
    pub fn upsert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(record.ino, record)
    }

    /// Remove the record for an inode.
    pub fn remove(&mut self, ino: Ino) -> Option<FileRecord> {
        self.records.shift_remove(&ino)
    }

    /// Rename one path of an inode.
    pub fn apply_move(&mut self, ino: Ino, old_path: &str, new_path: &str) -> MoveOutcome {
        let Some(record) = self.records.get_mut(&ino) else {
            warn!(ino = %ino, new_path, "Move event for unknown inode");
            return MoveOutcome::UnknownIno;
        };

        if let Some(slot) = record.paths.iter_mut().find(|p| p.as_str() == old_path) {
            *slot = CompactString::from(new_path);
            MoveOutcome::Renamed
        } else {
            warn!(ino = %ino, old_path, new_path, "Old path not recorded, appending new path");
            if !record.has_path(new_path) {
                record.paths.push(CompactString::from(new_path));
            }
            MoveOutcome::Appended
        }
    }

    /// Remove one path of an inode.
    ///
    /// The record is dropped when its last path goes. Returns `true` if the
    /// path was known.
    pub fn remove_path(&mut self, ino: Ino, path: &str) -> bool {
        let Some(record) = self.records.get_mut(&ino) else {
            return false;
        };
        let Some(pos) = record.paths.iter().position(|p| p == path) else {
            return false;
        };

        record.paths.remove(pos);
        record.nlink = record.nlink.saturating_sub(1).max(1);
        if record.paths.is_empty() {
            self.records.shift_remove(&ino);
        }
        true
    }

    /// Get the record for an inode.
    pub fn get(&self, ino: Ino) -> Option<&FileRecord> {
        self.records.get(&ino)
    }

    /// First-seen position of an inode.
    pub fn position(&self, ino: Ino) -> Option<usize> {
        self.records.get_index_of(&ino)
    }

    /// Iterate over records in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a FileRecord;
    type IntoIter = indexmap::map::Values<'a, Ino, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ino: u64, paths: &[&str]) -> FileRecord {
        FileRecord::new(Ino::new(ino), paths.iter().copied(), 10)
    }

    fn order(set: &RecordSet) -> Vec<u64> {
        set.iter().map(|r| r.ino.0).collect()
    }

    #[test]
    fn test_replace_keeps_first_seen_order() {
        let mut set = RecordSet::from_records(vec![rec(3, &["/c"]), rec(1, &["/a"])]);
        assert_eq!(order(&set), vec![3, 1]);

        // Redelivered in another order with a new inode
        let summary = set.replace_all(vec![rec(2, &["/b"]), rec(1, &["/a"]), rec(3, &["/c"])]);
        assert_eq!(order(&set), vec![3, 1, 2]);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.removed, 0);
    }

    #[test]
    fn test_replace_drops_absent_inodes() {
        let mut set = RecordSet::from_records(vec![rec(1, &["/a"]), rec(2, &["/b"])]);
        let summary = set.replace_all(vec![rec(2, &["/b", "/b2"])]);

        assert_eq!(order(&set), vec![2]);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(set.get(Ino::new(2)).unwrap().paths.len(), 2);
    }

    #[test]
    fn test_replace_duplicate_ino_last_wins() {
        let mut set = RecordSet::new();
        let summary = set.replace_all(vec![rec(1, &["/a"]), rec(2, &["/b"]), rec(1, &["/z"])]);

        assert_eq!(order(&set), vec![1, 2]);
        assert!(set.get(Ino::new(1)).unwrap().has_path("/z"));
        assert_eq!(summary.warnings.len(), 1);
    }

    #[test]
    fn test_apply_move() {
        let mut set = RecordSet::from_records(vec![rec(1, &["/a", "/b"])]);

        assert_eq!(set.apply_move(Ino::new(1), "/a", "/moved"), MoveOutcome::Renamed);
        assert_eq!(set.get(Ino::new(1)).unwrap().paths, vec!["/moved", "/b"]);

        assert_eq!(set.apply_move(Ino::new(1), "/gone", "/c"), MoveOutcome::Appended);
        assert_eq!(set.get(Ino::new(1)).unwrap().paths.len(), 3);

        assert_eq!(set.apply_move(Ino::new(9), "/x", "/y"), MoveOutcome::UnknownIno);
    }

    #[test]
    fn test_remove_path_drops_empty_record() {
        let mut set = RecordSet::from_records(vec![rec(1, &["/a", "/b"])]);

        assert!(set.remove_path(Ino::new(1), "/a"));
        let record = set.get(Ino::new(1)).unwrap();
        assert_eq!(record.paths, vec!["/b"]);
        assert_eq!(record.nlink, 1);

        assert!(!set.remove_path(Ino::new(1), "/a"));
        assert!(set.remove_path(Ino::new(1), "/b"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_upsert_and_position() {
        let mut set = RecordSet::new();
        assert!(set.upsert(rec(5, &["/e"])).is_none());
        assert!(set.upsert(rec(6, &["/f"])).is_none());
        assert!(set.upsert(rec(5, &["/e2"])).is_some());
        assert_eq!(set.position(Ino::new(5)), Some(0));
        assert_eq!(set.position(Ino::new(6)), Some(1));
        assert!(set.remove(Ino::new(5)).is_some());
        assert_eq!(set.position(Ino::new(6)), Some(0));
    }
}
