//! Three-level duplicate hierarchy: duplicate group, inode group, path.
//!
//! The hierarchy is a rebuilt view. Every record-set change produces a new
//! [`Hierarchy`] from scratch:
//! 1. Partition records by `(hash, size)`; unhashed records wait in `pending`
//! 2. Keep partitions with two or more inodes as duplicate groups
//! 3. Each record becomes one inode group, in first-seen order
//! 4. Each path becomes one path entry, in discovery order

use std::collections::HashMap;

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::Serialize;

use dupegrid_core::{DomainKey, FileRecord, Ino, IntegrityWarning, PathKey};

use crate::filter::RecordFilter;

/// One concrete path of an inode group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEntry {
    /// Inode the path links to.
    pub ino: Ino,
    /// Absolute path string.
    pub path: CompactString,
    /// Whether the inode reports more than one link, found or not.
    pub is_hardlinked: bool,
}

impl PathEntry {
    /// The selection key of this path.
    pub fn key(&self) -> PathKey {
        PathKey::new(self.ino, self.path.clone())
    }
}

/// How an inode group is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InodeKind {
    /// One path; shown as a single row.
    Singleton,
    /// Several hardlinked paths; each path is shown directly.
    LinkSet,
}

/// The materialisation of one record within a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InodeGroup {
    /// Inode number.
    pub ino: Ino,
    /// Link count as reported by the filesystem.
    pub nlink: u32,
    /// Last modification time, seconds since the Unix epoch.
    pub mtime: i64,
    /// Presentation kind, derived from the observed path count.
    pub kind: InodeKind,
    /// Paths in discovery order.
    pub paths: Vec<PathEntry>,
}

impl InodeGroup {
    fn from_record(record: &FileRecord) -> Self {
        let is_hardlinked = record.nlink > 1;
        Self {
            ino: record.ino,
            nlink: record.nlink,
            mtime: record.mtime,
            kind: if record.is_link_set() {
                InodeKind::LinkSet
            } else {
                InodeKind::Singleton
            },
            paths: record
                .paths
                .iter()
                .map(|path| PathEntry {
                    ino: record.ino,
                    path: path.clone(),
                    is_hardlinked,
                })
                .collect(),
        }
    }

    /// Check if more than one of this inode's paths is listed.
    pub fn is_link_set(&self) -> bool {
        self.kind == InodeKind::LinkSet
    }

    /// Check if the filesystem reports more than one link.
    ///
    /// Links not yet discovered still count, so a singleton can be hardlinked.
    pub fn is_hardlinked(&self) -> bool {
        self.nlink > 1
    }

    /// Check if a path belongs to this inode.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p.path == path)
    }
}

/// Inodes sharing one `(hash, size)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Group identity, also the selection domain key.
    pub key: DomainKey,
    /// Member inodes in first-seen order.
    pub inodes: Vec<InodeGroup>,
    #[serde(skip)]
    first_seen: usize,
}

impl DuplicateGroup {
    /// Size of each member in bytes.
    pub fn size(&self) -> u64 {
        self.key.size
    }

    /// Get the number of member inodes.
    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }

    /// Get the number of paths across all member inodes.
    pub fn path_count(&self) -> usize {
        self.inodes.iter().map(|i| i.paths.len()).sum()
    }

    /// Space freed by keeping one inode: `size * (inodes - 1)`.
    ///
    /// Hardlinks share storage, so only distinct inodes count.
    pub fn freeable_bytes(&self) -> u64 {
        self.key
            .size
            .saturating_mul(self.inodes.len().saturating_sub(1) as u64)
    }

    /// Get a member inode.
    pub fn inode(&self, ino: Ino) -> Option<&InodeGroup> {
        self.inodes.iter().find(|i| i.ino == ino)
    }

    /// Check if an `(ino, path)` pair belongs to this group.
    pub fn contains(&self, ino: Ino, path: &str) -> bool {
        self.inode(ino).is_some_and(|i| i.contains(path))
    }

    /// Check if a pair key belongs to this group.
    pub fn contains_pair(&self, pair: &PathKey) -> bool {
        self.contains(pair.ino, &pair.path)
    }

    /// Iterate over every path entry in display order.
    pub fn entries(&self) -> impl Iterator<Item = &PathEntry> {
        self.inodes.iter().flat_map(|i| i.paths.iter())
    }
}

/// The complete grouped view of one record set.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// Duplicate groups, ordered by hash then size.
    pub groups: Vec<DuplicateGroup>,

    /// Records without a hash yet, excluded from grouping.
    pub pending: Vec<FileRecord>,

    /// Hashed records that are the only inode of their partition.
    pub unmatched: Vec<FileRecord>,

    /// Number of records rejected by the filter.
    pub filtered: usize,

    /// Data-integrity warnings raised while grouping.
    pub warnings: Vec<IntegrityWarning>,

    group_index: HashMap<DomainKey, usize>,
    unmatched_index: HashMap<DomainKey, usize>,
    owners: HashMap<Ino, usize>,
}

impl Hierarchy {
    /// Get a duplicate group by key.
    pub fn group(&self, key: &DomainKey) -> Option<&DuplicateGroup> {
        self.group_index.get(key).map(|&i| &self.groups[i])
    }

    /// The single hashed record of a partition that is not a group.
    pub fn unmatched_record(&self, key: &DomainKey) -> Option<&FileRecord> {
        self.unmatched_index.get(key).map(|&i| &self.unmatched[i])
    }

    /// Key of the duplicate group owning an inode.
    pub fn owner_of(&self, ino: Ino) -> Option<&DomainKey> {
        self.owners.get(&ino).map(|&i| &self.groups[i].key)
    }

    /// Check if a pair is a member of a group.
    pub fn contains(&self, key: &DomainKey, ino: Ino, path: &str) -> bool {
        self.group(key).is_some_and(|g| g.contains(ino, path))
    }

    /// Get the number of duplicate groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Get the number of inode groups across all duplicate groups.
    pub fn inode_count(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::inode_count).sum()
    }

    /// Get the number of path entries across all duplicate groups.
    pub fn path_count(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::path_count).sum()
    }

    /// Total freeable bytes across all groups.
    pub fn freeable_bytes(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::freeable_bytes).sum()
    }

    /// Check if no duplicates were found.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Check a record's reported link count against its paths.
fn check_links(record: &FileRecord) -> Option<IntegrityWarning> {
    if record.links_resolved() {
        None
    } else if record.nlink > 1 && record.paths.len() == 1 {
        Some(IntegrityWarning::unresolved_links(record.ino, record.nlink))
    } else {
        Some(IntegrityWarning::link_count_mismatch(
            record.ino,
            record.nlink,
            record.paths.len(),
        ))
    }
}

/// Build the hierarchy from records given in first-seen order.
///
/// Deterministic: the same records in the same order always produce the
/// same group, inode and path ordering.
pub fn build<'a>(
    records: impl IntoIterator<Item = &'a FileRecord>,
    filter: &RecordFilter,
) -> Hierarchy {
    let mut hierarchy = Hierarchy::default();
    let mut partitions: IndexMap<DomainKey, Vec<(usize, &FileRecord)>> = IndexMap::new();

    for (seq, record) in records.into_iter().enumerate() {
        if let Some(warning) = check_links(record) {
            hierarchy.warnings.push(warning);
        }
        if !filter.accepts(record) {
            hierarchy.filtered += 1;
            continue;
        }
        match record.domain_key() {
            Some(key) => partitions.entry(key).or_default().push((seq, record)),
            None => hierarchy.pending.push(record.clone()),
        }
    }

    for (key, members) in partitions {
        if let [(_, only)] = members.as_slice() {
            hierarchy
                .unmatched_index
                .insert(key, hierarchy.unmatched.len());
            hierarchy.unmatched.push((*only).clone());
            continue;
        }

        hierarchy.groups.push(DuplicateGroup {
            key,
            first_seen: members.first().map_or(0, |(seq, _)| *seq),
            inodes: members
                .iter()
                .map(|(_, record)| InodeGroup::from_record(record))
                .collect(),
        });
    }

    hierarchy.groups.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });

    for (i, group) in hierarchy.groups.iter().enumerate() {
        hierarchy.group_index.insert(group.key.clone(), i);
        for inode in &group.inodes {
            hierarchy.owners.insert(inode.ino, i);
        }
    }

    hierarchy
}
