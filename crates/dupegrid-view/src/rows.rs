//! Renderable rows for the three presentation levels.
//!
//! A [`RenderFrame`] is a read-only snapshot of the hierarchy with the
//! selection flags already resolved. UI state such as "selected" or
//! "is a hardlink" is carried as explicit booleans.

use compact_str::CompactString;
use serde::Serialize;
use strum::Display;

use dupegrid_core::{ContentHash, Ino, PathKey};
use dupegrid_engine::{
    DuplicateGroup, InodeGroup, InodeKind, PathEntry, ReviewState, SelectionSnapshot,
};

/// Path row under a hardlinked inode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathRow {
    /// Inode the path links to.
    pub ino: Ino,
    /// Absolute path string.
    pub path: CompactString,
    /// The inode reports more than one link.
    pub is_hardlinked: bool,
    /// This path is its group's original.
    pub original: bool,
    /// This path is queued for deletion.
    pub delete: bool,
}

impl PathRow {
    fn new(entry: &PathEntry, selection: &SelectionSnapshot) -> Self {
        let pair = entry.key();
        Self {
            ino: entry.ino,
            path: entry.path.clone(),
            is_hardlinked: entry.is_hardlinked,
            original: selection.is_original(&pair),
            delete: selection.is_delete(&pair),
        }
    }
}

/// Inode row within a duplicate group.
///
/// A singleton carries its only path and that path's flags, and has no
/// path rows. A link set carries no path of its own; its paths are always
/// listed below it, and its flags summarise them: `original` when one of
/// its paths is the original, `delete` when all of them are queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InodeRow {
    /// Inode number.
    pub ino: Ino,
    /// Link count as reported by the filesystem.
    pub nlink: u32,
    /// Last modification time, seconds since the Unix epoch.
    pub mtime: i64,
    /// Singleton or link set, from the listed path count.
    pub kind: InodeKind,
    /// `nlink > 1`, even when only one path is listed.
    pub is_hardlinked: bool,
    /// The only path of a singleton.
    pub path: Option<CompactString>,
    /// See the type docs for link sets.
    pub original: bool,
    /// See the type docs for link sets.
    pub delete: bool,
    /// Path rows of a link set; empty for a singleton.
    pub paths: Vec<PathRow>,
}

impl InodeRow {
    fn new(inode: &InodeGroup, selection: &SelectionSnapshot) -> Self {
        let mut row = Self {
            ino: inode.ino,
            nlink: inode.nlink,
            mtime: inode.mtime,
            kind: inode.kind,
            is_hardlinked: inode.is_hardlinked(),
            path: None,
            original: false,
            delete: false,
            paths: Vec::new(),
        };

        if inode.is_link_set() {
            row.paths = inode
                .paths
                .iter()
                .map(|entry| PathRow::new(entry, selection))
                .collect();
            row.original = row.paths.iter().any(|p| p.original);
            row.delete = row.paths.iter().all(|p| p.delete);
        } else if let Some(entry) = inode.paths.first() {
            let pair = entry.key();
            row.path = Some(entry.path.clone());
            row.original = selection.is_original(&pair);
            row.delete = selection.is_delete(&pair);
        }

        row
    }

    /// Number of presentation rows this inode contributes, itself included.
    pub fn row_count(&self) -> usize {
        1 + self.paths.len()
    }
}

/// Duplicate group header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    /// Content hash shared by every member.
    pub hash: ContentHash,
    /// Size of each member in bytes.
    pub size: u64,
    /// Number of member inodes.
    pub inode_count: usize,
    /// Number of paths across all member inodes.
    pub path_count: usize,
    /// Space freed by keeping a single inode.
    pub freeable_bytes: u64,
    /// The group's original, if one is set.
    pub original: Option<PathKey>,
    /// Paths queued for deletion.
    pub delete_count: usize,
    /// Every non-original path is queued for deletion.
    pub all_set: bool,
    /// Member inodes in first-seen order.
    pub inodes: Vec<InodeRow>,
}

impl GroupRow {
    fn new(group: &DuplicateGroup, state: &ReviewState) -> Self {
        let selection = state.snapshot(&group.key);
        Self {
            hash: group.key.hash.clone(),
            size: group.size(),
            inode_count: group.inode_count(),
            path_count: group.path_count(),
            freeable_bytes: group.freeable_bytes(),
            delete_count: selection.deletes.len(),
            all_set: state.is_all_set(&group.key),
            inodes: group
                .inodes
                .iter()
                .map(|inode| InodeRow::new(inode, &selection))
                .collect(),
            original: selection.original,
        }
    }
}

/// Totals shown alongside a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Number of duplicate groups.
    pub group_count: usize,
    /// Number of inodes across all groups.
    pub inode_count: usize,
    /// Number of paths across all groups.
    pub path_count: usize,
    /// Total freeable bytes.
    pub freeable_bytes: u64,
    /// Paths queued for deletion.
    pub delete_count: usize,
    /// Records whose reported link count disagrees with their paths.
    pub warning_count: usize,
}

/// Presentation level of a flattened row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Group,
    Inode,
    Path,
}

/// One row of a flattened frame, borrowing from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row<'a> {
    Group(&'a GroupRow),
    Inode(&'a InodeRow),
    Path(&'a PathRow),
}

impl Row<'_> {
    /// Indentation level: 0 for groups, 1 for inodes, 2 for paths.
    pub fn depth(&self) -> usize {
        match self {
            Row::Group(_) => 0,
            Row::Inode(_) => 1,
            Row::Path(_) => 2,
        }
    }

    /// Presentation level of the row.
    pub fn kind(&self) -> RowKind {
        match self {
            Row::Group(_) => RowKind::Group,
            Row::Inode(_) => RowKind::Inode,
            Row::Path(_) => RowKind::Path,
        }
    }
}

/// Everything the UI needs to draw one state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderFrame {
    /// Generation of the state this frame was rendered from.
    pub generation: u64,
    /// Duplicate groups in display order.
    pub groups: Vec<GroupRow>,
    /// Records still waiting for a hash.
    pub pending_count: usize,
    /// Totals over the whole frame.
    pub stats: FrameStats,
}

impl RenderFrame {
    /// Render a state.
    pub fn from_state(state: &ReviewState) -> Self {
        let groups: Vec<GroupRow> = state
            .hierarchy
            .groups
            .iter()
            .map(|group| GroupRow::new(group, state))
            .collect();

        let stats = FrameStats {
            group_count: groups.len(),
            inode_count: state.hierarchy.inode_count(),
            path_count: state.hierarchy.path_count(),
            freeable_bytes: state.hierarchy.freeable_bytes(),
            delete_count: groups.iter().map(|g| g.delete_count).sum(),
            warning_count: state.hierarchy.warnings.len(),
        };

        Self {
            generation: state.generation,
            groups,
            pending_count: state.hierarchy.pending.len(),
            stats,
        }
    }

    /// Rows in display order: each group, then its inodes, each followed by
    /// its path rows.
    pub fn flatten(&self) -> Vec<Row<'_>> {
        let mut rows = Vec::new();
        for group in &self.groups {
            rows.push(Row::Group(group));
            for inode in &group.inodes {
                rows.push(Row::Inode(inode));
                rows.extend(inode.paths.iter().map(Row::Path));
            }
        }
        rows
    }

    /// Number of rows [`flatten`](Self::flatten) yields.
    pub fn row_count(&self) -> usize {
        self.groups
            .iter()
            .map(|g| 1 + g.inodes.iter().map(InodeRow::row_count).sum::<usize>())
            .sum()
    }

    /// Check if there is nothing to review.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupegrid_core::{DomainKey, FileRecord};
    use dupegrid_engine::RecordFilter;

    fn state() -> ReviewState {
        let records = vec![
            FileRecord::new(Ino::new(999), ["/s/hardlink_A.txt", "/s/hardlink_B.txt"], 1024)
                .with_hash("H"),
            FileRecord::new(Ino::new(888), ["/s/single.txt"], 1024).with_hash("H"),
        ];
        ReviewState::from_records(&records, &RecordFilter::new())
    }

    #[test]
    fn test_link_set_rows_are_expanded() {
        let frame = RenderFrame::from_state(&state());
        let group = &frame.groups[0];

        let linked = &group.inodes[0];
        assert!(linked.is_hardlinked);
        assert!(linked.path.is_none());
        assert_eq!(linked.paths.len(), 2);
        assert!(linked.paths.iter().all(|p| p.is_hardlinked));

        let single = &group.inodes[1];
        assert!(!single.is_hardlinked);
        assert_eq!(single.path.as_deref(), Some("/s/single.txt"));
        assert!(single.paths.is_empty());
    }

    #[test]
    fn test_flatten_depths() {
        let frame = RenderFrame::from_state(&state());
        let depths: Vec<usize> = frame.flatten().iter().map(Row::depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1]);
        assert_eq!(frame.row_count(), 5);
        assert_eq!(frame.flatten()[2].kind().to_string(), "path");
    }

    #[test]
    fn test_flags_follow_selection() {
        let mut state = state();
        let key = DomainKey::new("H", 1024);
        state
            .set_original(&key, Ino::new(888), "/s/single.txt")
            .unwrap();
        state.mark_group_delete(&key).unwrap();

        let frame = RenderFrame::from_state(&state);
        let group = &frame.groups[0];
        assert!(group.all_set);
        assert_eq!(group.delete_count, 2);
        assert_eq!(
            group.original,
            Some(PathKey::new(Ino::new(888), "/s/single.txt"))
        );

        assert!(group.inodes[0].delete);
        assert!(!group.inodes[0].original);
        assert!(group.inodes[1].original);
        assert!(!group.inodes[1].delete);
        assert_eq!(frame.stats.delete_count, 2);
    }
}
