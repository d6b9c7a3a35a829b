//! Inode records and the keys derived from them.

use std::fmt;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Inode number identifying one file's data on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ino(pub u64);

impl Ino {
    /// Create a new Ino from a u64.
    pub fn new(ino: u64) -> Self {
        Self(ino)
    }
}

impl fmt::Display for Ino {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content digest reported by the external hasher.
///
/// The digest is treated as an opaque string; only equality and ordering
/// matter for grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(CompactString);

impl ContentHash {
    /// Create a new ContentHash from its string form.
    pub fn new(digest: impl Into<CompactString>) -> Self {
        Self(digest.into())
    }

    /// Get the digest as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a duplicate group and of its selection domain.
///
/// Field order matters: the derived `Ord` sorts by hash, then size, which is
/// the display order of duplicate groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainKey {
    /// Content hash shared by every member.
    pub hash: ContentHash,
    /// Size of each member in bytes.
    pub size: u64,
}

impl DomainKey {
    /// Create a new domain key.
    pub fn new(hash: impl Into<CompactString>, size: u64) -> Self {
        Self {
            hash: ContentHash::new(hash),
            size,
        }
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.size)
    }
}

/// One concrete `(ino, path)` pair, the unit of selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathKey {
    /// Inode the path links to.
    pub ino: Ino,
    /// Absolute path string.
    pub path: CompactString,
}

impl PathKey {
    /// Create a new pair key.
    pub fn new(ino: Ino, path: impl Into<CompactString>) -> Self {
        Self {
            ino,
            path: path.into(),
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ino {})", self.path, self.ino)
    }
}

/// One inode's worth of filesystem identity, as delivered by the record store.
///
/// Records are immutable snapshots; an update for the same inode arrives as a
/// whole new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Inode number, the identity key.
    pub ino: Ino,

    /// Every known path of this inode, in discovery order.
    pub paths: Vec<CompactString>,

    /// File size in bytes.
    pub size: u64,

    /// Content hash, absent until hashing completes.
    pub hash: Option<ContentHash>,

    /// Link count as reported by the filesystem.
    pub nlink: u32,

    /// Last modification time, seconds since the Unix epoch.
    pub mtime: i64,
}

impl FileRecord {
    /// Create an unhashed record whose link count matches its paths.
    pub fn new<P>(ino: Ino, paths: impl IntoIterator<Item = P>, size: u64) -> Self
    where
        P: Into<CompactString>,
    {
        let paths: Vec<CompactString> = paths.into_iter().map(Into::into).collect();
        let nlink = u32::try_from(paths.len()).unwrap_or(u32::MAX);
        Self {
            ino,
            paths,
            size,
            hash: None,
            nlink,
            mtime: 0,
        }
    }

    /// Set the content hash.
    pub fn with_hash(mut self, hash: impl Into<CompactString>) -> Self {
        self.hash = Some(ContentHash::new(hash));
        self
    }

    /// Override the reported link count.
    pub fn with_nlink(mut self, nlink: u32) -> Self {
        self.nlink = nlink;
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    /// The duplicate group this record belongs to, once hashed.
    pub fn domain_key(&self) -> Option<DomainKey> {
        self.hash.as_ref().map(|hash| DomainKey {
            hash: hash.clone(),
            size: self.size,
        })
    }

    /// Number of links, taking the observed path list as ground truth.
    pub fn link_count(&self) -> usize {
        self.paths.len()
    }

    /// Check if more than one path links to this inode.
    pub fn is_link_set(&self) -> bool {
        self.paths.len() > 1
    }

    /// Check if the reported link count agrees with the observed paths.
    pub fn links_resolved(&self) -> bool {
        self.nlink as usize == self.paths.len()
    }

    /// Check if a path belongs to this record.
    pub fn has_path(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Iterate over the `(ino, path)` pairs of this record.
    pub fn path_keys(&self) -> impl Iterator<Item = PathKey> + '_ {
        self.paths.iter().map(|p| PathKey::new(self.ino, p.clone()))
    }

    /// Modification time as a UTC timestamp, if representable.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.mtime, 0)
    }
}
