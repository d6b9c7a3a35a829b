//! Raw store entities and their coercion into file records.

use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use dupegrid_core::{FileRecord, Ino, IntegrityWarning, RecordError, ReviewConfig};

/// Path list as stored: either delimiter-joined or already a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPaths {
    /// Delimiter-joined path string (`/a|/b`).
    Joined(String),
    /// Path array.
    List(Vec<String>),
}

/// One entity as delivered by the record store.
///
/// Every field is optional and string-typed; numbers in JSON snapshots are
/// accepted and converted to their string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ino: Option<String>,

    #[serde(default)]
    pub path: Option<RawPaths>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub size: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub hash: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub nlink: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub mtime: Option<String>,

    /// Share names derived from the paths; informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shares: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Str(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::UInt(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

impl RawRecord {
    /// Encode a record back into store form.
    pub fn from_record(record: &FileRecord, config: &ReviewConfig) -> Self {
        let mut shares: Vec<String> = Vec::new();
        for path in &record.paths {
            if let Some(share) = config.share_of(path) {
                if !shares.iter().any(|s| s == share) {
                    shares.push(share.to_string());
                }
            }
        }

        Self {
            ino: Some(record.ino.to_string()),
            path: Some(RawPaths::Joined(join_paths(
                &record.paths,
                config.path_delimiter,
            ))),
            size: Some(record.size.to_string()),
            hash: record.hash.as_ref().map(ToString::to_string),
            nlink: Some(record.nlink.to_string()),
            mtime: Some(record.mtime.to_string()),
            shares,
        }
    }
}

/// Join a path list with the store delimiter.
pub fn join_paths(paths: &[CompactString], delimiter: char) -> String {
    let mut joined = String::new();
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            joined.push(delimiter);
        }
        joined.push_str(path);
    }
    joined
}

/// Split a delimiter-joined path list, preserving order and dropping empty segments.
pub fn split_paths(joined: &str, delimiter: char) -> Vec<CompactString> {
    joined
        .split(delimiter)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(CompactString::from)
        .collect()
}

/// Coerce one raw entity into a file record.
///
/// Returns the record together with any integrity warnings raised while
/// normalising its path list.
pub fn parse(
    raw: &RawRecord,
    delimiter: char,
) -> Result<(FileRecord, Vec<IntegrityWarning>), RecordError> {
    let ino_text = raw
        .ino
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RecordError::MissingIno)?;
    let ino = ino_text
        .parse::<u64>()
        .map(Ino::new)
        .map_err(|_| RecordError::invalid(ino_text, "ino", ino_text))?;

    let size_text = raw
        .size
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RecordError::MissingField {
            ino: ino_text.to_string(),
            field: "size",
        })?;
    let size = size_text
        .parse::<u64>()
        .map_err(|_| RecordError::invalid(ino_text, "size", size_text))?;

    let listed = match &raw.path {
        Some(RawPaths::Joined(joined)) => split_paths(joined, delimiter),
        Some(RawPaths::List(list)) => list
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(CompactString::from)
            .collect(),
        None => Vec::new(),
    };

    let mut warnings = Vec::new();
    let mut paths: Vec<CompactString> = Vec::with_capacity(listed.len());
    for path in listed {
        if paths.contains(&path) {
            warnings.push(IntegrityWarning::duplicate_path(ino, &path));
        } else {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(RecordError::NoPaths { ino });
    }

    let nlink = match raw.nlink.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => text
            .parse::<u32>()
            .map_err(|_| RecordError::invalid(ino_text, "nlink", text))?,
        None => u32::try_from(paths.len()).unwrap_or(u32::MAX),
    };
    if nlink == 0 {
        return Err(RecordError::ZeroLinks { ino });
    }

    let mtime = match raw.mtime.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => parse_timestamp(text)
            .ok_or_else(|| RecordError::invalid(ino_text, "mtime", text))?,
        None => 0,
    };

    let hash = raw
        .hash
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty() && *h != "null");

    let mut record = FileRecord::new(ino, paths, size)
        .with_nlink(nlink)
        .with_mtime(mtime);
    if let Some(hash) = hash {
        record = record.with_hash(hash);
    }

    Ok((record, warnings))
}

/// Parse integer seconds, tolerating a fractional part.
fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(secs) = text.parse::<i64>() {
        return Some(secs);
    }
    let secs = text.parse::<f64>().ok()?;
    if secs.is_finite() && secs.abs() < i64::MAX as f64 {
        Some(secs.trunc() as i64)
    } else {
        None
    }
}

/// A raw entity that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Position of the entity in its batch.
    pub index: usize,
    /// Why it was rejected.
    pub error: RecordError,
}

/// Result of ingesting one batch of raw entities.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    /// Successfully parsed records, in batch order.
    pub records: Vec<FileRecord>,
    /// Entities excluded from grouping.
    pub rejected: Vec<Rejected>,
    /// Integrity warnings raised while parsing.
    pub warnings: Vec<IntegrityWarning>,
}

impl Ingested {
    /// Check if every entity parsed cleanly.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.warnings.is_empty()
    }
}

/// Parse a batch of raw entities, reporting malformed ones instead of failing.
pub fn ingest(raws: impl IntoIterator<Item = RawRecord>, delimiter: char) -> Ingested {
    let mut batch = Ingested::default();

    for (index, raw) in raws.into_iter().enumerate() {
        match parse(&raw, delimiter) {
            Ok((record, warnings)) => {
                for warning in &warnings {
                    warn!(ino = %warning.ino, "{}", warning.message);
                }
                batch.warnings.extend(warnings);
                batch.records.push(record);
            }
            Err(error) => {
                warn!(index, %error, "Excluding malformed record");
                batch.rejected.push(Rejected { index, error });
            }
        }
    }

    batch
}
