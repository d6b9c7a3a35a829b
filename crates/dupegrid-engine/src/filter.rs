//! Record filtering applied before grouping.

use globset::{Glob, GlobSet, GlobSetBuilder};

use dupegrid_core::{ConfigError, FileRecord, ReviewConfig};

/// Decides which records take part in grouping.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    min_size: u64,
    exclude: Option<GlobSet>,
    scope: Option<ReviewConfig>,
}

impl RecordFilter {
    /// A filter that accepts every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from the size, exclusion and share settings.
    pub fn from_config(config: &ReviewConfig) -> Result<Self, ConfigError> {
        let exclude = if config.exclude_patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &config.exclude_patterns {
                let glob = Glob::new(pattern).map_err(|e| ConfigError::Invalid {
                    message: format!("Invalid exclude pattern {pattern}: {e}"),
                })?;
                builder.add(glob);
            }
            Some(builder.build().map_err(|e| ConfigError::Invalid {
                message: format!("Invalid exclude patterns: {e}"),
            })?)
        };

        Ok(Self {
            min_size: config.min_size,
            exclude,
            scope: (!config.shares.is_empty()).then(|| config.clone()),
        })
    }

    /// Check if a record takes part in grouping.
    pub fn accepts(&self, record: &FileRecord) -> bool {
        if record.size < self.min_size {
            return false;
        }
        if let Some(ref exclude) = self.exclude {
            if record.paths.iter().all(|p| exclude.is_match(p.as_str())) {
                return false;
            }
        }
        if let Some(ref scope) = self.scope {
            if !record.paths.iter().any(|p| scope.in_selected_share(p)) {
                return false;
            }
        }
        true
    }
}
