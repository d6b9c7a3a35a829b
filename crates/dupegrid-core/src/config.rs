//! Review configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for grouping and reconciliation.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ReviewConfig {
    /// Minimum file size to group (skip tiny files).
    #[builder(default = "0")]
    #[serde(default)]
    pub min_size: u64,

    /// Glob patterns; a record whose every path matches is not grouped.
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Directory whose immediate children are shares.
    #[builder(default = "default_share_root()")]
    #[serde(default = "default_share_root")]
    pub share_root: String,

    /// Shares to include (empty = all paths).
    #[builder(default)]
    #[serde(default)]
    pub shares: Vec<String>,

    /// Delimiter joining the path list in stored records.
    #[builder(default = "default_path_delimiter()")]
    #[serde(default = "default_path_delimiter")]
    pub path_delimiter: char,

    /// Reconciliations an orphaned selection domain survives.
    #[builder(default = "default_orphan_grace()")]
    #[serde(default = "default_orphan_grace")]
    pub orphan_grace: u32,
}

fn default_share_root() -> String {
    "/mnt/user".to_string()
}

fn default_path_delimiter() -> char {
    '|'
}

fn default_orphan_grace() -> u32 {
    3
}

impl ReviewConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some('/') = self.path_delimiter {
            return Err("Path delimiter cannot be '/'".to_string());
        }
        if let Some(ref root) = self.share_root {
            if !root.starts_with('/') {
                return Err(format!("Share root must be absolute: {root}"));
            }
        }
        if let Some(ref patterns) = self.exclude_patterns {
            for pattern in patterns {
                Glob::new(pattern).map_err(|e| format!("Invalid exclude pattern {pattern}: {e}"))?;
            }
        }
        Ok(())
    }
}

impl ReviewConfig {
    /// Create a new config builder.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder::default()
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dupegrid")
            .join("config.toml")
    }

    /// Load the config from the default location, or defaults if absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate values that serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid { message };

        if self.path_delimiter == '/' {
            return Err(invalid("Path delimiter cannot be '/'".to_string()));
        }
        if !self.share_root.starts_with('/') {
            return Err(invalid(format!(
                "Share root must be absolute: {}",
                self.share_root
            )));
        }
        for pattern in &self.exclude_patterns {
            Glob::new(pattern)
                .map_err(|e| invalid(format!("Invalid exclude pattern {pattern}: {e}")))?;
        }
        Ok(())
    }

    /// Share name of a path: the directory directly under the share root.
    pub fn share_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        let root = self.share_root.trim_end_matches('/');
        let rest = path.strip_prefix(root)?.strip_prefix('/')?;
        rest.split('/').next().filter(|share| !share.is_empty())
    }

    /// Check if a path lies inside one of the selected shares.
    pub fn in_selected_share(&self, path: &str) -> bool {
        if self.shares.is_empty() {
            return true;
        }
        self.share_of(path)
            .is_some_and(|share| self.shares.iter().any(|s| s == share))
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            exclude_patterns: Vec::new(),
            share_root: default_share_root(),
            shares: Vec::new(),
            path_delimiter: default_path_delimiter(),
            orphan_grace: default_orphan_grace(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ReviewConfig::builder()
            .min_size(1024u64)
            .shares(vec!["media".to_string()])
            .orphan_grace(5u32)
            .build()
            .unwrap();

        assert_eq!(config.min_size, 1024);
        assert_eq!(config.path_delimiter, '|');
        assert_eq!(config.orphan_grace, 5);
        assert_eq!(config.share_root, "/mnt/user");
    }

    #[test]
    fn test_builder_rejects_slash_delimiter() {
        let result = ReviewConfig::builder().path_delimiter('/').build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_bad_glob() {
        let result = ReviewConfig::builder()
            .exclude_patterns(vec!["[".to_string()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_share_of() {
        let config = ReviewConfig::default();
        assert_eq!(config.share_of("/mnt/user/media/a.mkv"), Some("media"));
        assert_eq!(config.share_of("/mnt/user/"), None);
        assert_eq!(config.share_of("/srv/media/a.mkv"), None);
    }

    #[test]
    fn test_in_selected_share() {
        let mut config = ReviewConfig::default();
        assert!(config.in_selected_share("/anywhere/file"));

        config.shares = vec!["share".to_string()];
        assert!(config.in_selected_share("/mnt/user/share/a.txt"));
        assert!(!config.in_selected_share("/mnt/user/other/a.txt"));
        assert!(!config.in_selected_share("/mnt/usershare/a.txt"));
        assert!(!config.in_selected_share("/tmp/share/a.txt"));
    }
}
