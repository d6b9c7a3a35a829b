use dupegrid_core::{
    ConfigError, ContentHash, DomainKey, FileRecord, Ino, IntegrityWarning, PathKey,
    ReviewConfig, SelectionError, WarningKind,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_ino_and_hash_operations() {
    let ino1 = Ino::new(999);
    let ino2 = Ino::new(999);
    assert_eq!(ino1, ino2);
    assert_eq!(ino1.to_string(), "999");

    let hash = ContentHash::new("abc123");
    assert_eq!(hash.as_str(), "abc123");
    assert_eq!(hash, ContentHash::new("abc123"));
    assert_ne!(hash, ContentHash::new("abc124"));
}

#[test]
fn test_path_keys_follow_discovery_order() {
    let record = FileRecord::new(
        Ino::new(999),
        ["/mnt/user/share/hardlink_B.txt", "/mnt/user/share/hardlink_A.txt"],
        1024,
    );

    let keys: Vec<PathKey> = record.path_keys().collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].path.as_str(), "/mnt/user/share/hardlink_B.txt");
    assert_eq!(keys[1].path.as_str(), "/mnt/user/share/hardlink_A.txt");
    assert!(keys.iter().all(|k| k.ino == Ino::new(999)));
}

#[test]
fn test_record_has_path_and_unresolved_links() {
    let record = FileRecord::new(Ino::new(1), ["/a"], 5)
        .with_hash("H")
        .with_nlink(2)
        .with_mtime(42);

    assert!(record.has_path("/a"));
    assert!(!record.has_path("/b"));
    assert!(!record.is_link_set());
    assert!(!record.links_resolved());
    assert_eq!(record.mtime, 42);
}

#[test]
fn test_domain_key_display() {
    let key = DomainKey::new("H", 1024);
    assert_eq!(key.to_string(), "H:1024");
}

#[test]
fn test_selection_error_messages() {
    let err = SelectionError::OriginalLocked {
        key: DomainKey::new("H", 1024),
        pair: PathKey::new(Ino::new(888), "/mnt/user/share/single.txt"),
    };
    let message = err.to_string();
    assert!(message.contains("/mnt/user/share/single.txt"));
    assert!(message.contains("H:1024"));
}

#[test]
fn test_integrity_warning_kinds() {
    assert_eq!(
        IntegrityWarning::unresolved_links(Ino::new(1), 2).kind,
        WarningKind::UnresolvedLinks
    );
    assert_eq!(
        IntegrityWarning::duplicate_path(Ino::new(1), "/a").kind,
        WarningKind::DuplicatePath
    );
    assert_eq!(
        IntegrityWarning::duplicate_ino(Ino::new(1)).kind,
        WarningKind::DuplicateIno
    );
}

#[test]
fn test_config_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(
        &path,
        r#"
min_size = 4096
exclude_patterns = ["**/*.tmp"]
shares = ["media", "backups"]
path_delimiter = ";"
"#,
    )
    .unwrap();

    let config = ReviewConfig::load(&path).unwrap();
    assert_eq!(config.min_size, 4096);
    assert_eq!(config.exclude_patterns, vec!["**/*.tmp".to_string()]);
    assert_eq!(config.shares.len(), 2);
    assert_eq!(config.path_delimiter, ';');
    // Unspecified fields fall back to defaults
    assert_eq!(config.share_root, "/mnt/user");
    assert_eq!(config.orphan_grace, 3);
}

#[test]
fn test_config_load_rejects_invalid_values() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "share_root = \"relative/dir\"\n").unwrap();

    let err = ReviewConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
}

#[test]
fn test_config_load_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "min_size = \"lots\"\n").unwrap();

    let err = ReviewConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_config_load_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = ReviewConfig::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
