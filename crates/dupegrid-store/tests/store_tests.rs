use dupegrid_core::{ReviewConfig, WarningKind};
use dupegrid_store::{
    Ino, RawPaths, RawRecord, RecordError, RecordSet, SnapshotError, ingest, load_deliveries,
    load_snapshot, parse,
};
use std::fs;
use tempfile::TempDir;

const SEEDED: &str = r#"[
    {
        "ino": "999",
        "path": "/mnt/user/share/hardlink_A.txt|/mnt/user/share/hardlink_B.txt",
        "size": 1024,
        "hash": "hash_nested_test",
        "nlink": 2,
        "mtime": 1600000000
    },
    {
        "ino": 888,
        "path": "/mnt/user/share/single.txt",
        "size": "1024",
        "hash": "hash_nested_test",
        "nlink": "1",
        "mtime": "1600000000"
    }
]"#;

#[test]
fn test_load_snapshot_coerces_mixed_scalars() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("records.json");
    fs::write(&path, SEEDED).unwrap();

    let raws = load_snapshot(&path).unwrap();
    assert_eq!(raws.len(), 2);
    assert_eq!(raws[0].size.as_deref(), Some("1024"));
    assert_eq!(raws[1].ino.as_deref(), Some("888"));

    let batch = ingest(raws, '|');
    assert!(batch.is_clean());
    assert_eq!(batch.records.len(), 2);

    let linked = &batch.records[0];
    assert_eq!(linked.ino, Ino::new(999));
    assert_eq!(
        linked.paths,
        vec![
            "/mnt/user/share/hardlink_A.txt",
            "/mnt/user/share/hardlink_B.txt"
        ]
    );
    assert_eq!(linked.nlink, 2);
    assert_eq!(linked.mtime, 1_600_000_000);
    assert_eq!(linked.hash.as_ref().unwrap().as_str(), "hash_nested_test");
}

#[test]
fn test_load_deliveries_accepts_both_shapes() {
    let temp = TempDir::new().unwrap();

    let single = temp.path().join("single.json");
    fs::write(&single, SEEDED).unwrap();
    assert_eq!(load_deliveries(&single).unwrap().len(), 1);

    let many = temp.path().join("many.json");
    fs::write(&many, format!("[{SEEDED}, []]")).unwrap();
    let deliveries = load_deliveries(&many).unwrap();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].len(), 2);
    assert!(deliveries[1].is_empty());

    // The last delivery is the current snapshot
    assert!(load_snapshot(&many).unwrap().is_empty());
}

#[test]
fn test_load_snapshot_errors() {
    let temp = TempDir::new().unwrap();

    let missing = load_snapshot(&temp.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, SnapshotError::Io { .. }));

    let broken = temp.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    assert!(matches!(
        load_snapshot(&broken).unwrap_err(),
        SnapshotError::Json { .. }
    ));
}

#[test]
fn test_path_list_form_is_accepted() {
    let raw = RawRecord {
        ino: Some("5".to_string()),
        path: Some(RawPaths::List(vec![
            "/mnt/user/a/x".to_string(),
            "/mnt/user/b/x".to_string(),
        ])),
        size: Some("10".to_string()),
        ..Default::default()
    };
    let (record, warnings) = parse(&raw, '|').unwrap();
    assert!(warnings.is_empty());
    assert_eq!(record.paths.len(), 2);
}

#[test]
fn test_missing_size_is_malformed() {
    let raw = RawRecord {
        ino: Some("5".to_string()),
        path: Some(RawPaths::Joined("/a".to_string())),
        ..Default::default()
    };
    assert!(matches!(
        parse(&raw, '|').unwrap_err(),
        RecordError::MissingField { field: "size", .. }
    ));
}

#[test]
fn test_unparsable_nlink_and_mtime_are_malformed() {
    let mut raw = RawRecord {
        ino: Some("5".to_string()),
        path: Some(RawPaths::Joined("/a".to_string())),
        size: Some("10".to_string()),
        nlink: Some("two".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        parse(&raw, '|').unwrap_err(),
        RecordError::InvalidField { field: "nlink", .. }
    ));

    raw.nlink = None;
    raw.mtime = Some("yesterday".to_string());
    assert!(matches!(
        parse(&raw, '|').unwrap_err(),
        RecordError::InvalidField { field: "mtime", .. }
    ));
}

#[test]
fn test_duplicate_path_is_collapsed_with_warning() {
    let raw = RawRecord {
        ino: Some("5".to_string()),
        path: Some(RawPaths::Joined("/a|/b|/a".to_string())),
        size: Some("10".to_string()),
        ..Default::default()
    };
    let (record, warnings) = parse(&raw, '|').unwrap();
    assert_eq!(record.paths, vec!["/a", "/b"]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::DuplicatePath);
}

#[test]
fn test_encode_roundtrip_through_store_form() {
    let config = ReviewConfig::default();
    let raws: Vec<RawRecord> = serde_json::from_str(SEEDED).unwrap();
    let batch = ingest(raws, config.path_delimiter);

    let encoded = RawRecord::from_record(&batch.records[0], &config);
    assert_eq!(
        encoded.path,
        Some(RawPaths::Joined(
            "/mnt/user/share/hardlink_A.txt|/mnt/user/share/hardlink_B.txt".to_string()
        ))
    );
    assert_eq!(encoded.shares, vec!["share".to_string()]);

    let (decoded, _) = parse(&encoded, config.path_delimiter).unwrap();
    assert_eq!(decoded, batch.records[0]);
}

#[test]
fn test_custom_delimiter() {
    let raw = RawRecord {
        ino: Some("5".to_string()),
        path: Some(RawPaths::Joined("/a;/b".to_string())),
        size: Some("10".to_string()),
        ..Default::default()
    };
    let (record, _) = parse(&raw, ';').unwrap();
    assert_eq!(record.paths.len(), 2);
}

#[test]
fn test_record_set_from_ingested_batch() {
    let raws: Vec<RawRecord> = serde_json::from_str(SEEDED).unwrap();
    let batch = ingest(raws, '|');

    let mut set = RecordSet::new();
    let summary = set.replace_all(batch.records);
    assert_eq!(summary.added, 2);
    assert_eq!(set.position(Ino::new(999)), Some(0));
    assert_eq!(set.position(Ino::new(888)), Some(1));
}
