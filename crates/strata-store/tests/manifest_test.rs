// Integration tests for the project manifest

use rusqlite::Connection;
use std::path::PathBuf;
use strata_core::ExErrorKind;
use strata_store::manifest::Manifest;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_manifest_fixture_loads() {
    let manifest = Manifest::from_file(&fixtures_dir().join("students_manifest.yaml")).unwrap();

    assert_eq!(manifest.models.len(), 2);
    let ledger = manifest.ledger().unwrap();
    let sequences: Vec<i64> = ledger.steps().iter().map(|s| s.sequence()).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let registry = manifest.registry().unwrap();
    let tables: Vec<&str> = registry.tables().collect();
    assert_eq!(tables, vec!["artists", "students"]);
}

#[test]
fn test_manifest_steps_apply_and_roll_back() {
    // Given: The fixture manifest applied
    let mut conn = Connection::open_in_memory().unwrap();
    let manifest = Manifest::from_file(&fixtures_dir().join("students_manifest.yaml")).unwrap();
    let ledger = manifest.ledger().unwrap();
    ledger.apply_pending(&mut conn).unwrap();

    // When: Rolling back the SQL-only backfill step
    let err = ledger.rollback_last(&mut conn).unwrap_err();

    // Then: It has no reverse
    assert_eq!(err.kind(), ExErrorKind::NoReverseDefined);
    assert_eq!(err.sequence(), Some(3));
}

#[test]
fn test_down_sql_overrides_derived_reverse() {
    // Given: A change step with an explicit down
    let manifest = Manifest::parse_str(
        r#"
schema_version: 0
migrations:
  - sequence: 1
    name: create_artists
    change:
      - create_table: { table: artists, columns: [{ name: name, type: string }] }
    down: "DROP TABLE artists"
"#,
    )
    .unwrap();
    let mut conn = Connection::open_in_memory().unwrap();
    let ledger = manifest.ledger().unwrap();
    ledger.apply_pending(&mut conn).unwrap();

    // When: Rolled back
    let step = ledger.rollback_last(&mut conn).unwrap();

    // Then: The step is no longer applied
    assert_eq!(step.name, "create_artists");
    assert!(ledger.applied_sequences(&conn).unwrap().is_empty());
}

#[test]
fn test_unknown_manifest_keys_rejected() {
    let err = Manifest::parse_str("schema_version: 0\nmodles: []\n").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(err.op(), Some("manifest_parse"));
}

#[test]
fn test_missing_manifest_file() {
    let err = Manifest::from_file(&fixtures_dir().join("absent.yaml")).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert!(err.message().contains("absent.yaml"));
}

#[test]
fn test_rename_table_change_reverses() {
    // Given: A create followed by a rename, as two change steps
    let manifest = Manifest::parse_str(
        r#"
schema_version: 0
migrations:
  - sequence: 1
    name: create_singers
    change:
      - create_table: { table: singers, columns: [{ name: name, type: string }] }
  - sequence: 2
    name: rename_singers_to_artists
    change:
      - rename_table: { from: singers, to: artists }
"#,
    )
    .unwrap();
    let mut conn = Connection::open_in_memory().unwrap();
    let ledger = manifest.ledger().unwrap();
    ledger.apply_pending(&mut conn).unwrap();

    // When: The rename is rolled back
    ledger.rollback_last(&mut conn).unwrap();

    // Then: The original table name is back
    let singers: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'singers'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(singers, 1);
}
