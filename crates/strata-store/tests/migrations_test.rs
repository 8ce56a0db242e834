// Integration tests for the migration ledger
// Covers apply/rollback ordering, idempotence and partial failure

use rusqlite::Connection;
use std::collections::BTreeSet;
use strata_core::ExErrorKind;
use strata_store::migrations::{
    Action, ColumnDef, ColumnType, MigrationLedger, MigrationStep, SchemaChange, LEDGER_TABLE,
};

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        > 0
}

fn create_table(sequence: i64, table: &str) -> MigrationStep {
    MigrationStep::change(
        sequence,
        format!("create_{}", table),
        vec![SchemaChange::CreateTable {
            table: table.to_string(),
            columns: vec![ColumnDef::new("name", ColumnType::Text)],
        }],
    )
}

fn three_steps() -> Vec<MigrationStep> {
    vec![
        create_table(1, "artists"),
        create_table(2, "students"),
        create_table(3, "dogs"),
    ]
}

fn set(values: &[i64]) -> BTreeSet<i64> {
    values.iter().copied().collect()
}

#[test]
fn test_apply_pending_on_empty_db() {
    // Given: An empty database and three steps
    let mut conn = setup_test_db();
    let ledger = MigrationLedger::new(three_steps()).unwrap();

    // When: Pending steps are applied
    let applied = ledger.apply_pending(&mut conn).unwrap();

    // Then: All three ran, in ascending order, and are recorded
    let sequences: Vec<i64> = applied.iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(ledger.applied_sequences(&conn).unwrap(), set(&[1, 2, 3]));
    assert!(table_exists(&conn, "artists"));
    assert!(table_exists(&conn, "dogs"));
    assert!(table_exists(&conn, LEDGER_TABLE));
}

#[test]
fn test_apply_pending_is_idempotent() {
    // Given: All steps already applied
    let mut conn = setup_test_db();
    let ledger = MigrationLedger::new(three_steps()).unwrap();
    ledger.apply_pending(&mut conn).unwrap();

    // When: Applied again
    let second = ledger.apply_pending(&mut conn).unwrap();

    // Then: Nothing ran and the ledger has one row per step
    assert!(second.is_empty());
    let rows: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {}", LEDGER_TABLE),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 3);
}

#[test]
fn test_steps_supplied_out_of_order_run_ascending() {
    // Given: Step 2 depends on the table step 1 creates, supplied first
    let mut conn = setup_test_db();
    let steps = vec![
        MigrationStep::sql(2, "insert_artist", "INSERT INTO artists (name) VALUES ('Solange')"),
        create_table(1, "artists"),
    ];
    let ledger = MigrationLedger::new(steps).unwrap();

    // When: Applied
    let applied = ledger.apply_pending(&mut conn).unwrap();

    // Then: Step 1 ran first, so step 2 found its table
    assert_eq!(applied[0].sequence, 1);
    assert_eq!(applied[1].sequence, 2);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM artists", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_late_lower_sequence_is_still_applied() {
    // Given: Steps 1 and 3 applied
    let mut conn = setup_test_db();
    MigrationLedger::new(vec![create_table(1, "artists"), create_table(3, "dogs")])
        .unwrap()
        .apply_pending(&mut conn)
        .unwrap();

    // When: A ledger that also knows step 2 applies pending steps
    let ledger = MigrationLedger::new(three_steps()).unwrap();
    let applied = ledger.apply_pending(&mut conn).unwrap();

    // Then: Only step 2 runs
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].sequence, 2);
    assert_eq!(ledger.applied_sequences(&conn).unwrap(), set(&[1, 2, 3]));
}

#[test]
fn test_duplicate_sequence_rejected_before_anything_runs() {
    // Given: Two steps sharing sequence 1
    let steps = vec![create_table(1, "artists"), create_table(1, "students")];

    // When: A ledger is built
    let err = MigrationLedger::new(steps).unwrap_err();

    // Then: DuplicateStepSequence names the sequence
    assert_eq!(err.kind(), ExErrorKind::DuplicateStepSequence);
    assert_eq!(err.sequence(), Some(1));

    // And: The free-function form leaves the database untouched
    let mut conn = setup_test_db();
    let result = strata_store::migrations::apply_pending(
        &mut conn,
        vec![create_table(1, "artists"), create_table(1, "students")],
    );
    assert!(result.is_err());
    assert!(!table_exists(&conn, "artists"));
    assert!(!table_exists(&conn, LEDGER_TABLE));
}

#[test]
fn test_failed_step_keeps_earlier_steps_and_leaves_no_trace() {
    // Given: Step 2 creates a table, then fails on its second statement
    let mut conn = setup_test_db();
    let steps = vec![
        create_table(1, "artists"),
        MigrationStep::sql(
            2,
            "broken",
            "CREATE TABLE half_done (x); INSERT INTO no_such_table VALUES (1);",
        ),
        create_table(3, "dogs"),
    ];
    let ledger = MigrationLedger::new(steps).unwrap();

    // When: Applied
    let err = ledger.apply_pending(&mut conn).unwrap_err();

    // Then: The error names step 2 and reports step 1 as applied
    assert_eq!(err.kind(), ExErrorKind::MigrationFailed);
    assert_eq!(err.sequence(), Some(2));
    assert_eq!(err.applied(), Some(&[1][..]));
    assert!(err.source_error().is_some());

    // And: Step 1 stays applied, step 2 left nothing behind, step 3 never ran
    assert_eq!(ledger.applied_sequences(&conn).unwrap(), set(&[1]));
    assert!(table_exists(&conn, "artists"));
    assert!(!table_exists(&conn, "half_done"));
    assert!(!table_exists(&conn, "dogs"));
}

#[test]
fn test_rollback_last_reverses_highest_step() {
    // Given: Steps 1, 2, 3 applied
    let mut conn = setup_test_db();
    let ledger = MigrationLedger::new(three_steps()).unwrap();
    ledger.apply_pending(&mut conn).unwrap();

    // When: The last step is rolled back
    let rolled_back = ledger.rollback_last(&mut conn).unwrap();

    // Then: Step 3 is undone and no longer recorded
    assert_eq!(rolled_back.sequence, 3);
    assert_eq!(ledger.applied_sequences(&conn).unwrap(), set(&[1, 2]));
    assert!(!table_exists(&conn, "dogs"));
    assert!(table_exists(&conn, "students"));

    // And: Applying again re-runs only step 3
    let reapplied = ledger.apply_pending(&mut conn).unwrap();
    assert_eq!(reapplied.len(), 1);
    assert_eq!(reapplied[0].sequence, 3);
}

#[test]
fn test_rollback_without_reverse_leaves_ledger_unchanged() {
    // Given: Step 2 has no reverse action
    let mut conn = setup_test_db();
    let steps = vec![
        create_table(1, "artists"),
        MigrationStep::sql(2, "add_index", "CREATE INDEX artists_name ON artists (name)"),
    ];
    let ledger = MigrationLedger::new(steps).unwrap();
    ledger.apply_pending(&mut conn).unwrap();

    // When: Rollback is attempted
    let err = ledger.rollback_last(&mut conn).unwrap_err();

    // Then: NoReverseDefined, and both steps are still applied
    assert_eq!(err.kind(), ExErrorKind::NoReverseDefined);
    assert_eq!(err.sequence(), Some(2));
    assert_eq!(ledger.applied_sequences(&conn).unwrap(), set(&[1, 2]));
}

#[test]
fn test_rollback_with_nothing_applied() {
    // Given: A fresh database
    let mut conn = setup_test_db();
    let ledger = MigrationLedger::new(three_steps()).unwrap();

    // When: Rollback is attempted
    let err = ledger.rollback_last(&mut conn).unwrap_err();

    // Then: NothingToRollBack
    assert_eq!(err.kind(), ExErrorKind::NothingToRollBack);
}

#[test]
fn test_rollback_of_step_missing_from_ledger_steps() {
    // Given: Step 3 applied by a ledger the current one does not match
    let mut conn = setup_test_db();
    MigrationLedger::new(three_steps())
        .unwrap()
        .apply_pending(&mut conn)
        .unwrap();
    let ledger = MigrationLedger::new(vec![create_table(1, "artists")]).unwrap();

    // When: Rollback is attempted
    let err = ledger.rollback_last(&mut conn).unwrap_err();

    // Then: UnknownStep names sequence 3, and nothing changed
    assert_eq!(err.kind(), ExErrorKind::UnknownStep);
    assert_eq!(err.sequence(), Some(3));
    assert!(table_exists(&conn, "dogs"));
}

#[test]
fn test_failed_reverse_keeps_step_applied() {
    // Given: A step whose reverse action fails
    let mut conn = setup_test_db();
    let step = create_table(1, "artists")
        .with_reverse(Action::sql("DROP TABLE artists; DROP TABLE no_such_table;"));
    let ledger = MigrationLedger::new(vec![step]).unwrap();
    ledger.apply_pending(&mut conn).unwrap();

    // When: Rollback is attempted
    let err = ledger.rollback_last(&mut conn).unwrap_err();

    // Then: The step is still applied and its table still exists
    assert_eq!(err.op(), Some("rollback_last"));
    assert_eq!(ledger.applied_sequences(&conn).unwrap(), set(&[1]));
    assert!(table_exists(&conn, "artists"));
}

#[test]
fn test_custom_action_runs_inside_step_transaction() {
    // Given: A code step that inserts a row
    let mut conn = setup_test_db();
    let steps = vec![
        create_table(1, "artists"),
        MigrationStep::new(
            2,
            "seed_artist",
            Action::custom("insert Beyonce", |conn| {
                conn.execute("INSERT INTO artists (name) VALUES ('Beyonce')", [])
                    .map(|_| ())
                    .map_err(strata_store::errors::from_rusqlite)
            }),
        ),
    ];
    let ledger = MigrationLedger::new(steps).unwrap();

    // When: Applied
    ledger.apply_pending(&mut conn).unwrap();

    // Then: The row exists
    let name: String = conn
        .query_row("SELECT name FROM artists", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "Beyonce");
}

#[test]
fn test_status_and_checksum_drift() {
    // Given: Step 1 applied, step 2 pending
    let mut conn = setup_test_db();
    MigrationLedger::new(vec![create_table(1, "artists")])
        .unwrap()
        .apply_pending(&mut conn)
        .unwrap();
    let ledger = MigrationLedger::new(vec![create_table(1, "artists"), create_table(2, "students")])
        .unwrap();

    // When: Status is read
    let status = ledger.status(&conn).unwrap();

    // Then: Step 1 is applied and step 2 is pending
    assert!(status[0].is_applied());
    assert!(!status[1].is_applied());
    assert!(status[0].reversible);
    assert!(ledger.verify_checksums(&conn).unwrap().is_empty());

    // And: Redefining step 1 is reported as drift
    let edited = MigrationLedger::new(vec![MigrationStep::sql(
        1,
        "create_artists",
        "CREATE TABLE artists (id INTEGER PRIMARY KEY, title TEXT)",
    )])
    .unwrap();
    let drift = edited.verify_checksums(&conn).unwrap();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].sequence, 1);
    assert_ne!(drift[0].recorded, drift[0].current);
}

#[test]
fn test_locked_store_is_reported_as_unavailable() {
    // Given: Step 1 applied through connection A of a file database
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("busy.sqlite3");
    let mut conn_a = strata_store::db::open(&path).unwrap();
    conn_a
        .busy_timeout(std::time::Duration::from_millis(50))
        .unwrap();
    MigrationLedger::new(vec![create_table(1, "artists")])
        .unwrap()
        .apply_pending(&mut conn_a)
        .unwrap();

    // And: Connection B holds the write lock
    let conn_b = strata_store::db::open(&path).unwrap();
    conn_b.execute_batch("BEGIN IMMEDIATE").unwrap();

    // When: A applies the pending step 2
    let ledger =
        MigrationLedger::new(vec![create_table(1, "artists"), create_table(2, "students")])
            .unwrap();
    let err = ledger.apply_pending(&mut conn_a).unwrap_err();

    // Then: The error is StoreUnavailable, still naming the step and the partial run
    assert_eq!(err.kind(), ExErrorKind::StoreUnavailable);
    assert_eq!(err.sequence(), Some(2));
    assert_eq!(err.applied(), Some(&[][..]));

    // And: Once the lock is released nothing from step 2 was recorded
    conn_b.execute_batch("ROLLBACK").unwrap();
    assert_eq!(ledger.applied_sequences(&conn_a).unwrap(), set(&[1]));
    assert_eq!(ledger.apply_pending(&mut conn_a).unwrap().len(), 1);
}
