//! Migration ledger
//!
//! Applies steps exactly once, in ascending sequence order, recording each in
//! the `schema_migrations` table.
//!
//! Each step's forward action and its ledger row are written in one
//! transaction, so a failed step leaves no trace. Two processes racing to
//! apply the same pending step are serialized only by SQLite's write lock:
//! the loser's ledger insert hits the primary key and its step is reported as
//! failed, after its forward action has been rolled back with its transaction.

use crate::errors::{from_rusqlite, Result};
use crate::migrations::step::MigrationStep;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use strata_core::errors::{ExError, ExErrorKind, StrataError};

/// Name of the ledger table
pub const LEDGER_TABLE: &str = "schema_migrations";

/// A step applied (or rolled back) by a ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedStep {
    pub sequence: i64,
    pub name: String,
}

impl From<&MigrationStep> for AppliedStep {
    fn from(step: &MigrationStep) -> Self {
        Self {
            sequence: step.sequence(),
            name: step.name().to_string(),
        }
    }
}

/// Applied/pending state of one known step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStatus {
    pub sequence: i64,
    pub name: String,
    pub applied_at: Option<DateTime<Utc>>,
    pub reversible: bool,
}

impl StepStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// An applied step whose definition changed after it was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumDrift {
    pub sequence: i64,
    pub name: String,
    pub recorded: String,
    pub current: String,
}

/// Apply every pending step in `steps` (convenience over [`MigrationLedger`])
///
/// # Errors
/// See [`MigrationLedger::new`] and [`MigrationLedger::apply_pending`].
pub fn apply_pending(conn: &mut Connection, steps: Vec<MigrationStep>) -> Result<Vec<AppliedStep>> {
    MigrationLedger::new(steps)?.apply_pending(conn)
}

/// The ordered catalogue of known steps plus the operations over the ledger table
///
/// Not safe for concurrent `apply_pending` callers beyond what SQLite's write
/// lock provides; see the module docs.
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    steps: Vec<MigrationStep>,
}

impl MigrationLedger {
    /// Build a ledger from steps in any order
    ///
    /// Steps are sorted by sequence; input order is irrelevant.
    ///
    /// # Errors
    /// `DuplicateStepSequence` if two steps share a sequence. Nothing has run yet.
    pub fn new(mut steps: Vec<MigrationStep>) -> Result<Self> {
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.sequence()) {
                return Err(StrataError::DuplicateStepSequence {
                    sequence: step.sequence(),
                }
                .into());
            }
        }
        steps.sort_by_key(MigrationStep::sequence);
        Ok(Self { steps })
    }

    /// Known steps in ascending sequence order
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    fn step(&self, sequence: i64) -> Option<&MigrationStep> {
        self.steps
            .binary_search_by_key(&sequence, MigrationStep::sequence)
            .ok()
            .map(|i| &self.steps[i])
    }

    /// Apply every step not yet recorded, in ascending sequence order
    ///
    /// Returns the steps applied by this call; empty when nothing was pending.
    ///
    /// # Errors
    /// `MigrationFailed` at the first failing step. Steps applied earlier in
    /// the same call stay applied and are listed in the error's `applied()`.
    /// `StoreUnavailable` if the store is busy, locked or unreachable, carrying
    /// the failing step's sequence and the same `applied()` list.
    /// `Persistence` if the ledger itself cannot be read.
    pub fn apply_pending(&self, conn: &mut Connection) -> Result<Vec<AppliedStep>> {
        ensure_ledger_table(conn)?;
        let already = self.applied_sequences(conn)?;

        let mut applied = Vec::new();
        for step in self.steps.iter().filter(|s| !already.contains(&s.sequence())) {
            tracing::debug!(sequence = step.sequence(), name = step.name(), "applying step");
            apply_step(conn, step).map_err(|source| {
                let applied: Vec<i64> = applied.iter().map(|a: &AppliedStep| a.sequence).collect();
                // An unreachable store is reported as such, not as a broken step
                if source.kind() == ExErrorKind::StoreUnavailable {
                    return source
                        .with_op("apply_pending")
                        .with_sequence(step.sequence())
                        .with_applied(applied);
                }
                ExError::from(StrataError::MigrationFailed {
                    sequence: step.sequence(),
                    name: step.name().to_string(),
                    reason: source.message().to_string(),
                    applied,
                })
                .with_source(source)
            })?;
            applied.push(AppliedStep::from(step));
        }

        Ok(applied)
    }

    /// Reverse the step with the highest applied sequence
    ///
    /// # Errors
    /// - `NothingToRollBack` if no step is applied
    /// - `UnknownStep` if the highest applied sequence is not in this ledger
    /// - `NoReverseDefined` if that step has no reverse action
    /// - the reverse action's own error, with the ledger left unchanged
    pub fn rollback_last(&self, conn: &mut Connection) -> Result<AppliedStep> {
        let last = self
            .applied_sequences(conn)?
            .last()
            .copied()
            .ok_or(StrataError::NothingToRollBack)?;

        let step = self
            .step(last)
            .ok_or(StrataError::UnknownStep { sequence: last })?;
        let reverse = step.reverse().ok_or_else(|| StrataError::NoReverseDefined {
            sequence: step.sequence(),
            name: step.name().to_string(),
        })?;

        tracing::debug!(sequence = last, name = step.name(), "rolling back step");
        let tx = conn.transaction().map_err(from_rusqlite)?;
        reverse
            .run(&tx)
            .map_err(|e| e.with_op("rollback_last").with_sequence(last))?;
        tx.execute(
            &format!("DELETE FROM {} WHERE sequence = ?1", LEDGER_TABLE),
            [last],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;

        Ok(AppliedStep::from(step))
    }

    /// Snapshot of applied sequences; empty if the ledger table does not exist yet
    pub fn applied_sequences(&self, conn: &Connection) -> Result<BTreeSet<i64>> {
        Ok(read_ledger(conn)?.into_keys().collect())
    }

    /// Applied/pending state for every known step, ascending
    pub fn status(&self, conn: &Connection) -> Result<Vec<StepStatus>> {
        let ledger = read_ledger(conn)?;
        Ok(self
            .steps
            .iter()
            .map(|step| StepStatus {
                sequence: step.sequence(),
                name: step.name().to_string(),
                applied_at: ledger
                    .get(&step.sequence())
                    .and_then(|row| DateTime::from_timestamp(row.applied_at, 0)),
                reversible: step.is_reversible(),
            })
            .collect())
    }

    /// Applied steps whose recorded checksum differs from the current definition
    pub fn verify_checksums(&self, conn: &Connection) -> Result<Vec<ChecksumDrift>> {
        let ledger = read_ledger(conn)?;
        Ok(self
            .steps
            .iter()
            .filter_map(|step| {
                let recorded = ledger.get(&step.sequence())?.checksum.clone()?;
                let current = step.checksum();
                (recorded != current).then(|| ChecksumDrift {
                    sequence: step.sequence(),
                    name: step.name().to_string(),
                    recorded,
                    current,
                })
            })
            .collect())
    }
}

struct LedgerRow {
    applied_at: i64,
    checksum: Option<String>,
}

/// Create the ledger table if it doesn't exist
fn ensure_ledger_table(conn: &Connection) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                sequence INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL,
                checksum TEXT
            )",
            LEDGER_TABLE
        ),
        [],
    )
    .map_err(from_rusqlite)?;

    Ok(())
}

fn ledger_exists(conn: &Connection) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [LEDGER_TABLE],
            |_| Ok(()),
        )
        .optional()
        .map_err(from_rusqlite)?;
    Ok(found.is_some())
}

fn read_ledger(conn: &Connection) -> Result<HashMap<i64, LedgerRow>> {
    if !ledger_exists(conn)? {
        return Ok(HashMap::new());
    }

    let mut stmt = conn
        .prepare(&format!(
            "SELECT sequence, applied_at, checksum FROM {}",
            LEDGER_TABLE
        ))
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                LedgerRow {
                    applied_at: row.get(1)?,
                    checksum: row.get(2)?,
                },
            ))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(from_rusqlite)?;

    Ok(rows)
}

/// Run one step's forward action and record it, atomically
fn apply_step(conn: &mut Connection, step: &MigrationStep) -> Result<()> {
    let tx = conn.transaction().map_err(from_rusqlite)?;

    step.forward().run(&tx)?;

    let now = Utc::now().timestamp();
    tx.execute(
        &format!(
            "INSERT INTO {} (sequence, name, applied_at, checksum) VALUES (?1, ?2, ?3, ?4)",
            LEDGER_TABLE
        ),
        rusqlite::params![step.sequence(), step.name(), now, step.checksum()],
    )
    .map_err(from_rusqlite)?;

    tx.commit().map_err(from_rusqlite)?;

    Ok(())
}
