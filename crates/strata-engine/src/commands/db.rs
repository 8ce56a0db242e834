//! Database task handlers with boundary logging.
//!
//! This module provides the handlers behind `strata db ...`:
//! - Apply pending migrations
//! - Roll back the last applied migration
//! - Report migration status
//! - Import a seed file
//!
//! ## Logging Ownership
//!
//! The engine layer owns lifecycle logging for these tasks:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal details.

use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_store::errors::Result;
use strata_store::migrations::{AppliedStep, ChecksumDrift, StepStatus};
use strata_store::seed::{import_seed_file, SeedReport};
use strata_store::{MapperRegistry, MigrationLedger};

/// Applied/pending state of every known step, plus any checksum drift
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub steps: Vec<StepStatus>,
    pub drift: Vec<ChecksumDrift>,
}

impl StatusReport {
    pub fn pending(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_applied()).count()
    }
}

/// Apply every pending migration step
///
/// ## Returns
///
/// The steps applied by this run, ascending; empty when up to date.
///
/// ## Errors
///
/// - `MigrationFailed`: a step failed; earlier steps from this run stay applied
/// - `StoreUnavailable`: the database could not be reached
pub fn migrate(ledger: &MigrationLedger, conn: &mut Connection) -> Result<Vec<AppliedStep>> {
    log_op_start!("db_migrate", known_len = ledger.steps().len());
    let start = std::time::Instant::now();

    let applied = ledger.apply_pending(conn).map_err(|e| {
        log_op_error!(
            "db_migrate",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "db_migrate",
        duration_ms = start.elapsed().as_millis() as u64,
        applied_len = applied.len()
    );

    Ok(applied)
}

/// Roll back the most recently applied step
///
/// ## Errors
///
/// - `NothingToRollBack`: no step is applied
/// - `NoReverseDefined`: the last step cannot be reversed
/// - `UnknownStep`: the last applied step is not in the manifest
pub fn rollback(ledger: &MigrationLedger, conn: &mut Connection) -> Result<AppliedStep> {
    log_op_start!("db_rollback");
    let start = std::time::Instant::now();

    let step = ledger.rollback_last(conn).map_err(|e| {
        log_op_error!(
            "db_rollback",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "db_rollback",
        duration_ms = start.elapsed().as_millis() as u64,
        sequence = step.sequence
    );

    Ok(step)
}

/// Report applied/pending steps and checksum drift
pub fn status(ledger: &MigrationLedger, conn: &Connection) -> Result<StatusReport> {
    log_op_start!("db_status");
    let start = std::time::Instant::now();

    let result = status_impl(ledger, conn).map_err(|e| {
        log_op_error!(
            "db_status",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "db_status",
        duration_ms = start.elapsed().as_millis() as u64,
        pending_len = result.pending(),
        drift_len = result.drift.len()
    );

    Ok(result)
}

fn status_impl(ledger: &MigrationLedger, conn: &Connection) -> Result<StatusReport> {
    let steps = ledger.status(conn)?;
    let drift = ledger.verify_checksums(conn)?;
    if !drift.is_empty() {
        tracing::debug!(drift_len = drift.len(), "applied steps changed since applied");
    }
    Ok(StatusReport { steps, drift })
}

/// Import a seed file through the registered mappers, in one transaction
///
/// ## Errors
///
/// - `InvalidInput`: the seed file is unreadable or malformed
/// - `ConfigurationConflict`: a seed table has no mapping
/// - `UnknownAttribute`: a row sets an undeclared column
pub fn seed(path: &Path, registry: &MapperRegistry, conn: &mut Connection) -> Result<SeedReport> {
    log_op_start!("db_seed", path = %path.display());
    let start = std::time::Instant::now();

    let report = import_seed_file(path, conn, registry).map_err(|e| {
        log_op_error!(
            "db_seed",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "db_seed",
        duration_ms = start.elapsed().as_millis() as u64,
        inserted_len = report.inserted(),
        digest = %report.digest
    );

    Ok(report)
}
