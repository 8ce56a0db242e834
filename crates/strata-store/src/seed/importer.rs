//! Seed importer
//!
//! Inserts every seed row through its table's `RecordMapper`, in file order,
//! inside one transaction: a bad row leaves the database untouched.

use crate::errors::{from_rusqlite, Result};
use crate::repo::MapperRegistry;
use crate::seed::{compute_seed_digest, parse_seed_file, SeedV0};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use strata_core::model::Entity;

/// Outcome of a seed import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub digest: String,
    pub tables: Vec<SeededTable>,
}

/// Identities assigned to one table's seed rows, in row order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeededTable {
    pub table: String,
    pub identities: Vec<i64>,
}

impl SeedReport {
    pub fn inserted(&self) -> usize {
        self.tables.iter().map(|t| t.identities.len()).sum()
    }
}

/// Parse and import a seed file
pub fn import_seed_file(
    path: &Path,
    conn: &mut Connection,
    registry: &MapperRegistry,
) -> Result<SeedReport> {
    let seed = parse_seed_file(path)?;
    import_seed(&seed, conn, registry)
}

/// Import a parsed seed
///
/// # Errors
/// - `ConfigurationConflict` if a seed table has no registered mapping
/// - `UnknownAttribute` if a row sets an undeclared column
/// - store errors from the inserts
///
/// On any error the transaction is rolled back.
pub fn import_seed(
    seed: &SeedV0,
    conn: &mut Connection,
    registry: &MapperRegistry,
) -> Result<SeedReport> {
    // Resolve every mapping before touching the database
    let mappers = seed
        .tables
        .iter()
        .map(|t| registry.mapper(&t.table))
        .collect::<Result<Vec<_>>>()?;
    let digest = compute_seed_digest(seed)?;

    let tx = conn.transaction().map_err(from_rusqlite)?;

    let mut tables = Vec::with_capacity(seed.tables.len());
    for (seed_table, mapper) in seed.tables.iter().zip(mappers) {
        let mut identities = Vec::with_capacity(seed_table.rows.len());
        for row in &seed_table.rows {
            let mut entity = Entity::from_attributes(row.clone());
            identities.push(mapper.insert(&tx, &mut entity)?);
        }
        tracing::debug!(table = %seed_table.table, rows = identities.len(), "seeded table");
        tables.push(SeededTable {
            table: seed_table.table.clone(),
            identities,
        });
    }

    tx.commit().map_err(from_rusqlite)?;

    Ok(SeedReport {
        digest,
        tables,
    })
}
