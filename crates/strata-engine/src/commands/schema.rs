//! Mapping inspection handlers.

use rusqlite::Connection;
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_store::errors::Result;
use strata_store::MapperRegistry;

/// Column names of a mapped table, identity first
///
/// The mapping is checked against the live table before the names are returned.
///
/// ## Errors
///
/// - `ConfigurationConflict`: the table is unmapped, missing, or lacks a declared column
pub fn columns(registry: &MapperRegistry, table: &str, conn: &Connection) -> Result<Vec<String>> {
    log_op_start!("columns", table = table);
    let start = std::time::Instant::now();

    let result = columns_impl(registry, table, conn).map_err(|e| {
        log_op_error!(
            "columns",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            table = table
        );
        e
    })?;

    log_op_end!(
        "columns",
        duration_ms = start.elapsed().as_millis() as u64,
        table = table
    );

    Ok(result)
}

fn columns_impl(registry: &MapperRegistry, table: &str, conn: &Connection) -> Result<Vec<String>> {
    let mapper = registry.mapper(table)?;
    mapper.verify_schema(conn)?;
    Ok(mapper.column_names())
}
