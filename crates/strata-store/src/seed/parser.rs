//! Seed parser with validation
//!
//! Checks the schema version and table identifiers. Columns are checked
//! against the registered mappings at import time.

use crate::errors::{seed_validation, Result};
use crate::seed::format_v0::SeedV0;
use std::fs;
use std::path::Path;
use strata_core::rules::validation::{validate_identifier, IDENTITY_COLUMN};

/// Parse a seed file from a path
pub fn parse_seed_file(path: &Path) -> Result<SeedV0> {
    let content = fs::read_to_string(path)
        .map_err(|e| seed_validation(&format!("Failed to read seed file: {}", e)))?;

    parse_seed_str(&content)
}

/// Parse a seed from a string
pub fn parse_seed_str(content: &str) -> Result<SeedV0> {
    let seed: SeedV0 = serde_yaml::from_str(content)
        .map_err(|e| seed_validation(&format!("YAML parse error: {}", e)))?;

    validate_seed(&seed)?;

    Ok(seed)
}

fn validate_seed(seed: &SeedV0) -> Result<()> {
    if seed.schema_version != 0 {
        return Err(seed_validation(&format!(
            "Unsupported schema_version: {}. Expected 0",
            seed.schema_version
        )));
    }

    for table in &seed.tables {
        validate_identifier(&table.table)
            .map_err(|e| seed_validation(&format!("Invalid table name: {}", e)))?;

        for (index, row) in table.rows.iter().enumerate() {
            if row.contains_key(IDENTITY_COLUMN) {
                return Err(seed_validation(&format!(
                    "Row {} of table {} sets '{}'; identities are assigned by the store",
                    index, table.table, IDENTITY_COLUMN
                )));
            }
        }
    }

    Ok(())
}
