//! Registry of table mappings
//!
//! Each table is defined once; redefining it with a different column set is a
//! configuration error.

use crate::errors::{unmapped_table, Result};
use crate::repo::RecordMapper;
use std::collections::BTreeMap;
use strata_core::errors::StrataError;

#[derive(Debug, Clone, Default)]
pub struct MapperRegistry {
    mappers: BTreeMap<String, RecordMapper>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping, or return the existing one if it has the same columns
    ///
    /// Column order does not matter when comparing definitions.
    ///
    /// # Errors
    /// - `ConfigurationConflict` if `table` is already defined with other columns
    /// - any error from [`RecordMapper::define`]
    pub fn define<S: AsRef<str>>(&mut self, table: &str, columns: &[S]) -> Result<RecordMapper> {
        let candidate = RecordMapper::define(table, columns)?;

        if let Some(existing) = self.mappers.get(table) {
            if existing.same_definition(&candidate) {
                return Ok(existing.clone());
            }
            return Err(StrataError::ConfigurationConflict {
                table: table.to_string(),
                reason: format!(
                    "already defined with columns [{}], redefined with [{}]",
                    existing.columns().join(", "),
                    candidate.columns().join(", ")
                ),
            }
            .into());
        }

        tracing::debug!(table, columns = ?candidate.columns(), "mapping defined");
        self.mappers.insert(table.to_string(), candidate.clone());
        Ok(candidate)
    }

    pub fn get(&self, table: &str) -> Option<&RecordMapper> {
        self.mappers.get(table)
    }

    /// Like [`get`](Self::get), failing with `ConfigurationConflict` for an unmapped table
    pub fn mapper(&self, table: &str) -> Result<&RecordMapper> {
        self.get(table).ok_or_else(|| unmapped_table(table))
    }

    /// Defined tables, sorted by name
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.mappers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}
