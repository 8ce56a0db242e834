//! Project manifest
//!
//! The manifest lists a project's mapped models and its migrations explicitly;
//! nothing is discovered from file names.
//!
//! ```yaml
//! schema_version: 0
//! models:
//!   - table: artists
//!     columns: [name, genre, age, hometown]
//! migrations:
//!   - sequence: 1
//!     name: create_artists
//!     change:
//!       - create_table:
//!           table: artists
//!           columns:
//!             - { name: name, type: string }
//!   - sequence: 2
//!     name: backfill_genres
//!     up: "UPDATE artists SET genre = 'unknown' WHERE genre IS NULL"
//!     down: "UPDATE artists SET genre = NULL WHERE genre = 'unknown'"
//! ```

use crate::errors::{manifest_validation, Result};
use crate::migrations::{Action, MigrationLedger, MigrationStep, SchemaChange};
use crate::repo::MapperRegistry;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub schema_version: u32,
    #[serde(default)]
    pub models: Vec<ModelEntry>,
    #[serde(default)]
    pub migrations: Vec<MigrationEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    pub table: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// One migration: either raw `up`/`down` SQL or a declarative `change` list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationEntry {
    pub sequence: i64,
    pub name: String,
    #[serde(default)]
    pub up: Option<String>,
    #[serde(default)]
    pub down: Option<String>,
    #[serde(default)]
    pub change: Option<Vec<SchemaChange>>,
}

impl MigrationEntry {
    fn to_step(&self) -> Result<MigrationStep> {
        match (&self.up, &self.change) {
            (Some(up), None) => {
                let step = MigrationStep::sql(self.sequence, &self.name, up.clone());
                Ok(match &self.down {
                    Some(down) => step.with_reverse(Action::sql(down.clone())),
                    None => step,
                })
            }
            (None, Some(changes)) => {
                let step = MigrationStep::change(self.sequence, &self.name, changes.clone());
                Ok(match &self.down {
                    Some(down) => step.with_reverse(Action::sql(down.clone())),
                    None => step,
                })
            }
            (Some(_), Some(_)) => Err(manifest_validation(&format!(
                "Migration {} sets both 'up' and 'change'",
                self.sequence
            ))),
            (None, None) => Err(manifest_validation(&format!(
                "Migration {} needs either 'up' or 'change'",
                self.sequence
            ))),
        }
    }
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            manifest_validation(&format!(
                "Failed to read manifest {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)
            .map_err(|e| manifest_validation(&format!("YAML parse error: {}", e)))?;

        if manifest.schema_version != 0 {
            return Err(manifest_validation(&format!(
                "Unsupported schema_version: {}. Expected 0",
                manifest.schema_version
            )));
        }

        Ok(manifest)
    }

    /// Migration steps in manifest order; a `down` overrides any derived reverse
    pub fn steps(&self) -> Result<Vec<MigrationStep>> {
        self.migrations.iter().map(MigrationEntry::to_step).collect()
    }

    /// Ledger over [`steps`](Self::steps)
    ///
    /// # Errors
    /// `DuplicateStepSequence` or a malformed migration entry.
    pub fn ledger(&self) -> Result<MigrationLedger> {
        MigrationLedger::new(self.steps()?)
    }

    /// Registry with every listed model defined
    ///
    /// # Errors
    /// `ConfigurationConflict` if a table is listed twice with different columns.
    pub fn registry(&self) -> Result<MapperRegistry> {
        let mut registry = MapperRegistry::new();
        for model in &self.models {
            registry.define(&model.table, &model.columns)?;
        }
        Ok(registry)
    }
}
