//! Seed Format v0 schema
//!
//! ```yaml
//! schema_version: 0
//! tables:
//!   - table: students
//!     rows:
//!       - { name: Melissa, grade: 10th }
//!       - { name: April, grade: 10th }
//! ```

use serde::{Deserialize, Serialize};
use strata_core::model::Attributes;

/// Top-level seed file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedV0 {
    /// Schema version (must be 0 for this format)
    pub schema_version: u32,

    /// Tables to seed, inserted in file order
    #[serde(default)]
    pub tables: Vec<SeedTable>,
}

/// Rows destined for one mapped table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedTable {
    pub table: String,

    /// Attribute maps; an `id` key is not allowed
    #[serde(default)]
    pub rows: Vec<Attributes>,
}

impl SeedV0 {
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}
