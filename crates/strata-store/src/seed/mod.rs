//! Seed import
//!
//! Provides:
//! - Seed Format v0 schema
//! - YAML parser with validation
//! - Digest canonicalization
//! - Importer inserting rows through the record mappers

pub mod digest;
pub mod format_v0;
pub mod importer;
pub mod parser;

pub use digest::compute_seed_digest;
pub use format_v0::{SeedTable, SeedV0};
pub use importer::{import_seed, import_seed_file, SeedReport};
pub use parser::{parse_seed_file, parse_seed_str};
