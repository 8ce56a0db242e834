//! Strata Store - SQLite persistence for the record mapper
//!
//! Provides:
//! - Connection management (`db`)
//! - The schema migration ledger (`migrations`)
//! - The record mapper and mapper registry (`repo`)
//! - YAML seed parsing and import (`seed`)
//! - The project manifest listing models and migrations (`manifest`)

pub mod db;
pub mod errors;
pub mod manifest;
pub mod migrations;
pub mod repo;
pub mod seed;

// Re-export key types
pub use errors::Result;
pub use migrations::{MigrationLedger, MigrationStep};
pub use repo::{MapperRegistry, RecordMapper};
