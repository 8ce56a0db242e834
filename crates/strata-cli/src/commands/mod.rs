//! Subcommand implementations

pub mod columns;
pub mod db;

use rusqlite::Connection;
use std::path::PathBuf;
use strata_store::manifest::Manifest;

/// Paths shared by every subcommand
#[derive(Debug, Clone)]
pub struct Context {
    pub db: PathBuf,
    pub manifest: PathBuf,
}

impl Context {
    pub fn load_manifest(&self) -> strata_store::Result<Manifest> {
        Manifest::from_file(&self.manifest)
    }

    pub fn open_db(&self) -> strata_store::Result<Connection> {
        strata_store::db::open(&self.db)
    }
}
