//! Strata Engine - Task orchestration layer
//!
//! Runs the database tasks (migrate, rollback, status, seed, column listing)
//! over the store, owning their lifecycle logging.

pub mod commands;
