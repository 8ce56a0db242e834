//! Strata Core - entity model, error facility and logging facility
//!
//! This crate provides the foundational pieces shared by the store, engine and CLI:
//! - `Entity` and `Value`: the in-memory side of a mapped table row
//! - Identifier validation for table and column names
//! - The canonical `ExError` facility with stable error codes
//! - The structured logging facility (`init`, `log_op_*` macros, test capture)

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod rules;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, StrataError};
pub use model::{Attributes, Entity, Value};
