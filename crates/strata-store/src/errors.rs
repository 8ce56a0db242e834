//! Error handling for strata-store
//!
//! Wraps the strata-core ExError with store-specific helpers

use rusqlite::ErrorCode;
use strata_core::errors::{ExError, ExErrorKind, StrataError};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
///
/// Failures to reach the database (cannot open, busy, locked, not a database)
/// are classified as `StoreUnavailable`; everything else is `Persistence`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let unavailable = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::NotADatabase
                    | ErrorCode::PermissionDenied
            )
    );

    if unavailable {
        StrataError::StoreUnavailable {
            reason: err.to_string(),
        }
        .into()
    } else {
        ExError::new(ExErrorKind::Persistence)
            .with_op("sqlite")
            .with_message(err.to_string())
    }
}

/// Create a seed validation error
pub fn seed_validation(reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("seed_parse")
        .with_message(reason.to_string())
}

/// Create a manifest validation error
pub fn manifest_validation(reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("manifest_parse")
        .with_message(reason.to_string())
}

/// Error for a table with no registered mapping
pub fn unmapped_table(table: &str) -> ExError {
    ExError::new(ExErrorKind::ConfigurationConflict)
        .with_op("mapper_lookup")
        .with_table(table)
        .with_message(format!("No mapping defined for table {}", table))
}

/// Create a serialization error
pub fn serialization_error(operation: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
