use crate::errors::{Result, StrataError};
use std::collections::HashSet;

/// Name of the store-assigned identity column on every mapped table
pub const IDENTITY_COLUMN: &str = "id";

const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate a table or column name
///
/// Accepted names are plain SQL identifiers: an ASCII letter or underscore
/// followed by ASCII letters, digits or underscores. Names starting with
/// `sqlite_` are reserved by the engine.
///
/// # Errors
/// `InvalidIdentifier` describing the first rule the name breaks.
pub fn validate_identifier(name: &str) -> Result<()> {
    let invalid = |reason: &str| StrataError::InvalidIdentifier {
        identifier: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid("identifier cannot be empty"));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid("must start with a letter or underscore"));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain letters, digits and underscores"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("longer than 63 characters"));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(invalid("the sqlite_ prefix is reserved"));
    }
    Ok(())
}

/// Validate a table definition and return its columns in declaration order
///
/// # Errors
/// - `InvalidIdentifier` for a malformed table or column name
/// - `ConfigurationConflict` for a duplicated column or a column named `id`
pub fn validate_definition<S: AsRef<str>>(table: &str, columns: &[S]) -> Result<Vec<String>> {
    validate_identifier(table)?;

    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(columns.len());
    for column in columns {
        let column = column.as_ref();
        validate_identifier(column)?;

        if column.eq_ignore_ascii_case(IDENTITY_COLUMN) {
            return Err(StrataError::ConfigurationConflict {
                table: table.to_string(),
                reason: "column 'id' is the identity column and cannot be mapped".to_string(),
            });
        }
        // SQLite column names are case-insensitive
        if !seen.insert(column.to_ascii_lowercase()) {
            return Err(StrataError::ConfigurationConflict {
                table: table.to_string(),
                reason: format!("column '{}' is declared more than once", column),
            });
        }
        validated.push(column.to_string());
    }

    Ok(validated)
}
