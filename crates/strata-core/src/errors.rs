use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error surfaced by the ledger, the mapper or the task runner is
/// classified by one of these kinds. Each kind maps to a stable error code
/// that callers and tests can match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Ledger
    DuplicateStepSequence,
    NoReverseDefined,
    NothingToRollBack,
    UnknownStep,
    MigrationFailed,

    // Mapper
    AlreadyPersisted,
    NotFound,
    ConfigurationConflict,
    InvalidIdentifier,
    UnknownAttribute,

    // Input
    InvalidInput,

    // Integration/IO
    StoreUnavailable,
    Persistence,
    Io,
    Serialization,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::DuplicateStepSequence => "ERR_DUPLICATE_STEP_SEQUENCE",
            ExErrorKind::NoReverseDefined => "ERR_NO_REVERSE_DEFINED",
            ExErrorKind::NothingToRollBack => "ERR_NOTHING_TO_ROLL_BACK",
            ExErrorKind::UnknownStep => "ERR_UNKNOWN_STEP",
            ExErrorKind::MigrationFailed => "ERR_MIGRATION_FAILED",
            ExErrorKind::AlreadyPersisted => "ERR_ALREADY_PERSISTED",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::ConfigurationConflict => "ERR_CONFIGURATION_CONFLICT",
            ExErrorKind::InvalidIdentifier => "ERR_INVALID_IDENTIFIER",
            ExErrorKind::UnknownAttribute => "ERR_UNKNOWN_ATTRIBUTE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::StoreUnavailable => "ERR_STORE_UNAVAILABLE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus optional
/// context (operation, table, identity, migration sequence) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    table: Option<String>,
    identity: Option<i64>,
    sequence: Option<i64>,
    applied: Option<Vec<i64>>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            identity: None,
            sequence: None,
            applied: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add entity identity context
    pub fn with_identity(mut self, identity: i64) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Add migration sequence context
    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Record the sequences that were applied before a failure
    pub fn with_applied(mut self, applied: Vec<i64>) -> Self {
        self.applied = Some(applied);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the table context, if any
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Get the identity context, if any
    pub fn identity(&self) -> Option<i64> {
        self.identity
    }

    /// Get the migration sequence context, if any
    pub fn sequence(&self) -> Option<i64> {
        self.sequence
    }

    /// Sequences applied before the failing step, if this error came from `apply_pending`
    pub fn applied(&self) -> Option<&[i64]> {
        self.applied.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(identity) = self.identity {
            write!(f, " (identity: {})", identity)?;
        }
        if let Some(sequence) = self.sequence {
            write!(f, " (sequence: {})", sequence)?;
        }
        if let Some(applied) = self.applied.as_deref().filter(|a| !a.is_empty()) {
            let applied: Vec<String> = applied.iter().map(i64::to_string).collect();
            write!(f, " (applied before failure: {})", applied.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for Strata operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrataError {
    // ===== Ledger Errors =====
    /// Two supplied migration steps share a sequence number
    #[error("Duplicate migration step sequence: {sequence}")]
    DuplicateStepSequence { sequence: i64 },

    /// The step to roll back has no reverse action
    #[error("Migration step {sequence} ({name}) has no reverse action")]
    NoReverseDefined { sequence: i64, name: String },

    /// The ledger has no applied steps
    #[error("Nothing to roll back: no migration steps are applied")]
    NothingToRollBack,

    /// The ledger records a sequence that the supplied step list does not define
    #[error("Applied migration step {sequence} is not defined in the supplied steps")]
    UnknownStep { sequence: i64 },

    /// A forward action failed; earlier steps in the same run stay applied
    #[error("Migration step {sequence} ({name}) failed: {reason}")]
    MigrationFailed {
        sequence: i64,
        name: String,
        reason: String,
        applied: Vec<i64>,
    },

    // ===== Mapper Errors =====
    /// Insert was called on an entity that already has an identity
    #[error("Entity already persisted in {table} with identity {identity}")]
    AlreadyPersisted { table: String, identity: i64 },

    /// No row matches the entity's identity
    #[error("No row in {table} matches identity {identity:?}")]
    NotFound { table: String, identity: Option<i64> },

    /// A table was defined twice with different columns, or the live schema disagrees
    #[error("Configuration conflict for table {table}: {reason}")]
    ConfigurationConflict { table: String, reason: String },

    /// A table or column name is not a plain SQL identifier
    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// An entity or criteria names an attribute the mapping does not declare
    #[error("Unknown attribute '{attribute}' for table {table}")]
    UnknownAttribute { table: String, attribute: String },

    // ===== Input Errors =====
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // ===== Store Errors =====
    /// The backing store cannot be reached
    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Persistence error: {reason}")]
    Persistence { reason: String },
}

impl From<StrataError> for ExError {
    fn from(err: StrataError) -> Self {
        match err {
            StrataError::DuplicateStepSequence { sequence } => {
                ExError::new(ExErrorKind::DuplicateStepSequence)
                    .with_sequence(sequence)
                    .with_message(format!("Duplicate migration step sequence {}", sequence))
            }

            StrataError::NoReverseDefined { sequence, name } => {
                ExError::new(ExErrorKind::NoReverseDefined)
                    .with_sequence(sequence)
                    .with_message(format!("Migration step {} has no reverse action", name))
            }

            StrataError::NothingToRollBack => ExError::new(ExErrorKind::NothingToRollBack)
                .with_message("No migration steps are applied"),

            StrataError::UnknownStep { sequence } => ExError::new(ExErrorKind::UnknownStep)
                .with_sequence(sequence)
                .with_message("Applied step is not defined in the supplied steps"),

            StrataError::MigrationFailed {
                sequence,
                name,
                reason,
                applied,
            } => ExError::new(ExErrorKind::MigrationFailed)
                .with_op("apply_pending")
                .with_sequence(sequence)
                .with_applied(applied)
                .with_message(format!("Migration {} failed: {}", name, reason)),

            StrataError::AlreadyPersisted { table, identity } => {
                ExError::new(ExErrorKind::AlreadyPersisted)
                    .with_op("insert")
                    .with_table(table)
                    .with_identity(identity)
                    .with_message("Entity already persisted")
            }

            StrataError::NotFound { table, identity } => {
                let err = ExError::new(ExErrorKind::NotFound)
                    .with_table(table)
                    .with_message("Row not found");
                match identity {
                    Some(identity) => err.with_identity(identity),
                    None => err,
                }
            }

            StrataError::ConfigurationConflict { table, reason } => {
                ExError::new(ExErrorKind::ConfigurationConflict)
                    .with_op("define")
                    .with_table(table)
                    .with_message(reason)
            }

            StrataError::InvalidIdentifier { identifier, reason } => {
                ExError::new(ExErrorKind::InvalidIdentifier)
                    .with_op("define")
                    .with_message(format!("Invalid identifier '{}': {}", identifier, reason))
            }

            StrataError::UnknownAttribute { table, attribute } => {
                ExError::new(ExErrorKind::UnknownAttribute)
                    .with_table(table)
                    .with_message(format!("Unknown attribute '{}'", attribute))
            }

            StrataError::InvalidInput { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            StrataError::StoreUnavailable { reason } => {
                ExError::new(ExErrorKind::StoreUnavailable).with_message(reason)
            }

            StrataError::Persistence { reason } => {
                ExError::new(ExErrorKind::Persistence).with_message(reason)
            }
        }
    }
}
