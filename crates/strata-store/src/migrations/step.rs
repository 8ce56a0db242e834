//! Migration steps and their actions

use crate::errors::{from_rusqlite, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::schema_change::{invert_all, SchemaChange};
use rusqlite::Connection;
use std::sync::Arc;

/// Callback form of an action, run against the step's transaction
pub type ActionFn = Arc<dyn Fn(&Connection) -> Result<()> + Send + Sync>;

/// What a step does when applied or rolled back
#[derive(Clone)]
pub enum Action {
    /// One or more SQL statements, run as a batch
    Sql(String),
    /// Declarative schema changes, run in order
    Schema(Vec<SchemaChange>),
    /// Arbitrary code; `description` identifies it for checksums and status output
    Custom { description: String, run: ActionFn },
}

impl Action {
    pub fn sql(sql: impl Into<String>) -> Self {
        Action::Sql(sql.into())
    }

    pub fn custom<F>(description: impl Into<String>, run: F) -> Self
    where
        F: Fn(&Connection) -> Result<()> + Send + Sync + 'static,
    {
        Action::Custom {
            description: description.into(),
            run: Arc::new(run),
        }
    }

    pub(crate) fn run(&self, conn: &Connection) -> Result<()> {
        match self {
            Action::Sql(sql) => conn.execute_batch(sql).map_err(from_rusqlite),
            Action::Schema(changes) => {
                for change in changes {
                    let sql = change.to_sql()?;
                    tracing::debug!(%sql, "schema change");
                    conn.execute_batch(&sql).map_err(from_rusqlite)?;
                }
                Ok(())
            }
            Action::Custom { run, .. } => run(conn),
        }
    }

    /// Stable text describing the action; the checksum input
    pub fn description(&self) -> String {
        match self {
            Action::Sql(sql) => sql.trim().to_string(),
            Action::Schema(changes) => changes
                .iter()
                .map(|c| c.to_sql().unwrap_or_else(|e| format!("<invalid: {}>", e)))
                .collect::<Vec<_>>()
                .join(";\n"),
            Action::Custom { description, .. } => format!("custom: {}", description),
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
            Action::Schema(changes) => f.debug_tuple("Schema").field(changes).finish(),
            Action::Custom { description, .. } => f
                .debug_struct("Custom")
                .field("description", description)
                .finish_non_exhaustive(),
        }
    }
}

/// One ordered schema-change step
#[derive(Debug, Clone)]
pub struct MigrationStep {
    sequence: i64,
    name: String,
    forward: Action,
    reverse: Option<Action>,
}

impl MigrationStep {
    /// A step with a forward action and no reverse
    pub fn new(sequence: i64, name: impl Into<String>, forward: Action) -> Self {
        Self {
            sequence,
            name: name.into(),
            forward,
            reverse: None,
        }
    }

    /// A raw SQL step (`up` only; add `down` with [`with_reverse`](Self::with_reverse))
    pub fn sql(sequence: i64, name: impl Into<String>, up: impl Into<String>) -> Self {
        Self::new(sequence, name, Action::sql(up))
    }

    /// A declarative step whose reverse is derived when every change is invertible
    pub fn change(sequence: i64, name: impl Into<String>, changes: Vec<SchemaChange>) -> Self {
        let reverse = invert_all(&changes).map(Action::Schema);
        Self {
            sequence,
            name: name.into(),
            forward: Action::Schema(changes),
            reverse,
        }
    }

    pub fn with_reverse(mut self, reverse: Action) -> Self {
        self.reverse = Some(reverse);
        self
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&self) -> &Action {
        &self.forward
    }

    pub fn reverse(&self) -> Option<&Action> {
        self.reverse.as_ref()
    }

    pub fn is_reversible(&self) -> bool {
        self.reverse.is_some()
    }

    /// SHA256 of the forward action's description
    pub fn checksum(&self) -> String {
        compute_checksum(&self.forward.description())
    }
}
