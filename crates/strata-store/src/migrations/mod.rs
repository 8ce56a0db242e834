//! Schema migration ledger
//!
//! Provides:
//! - `MigrationStep` with forward and optional reverse actions
//! - Declarative `SchemaChange`s whose reverse can be derived
//! - `MigrationLedger`: exactly-once, ascending application tracked in `schema_migrations`

mod checksums;
mod ledger;
mod schema_change;
mod step;

pub use checksums::compute_checksum;
pub use ledger::{
    apply_pending, AppliedStep, ChecksumDrift, MigrationLedger, StepStatus, LEDGER_TABLE,
};
pub use schema_change::{ColumnDef, ColumnType, SchemaChange};
pub(crate) use schema_change::quote as quote_identifier;
pub use step::{Action, ActionFn, MigrationStep};
