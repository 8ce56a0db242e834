//! Structured logging facility for Strata
//!
//! - Single initialization point via `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Boundary events belong to the task layer (`strata-engine`). The ledger and
//! the mapper emit `tracing::debug!` only and return errors instead of logging them.
//!
//! ```rust
//! use strata_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
