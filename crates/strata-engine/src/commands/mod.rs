//! Task handlers.
//!
//! Each handler wraps one store operation with boundary logging.

pub mod db;
pub mod schema;
