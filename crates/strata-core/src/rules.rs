//! Validation rules for mapping definitions

pub mod validation;
