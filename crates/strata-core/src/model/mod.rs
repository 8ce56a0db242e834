//! In-memory side of the record mapping

pub mod entity;
pub mod value;

pub use entity::{Attributes, Entity};
pub use value::Value;
