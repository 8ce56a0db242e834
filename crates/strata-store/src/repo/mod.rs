//! Repository layer mapping entities to table rows

pub mod mapper;
pub mod registry;
mod sql_value;

pub use mapper::{AllRecords, RecordMapper};
pub use registry::MapperRegistry;
