//! Schema model produced by the parser.

mod entity;
mod types;

pub use entity::{ColumnDescriptor, ColumnRemap, EntityDescriptor, EntityMode};
pub use types::{map_logical_to_storage, wrap_nullable, LogicalType, NullableType, StorageType};
