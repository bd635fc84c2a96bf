//! Schema reflection: record types to table descriptors.
//!
//! A mapped type describes its fields through [`FieldDescriptor`]s (usually
//! generated by `#[derive(Record)]`); [`Table::reflect`] walks those
//! descriptors, parses each field's annotation, and assembles the column,
//! constraint and index metadata the dialect compilers consume.

pub mod column;
pub mod constraint;
pub mod index;
pub mod reflect;
pub mod table;
pub mod types;

pub use column::Column;
pub use constraint::{Constraint, ConstraintKind};
pub use index::{Index, IndexKind};
pub use reflect::{
    CompositeConstraint, CompositeIndex, FieldDescriptor, Fields, Hooks, Record,
};
pub use table::Table;
pub use types::{FieldKind, SqlKind};
