//! Column descriptors.

use crate::schema::constraint::Constraint;
use crate::schema::index::Index;

/// One persisted attribute, derived from one mapped field.
///
/// The storage name is unique within a table. A column owns the single-column
/// constraints and indexes derived from its own annotation; composite
/// (multi-column) constraints and indexes live on the table.
#[derive(Debug, Clone)]
pub struct Column {
    /// Storage name: snake_case of the field identifier unless overridden
    /// by a `name` property.
    pub name: String,
    /// Original field identifier on the mapped type.
    pub ident: String,
    /// External serialization tag (`json` property, else the field ident).
    pub tag: String,
    /// Declared SQL type, e.g. `character varying(80)`.
    pub type_decl: String,
    pub indexed: bool,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    /// Default-value expression, emitted verbatim into DDL and into INSERT
    /// statements when the field value is zero.
    pub default: Option<String>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
}
