//! Record traits and field descriptors.
//!
//! A mapped type implements [`Fields`] (usually via `#[derive(Record)]` or
//! `#[derive(Embedded)]`) to expose static per-field metadata and dynamic
//! get/set access, and [`Record`] to name its table and declare composite
//! constraints and indexes. [`Hooks`] carries the lifecycle callbacks
//! invoked around insert/update/delete.

use crate::error::Error;
use crate::properties::PropertySet;
use crate::schema::table::Table;
use crate::schema::types::FieldKind;
use crate::session::Session;
use crate::value::Value;

/// Static metadata for one field of a mapped type.
///
/// The annotation is carried as a raw string and parsed by the property
/// parser during reflection, not by the derive macro.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub ident: &'static str,
    pub annotation: &'static str,
    pub kind: FieldKind,
    /// Self-declaring type capability; `None` result falls through to the
    /// `type` property and then the kind-based mapping.
    pub declare: fn(&PropertySet) -> Option<String>,
    /// For an embedded composite: produces the composite's own descriptor
    /// list, flattened in place by the reflector.
    pub embedded: Option<fn() -> Vec<FieldDescriptor>>,
}

/// `declare` hook for fields without a self-declaring type.
pub fn no_declare(_props: &PropertySet) -> Option<String> {
    None
}

impl FieldDescriptor {
    pub fn new(
        ident: &'static str,
        annotation: &'static str,
        kind: FieldKind,
        declare: fn(&PropertySet) -> Option<String>,
    ) -> Self {
        FieldDescriptor {
            ident,
            annotation,
            kind,
            declare,
            embedded: None,
        }
    }

    /// Descriptor for an embedded composite field.
    pub fn embed(
        ident: &'static str,
        annotation: &'static str,
        children: fn() -> Vec<FieldDescriptor>,
    ) -> Self {
        FieldDescriptor {
            ident,
            annotation,
            kind: FieldKind::Composite,
            declare: no_declare,
            embedded: Some(children),
        }
    }
}

fn descriptors_contain(fields: &[FieldDescriptor], ident: &str) -> bool {
    fields.iter().any(|f| {
        f.ident == ident
            || f.embedded
                .map_or(false, |children| descriptors_contain(&children(), ident))
    })
}

/// Field-level access to a mapped type: descriptor list plus dynamic
/// get/set by field identifier. Embedded composites implement this alone.
pub trait Fields: Default {
    /// Per-field descriptors in declaration order.
    fn fields() -> Vec<FieldDescriptor>;

    /// Current value of a field, by field identifier. `None` for unknown
    /// fields. Embedded composites are searched transparently.
    fn get(&self, field: &str) -> Option<Value>;

    /// Store a value into a field, by field identifier.
    fn set(&mut self, field: &str, value: Value) -> Result<(), Error>;

    /// Whether a field identifier exists on this type, embedded composites
    /// included.
    fn has_field(field: &str) -> bool
    where
        Self: Sized,
    {
        descriptors_contain(&Self::fields(), field)
    }
}

/// Composite (table-level) constraint declaration:
/// kind, comma-joined field identifiers, optional statement.
#[derive(Debug, Clone, Copy)]
pub struct CompositeConstraint {
    pub kind: &'static str,
    pub fields: &'static str,
    pub statement: &'static str,
}

/// Composite (table-level) index declaration: kind, comma-joined field
/// identifiers.
#[derive(Debug, Clone, Copy)]
pub struct CompositeIndex {
    pub kind: &'static str,
    pub fields: &'static str,
}

/// A mapped type that owns a table.
pub trait Record: Fields {
    /// Base table name (without schema prefix).
    fn table_name() -> &'static str;

    /// Field identifiers excluded from reflection.
    fn ignored() -> Vec<&'static str> {
        Vec::new()
    }

    /// Composite constraints declared by the type itself.
    fn constraints() -> Vec<CompositeConstraint> {
        Vec::new()
    }

    /// Composite indexes declared by the type itself.
    fn indexes() -> Vec<CompositeIndex> {
        Vec::new()
    }
}

/// Lifecycle hooks invoked around write operations. Each may fail and
/// abort the operation. All default to no-ops; `#[derive(Record)]` emits an
/// empty impl unless the type opts into `#[record(custom_hooks)]`.
pub trait Hooks {
    fn before_insert(&mut self, _table: &Table, _session: &Session) -> Result<(), Error> {
        Ok(())
    }

    fn after_insert(&mut self, _table: &Table, _session: &Session) -> Result<(), Error> {
        Ok(())
    }

    fn before_update(&mut self, _table: &Table, _session: &Session) -> Result<(), Error> {
        Ok(())
    }

    fn after_update(&mut self, _table: &Table, _session: &Session) -> Result<(), Error> {
        Ok(())
    }

    fn before_delete(&mut self, _table: &Table, _session: &Session) -> Result<(), Error> {
        Ok(())
    }

    fn after_delete(&mut self, _table: &Table, _session: &Session) -> Result<(), Error> {
        Ok(())
    }
}
