//! SQL type resolution.
//!
//! A column's declared SQL type is resolved in three steps, first match
//! wins:
//!
//! 1. the field type's [`SqlKind::declare`] capability (a type that knows
//!    how to declare itself, e.g. a domain-specific wrapper);
//! 2. an explicit `type=<logical type>` property against the logical-type
//!    table below;
//! 3. a kind-based fallback from the field's [`FieldKind`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::properties::PropertySet;

/// The shape of a mapped field, as seen by the type-resolution fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Str,
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    Json,
    /// An embedded composite; flattened by the reflector, never declared.
    Composite,
}

/// Capability trait connecting a Rust field type to the schema reflector.
///
/// Every mappable type reports its [`FieldKind`]; a type may additionally
/// override [`declare`](SqlKind::declare) to produce its own SQL type
/// declaration from the field's remaining annotation properties, which takes
/// precedence over both the `type` property and the kind-based fallback.
pub trait SqlKind {
    fn kind() -> FieldKind;

    fn declare(props: &PropertySet) -> Option<String> {
        let _ = props;
        None
    }
}

macro_rules! impl_sql_kind {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl SqlKind for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }
            }
        )*
    };
}

impl_sql_kind! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => Str,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    serde_json::Value => Json,
}

impl<T: SqlKind> SqlKind for Option<T> {
    fn kind() -> FieldKind {
        T::kind()
    }

    fn declare(props: &PropertySet) -> Option<String> {
        T::declare(props)
    }
}

/// Canonical declaration for an explicit `type=<name>` property. Unknown
/// names yield `None`, letting resolution fall through to the kind table.
pub fn logical_declaration(name: &str, props: &PropertySet) -> Option<String> {
    let decl = match name.to_lowercase().as_str() {
        "varchar" | "character varying" => {
            let (size, _) = props.get_uint("size", 32);
            format!("character varying({size})")
        }
        "char" | "character" => {
            let (size, _) = props.get_uint("size", 32);
            format!("character({size})")
        }
        "text" => "text".to_string(),
        "smallint" | "int2" => "smallint".to_string(),
        "int" | "integer" | "int4" => "integer".to_string(),
        "bigint" | "int8" => "bigint".to_string(),
        "smallserial" => "smallserial".to_string(),
        "serial" => "serial".to_string(),
        "bigserial" => "bigserial".to_string(),
        "decimal" | "numeric" => "decimal".to_string(),
        "real" | "float4" => "real".to_string(),
        "double" | "float8" | "double precision" => "double precision".to_string(),
        "bool" | "boolean" => "boolean".to_string(),
        "date" => "date".to_string(),
        "time" => "time".to_string(),
        "timestamp" => "timestamp".to_string(),
        "interval" => "interval".to_string(),
        "uuid" => "uuid".to_string(),
        "json" => "json".to_string(),
        "jsonb" => "jsonb".to_string(),
        "bytea" | "binary" => "bytea".to_string(),
        "bit" => {
            let (size, _) = props.get_uint("size", 1);
            format!("bit({size})")
        }
        "bitvar" | "bit varying" => {
            let (size, _) = props.get_uint("size", 1);
            format!("bit varying({size})")
        }
        _ => return None,
    };
    Some(decl)
}

/// Kind-based fallback mapping.
pub fn kind_declaration(kind: FieldKind, props: &PropertySet) -> Option<String> {
    let decl = match kind {
        FieldKind::Str => {
            let (size, _) = props.get_uint("size", 32);
            format!("character varying({size})")
        }
        FieldKind::SmallInt => "smallint".to_string(),
        FieldKind::Int => "integer".to_string(),
        FieldKind::BigInt => "bigint".to_string(),
        FieldKind::Bool => "boolean".to_string(),
        FieldKind::Float => "real".to_string(),
        FieldKind::Double => "double precision".to_string(),
        FieldKind::Decimal => "decimal".to_string(),
        FieldKind::Bytes => "bytea".to_string(),
        FieldKind::Uuid => "uuid".to_string(),
        FieldKind::Date => "date".to_string(),
        FieldKind::Time => "time".to_string(),
        FieldKind::Timestamp => "timestamp".to_string(),
        FieldKind::Json => "jsonb".to_string(),
        FieldKind::Composite => return None,
    };
    Some(decl)
}
