//! Table assembly: the schema reflector.
//!
//! [`Table::reflect`] walks a record type's field descriptors with an
//! explicit worklist (embedded composites are flattened in place, carrying
//! their accumulated skip sets), derives one [`Column`] per surviving field,
//! and attaches constraints and indexes as the flags that imply them are
//! popped from each field's property set. A parse error or unresolved type
//! aborts construction: a table is built once, at startup, or not at all.

use std::collections::{HashMap, VecDeque};

use convert_case::{Case, Casing};
use log::debug;

use crate::error::Error;
use crate::properties::{split_tokens, PropertySet};
use crate::schema::column::Column;
use crate::schema::constraint::{Constraint, ConstraintKind};
use crate::schema::index::{Index, IndexKind};
use crate::schema::reflect::{FieldDescriptor, Record};
use crate::schema::types::{kind_declaration, logical_declaration};

/// The assembled schema unit for one mapped type: columns, constraints,
/// indexes, primary-key subset, and three lookup indices (storage name /
/// field identifier / serialization tag).
///
/// Immutable once constructed and safe for unsynchronized concurrent reads;
/// build once per mapped type and reuse.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Option<String>,
    columns: Vec<Column>,
    constraints: Vec<Constraint>,
    indexes: Vec<Index>,
    primary_keys: Vec<String>,
    by_name: HashMap<String, usize>,
    by_ident: HashMap<String, usize>,
    by_tag: HashMap<String, usize>,
}

impl Table {
    /// Reflect a record type into a table descriptor.
    pub fn reflect<R: Record>() -> Result<Table, Error> {
        Table::reflect_in::<R>(None)
    }

    /// Reflect a record type into a table descriptor under a schema
    /// (namespace) prefix.
    pub fn reflect_in<R: Record>(schema: Option<&str>) -> Result<Table, Error> {
        let base = R::table_name().to_string();
        let root_skips: Vec<String> = R::ignored().iter().map(|s| s.to_string()).collect();

        let mut columns: Vec<Column> = Vec::new();
        let mut work: VecDeque<(FieldDescriptor, Vec<String>)> = R::fields()
            .into_iter()
            .map(|fd| (fd, root_skips.clone()))
            .collect();

        while let Some((fd, skips)) = work.pop_front() {
            if skips.iter().any(|s| s == fd.ident) {
                continue;
            }
            let tokens = split_tokens(fd.annotation);
            if tokens.first().map(String::as_str) == Some("-") {
                continue;
            }
            if let Some(children) = fd.embedded {
                let mut sub_skips = skips.clone();
                sub_skips.extend(parse_skips(&tokens));
                for child in children().into_iter().rev() {
                    work.push_front((child, sub_skips.clone()));
                }
                continue;
            }
            let column = build_column(&base, &fd)?;
            if columns.iter().any(|c| c.name == column.name) {
                return Err(Error::schema(format!(
                    "duplicate storage name '{}' in table '{}'",
                    column.name, base
                )));
            }
            columns.push(column);
        }

        let constraints = composite_constraints(&base, &columns, &R::constraints())?;
        let indexes = composite_indexes(&base, &columns, &R::indexes())?;

        let mut primary_keys: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        for constraint in &constraints {
            if constraint.kind == ConstraintKind::PrimaryKey {
                for name in &constraint.columns {
                    if !primary_keys.contains(name) {
                        primary_keys.push(name.clone());
                    }
                }
            }
        }

        let mut by_name = HashMap::new();
        let mut by_ident = HashMap::new();
        let mut by_tag = HashMap::new();
        for (i, c) in columns.iter().enumerate() {
            by_name.insert(c.name.clone(), i);
            by_ident.insert(c.ident.clone(), i);
            by_tag.insert(c.tag.clone(), i);
        }

        debug!(
            "reflected table '{}': {} columns, {} constraints, {} indexes",
            base,
            columns.len(),
            constraints.len(),
            indexes.len()
        );

        Ok(Table {
            name: base,
            schema: schema.map(str::to_string),
            columns,
            constraints,
            indexes,
            primary_keys,
            by_name,
            by_ident,
            by_tag,
        })
    }

    /// Base table name, without schema prefix.
    pub fn base_name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Schema-qualified table name as emitted into SQL.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Table-level (composite) constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Table-level (composite) indexes.
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn primary_keys(&self) -> Vec<&Column> {
        self.primary_keys
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    /// Look a column up by storage name, then field identifier, then
    /// serialization tag.
    pub fn column(&self, key: &str) -> Option<&Column> {
        self.by_name
            .get(key)
            .or_else(|| self.by_ident.get(key))
            .or_else(|| self.by_tag.get(key))
            .map(|&i| &self.columns[i])
    }
}

/// Sub-skip list from an embedded field's annotation: the `skips:a;b;c`
/// token convention, with `skips=a;b;c` accepted as well.
fn parse_skips(tokens: &[String]) -> Vec<String> {
    for token in tokens {
        let rest = token
            .strip_prefix("skips:")
            .or_else(|| token.strip_prefix("skips="));
        if let Some(rest) = rest {
            return rest
                .split(';')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
    Vec::new()
}

fn build_column(table: &str, fd: &FieldDescriptor) -> Result<Column, Error> {
    let mut props = PropertySet::parse(fd.annotation)?;

    let (name, _) = props.pop_str("name", &fd.ident.to_case(Case::Snake));
    let (tag, _) = props.pop_str("json", fd.ident);

    let mut column = Column {
        name,
        ident: fd.ident.to_string(),
        tag,
        type_decl: String::new(),
        indexed: false,
        nullable: true,
        unique: false,
        primary_key: false,
        default: None,
        constraints: Vec::new(),
        indexes: Vec::new(),
    };

    // Flags, popped in a fixed order; each true flag attaches its derived
    // constraint or index immediately.
    let (nullable, nullable_found) = props.pop_bool("nullable", false);
    if nullable_found {
        column.nullable = nullable;
        if !nullable {
            column.constraints.push(Constraint::not_null(&column.name));
        }
    }

    let (unique, _) = props.pop_bool("unique", false);
    if unique {
        column.unique = true;
        column.constraints.push(Constraint::unique(&column.name));
    }

    let (pk_short, _) = props.pop_bool("pk", false);
    let (pk_long, _) = props.pop_bool("primarykey", false);
    if pk_short || pk_long {
        column.primary_key = true;
        if column.nullable {
            column.nullable = false;
            column.constraints.push(Constraint::not_null(&column.name));
        }
        column.constraints.push(Constraint::primary_key(&column.name));
    }

    let (indexed, _) = props.pop_bool("index", false);
    if indexed {
        column.indexed = true;
        column
            .indexes
            .push(Index::generated(table, IndexKind::BTree, vec![column.name.clone()]));
    }

    let (default, default_found) = props.pop_str("default", "");
    if default_found && !default.is_empty() {
        column.default = Some(default);
    }

    if let Some(c) = Constraint::check(&column.name, &mut props) {
        column.constraints.push(c);
    }
    if let Some(c) = Constraint::foreign_key(&column.name, &mut props) {
        column.constraints.push(c);
    }
    if let Some(c) = Constraint::exclude(&column.name, &mut props) {
        column.constraints.push(c);
    }

    let (type_name, type_found) = props.pop_str("type", "");
    let declared = (fd.declare)(&props)
        .or_else(|| {
            if type_found {
                logical_declaration(&type_name, &props)
            } else {
                None
            }
        })
        .or_else(|| kind_declaration(fd.kind, &props));
    column.type_decl = declared.ok_or_else(|| {
        Error::schema(format!(
            "unknown type for field '{}' in table '{}'",
            fd.ident, table
        ))
    })?;

    Ok(column)
}

/// Resolve a comma-joined field-name list against the reflected columns.
/// A dangling name is a schema-author error and fails loudly.
fn resolve_fields(
    table: &str,
    columns: &[Column],
    joined: &str,
) -> Result<Vec<String>, Error> {
    let mut resolved = Vec::new();
    for name in joined.split(',') {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let column = columns
            .iter()
            .find(|c| c.name == name || c.ident == name)
            .ok_or_else(|| {
                Error::schema(format!(
                    "composite declaration on table '{table}' references unknown field '{name}'"
                ))
            })?;
        resolved.push(column.name.clone());
    }
    if resolved.is_empty() {
        return Err(Error::schema(format!(
            "composite declaration on table '{table}' names no fields"
        )));
    }
    Ok(resolved)
}

fn composite_constraints(
    table: &str,
    columns: &[Column],
    declarations: &[crate::schema::reflect::CompositeConstraint],
) -> Result<Vec<Constraint>, Error> {
    let mut constraints = Vec::new();
    for decl in declarations {
        // Unknown kinds are skipped silently; dangling fields are not.
        let Some(kind) = ConstraintKind::parse(decl.kind) else {
            continue;
        };
        let resolved = resolve_fields(table, columns, decl.fields)?;
        let statement = (!decl.statement.is_empty()).then(|| decl.statement.to_string());
        let (on_delete, on_update) = if kind == ConstraintKind::ForeignKey {
            (Some("CASCADE".to_string()), Some("CASCADE".to_string()))
        } else {
            (None, None)
        };
        constraints.push(Constraint {
            kind,
            columns: resolved,
            statement,
            on_delete,
            on_update,
        });
    }
    Ok(constraints)
}

fn composite_indexes(
    table: &str,
    columns: &[Column],
    declarations: &[crate::schema::reflect::CompositeIndex],
) -> Result<Vec<Index>, Error> {
    let mut indexes = Vec::new();
    for decl in declarations {
        let Some(kind) = IndexKind::parse(decl.kind) else {
            continue;
        };
        let resolved = resolve_fields(table, columns, decl.fields)?;
        indexes.push(Index::generated(table, kind, resolved));
    }
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::reflect::{CompositeConstraint, CompositeIndex, Fields};
    use crate::schema::types::{FieldKind, SqlKind};
    use crate::value::{FromValue, Value};

    // Manual implementations for testing; applications use #[derive(Record)].

    #[derive(Default)]
    struct Location {
        city: String,
        zip: String,
    }

    impl Fields for Location {
        fn fields() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::new(
                    "city",
                    "size=48",
                    <String as SqlKind>::kind(),
                    <String as SqlKind>::declare,
                ),
                FieldDescriptor::new(
                    "zip",
                    "size=10",
                    <String as SqlKind>::kind(),
                    <String as SqlKind>::declare,
                ),
            ]
        }

        fn get(&self, field: &str) -> Option<Value> {
            match field {
                "city" => Some(Value::from(self.city.clone())),
                "zip" => Some(Value::from(self.zip.clone())),
                _ => None,
            }
        }

        fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
            match field {
                "city" => {
                    self.city = FromValue::from_value(value)?;
                    Ok(())
                }
                "zip" => {
                    self.zip = FromValue::from_value(value)?;
                    Ok(())
                }
                _ => Err(Error::query(format!("unknown field '{field}'"))),
            }
        }
    }

    #[derive(Default)]
    struct Student {
        id: i32,
        full_name: String,
        age: i32,
        location: Location,
        cached: String,
    }

    impl Fields for Student {
        fn fields() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::new(
                    "id",
                    "pk",
                    <i32 as SqlKind>::kind(),
                    <i32 as SqlKind>::declare,
                ),
                FieldDescriptor::new(
                    "full_name",
                    "size=80,unique,nullable=false",
                    <String as SqlKind>::kind(),
                    <String as SqlKind>::declare,
                ),
                FieldDescriptor::new(
                    "age",
                    "check=(age>18)",
                    <i32 as SqlKind>::kind(),
                    <i32 as SqlKind>::declare,
                ),
                FieldDescriptor::embed("location", "skips:zip", Location::fields),
                FieldDescriptor::new(
                    "cached",
                    "-",
                    <String as SqlKind>::kind(),
                    <String as SqlKind>::declare,
                ),
            ]
        }

        fn get(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(Value::from(self.id)),
                "full_name" => Some(Value::from(self.full_name.clone())),
                "age" => Some(Value::from(self.age)),
                "cached" => Some(Value::from(self.cached.clone())),
                _ => self.location.get(field),
            }
        }

        fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
            match field {
                "id" => {
                    self.id = FromValue::from_value(value)?;
                    Ok(())
                }
                "full_name" => {
                    self.full_name = FromValue::from_value(value)?;
                    Ok(())
                }
                "age" => {
                    self.age = FromValue::from_value(value)?;
                    Ok(())
                }
                "cached" => {
                    self.cached = FromValue::from_value(value)?;
                    Ok(())
                }
                _ => self.location.set(field, value),
            }
        }
    }

    impl Record for Student {
        fn table_name() -> &'static str {
            "students"
        }

        fn constraints() -> Vec<CompositeConstraint> {
            vec![CompositeConstraint {
                kind: "unique",
                fields: "full_name,age",
                statement: "",
            }]
        }

        fn indexes() -> Vec<CompositeIndex> {
            vec![CompositeIndex {
                kind: "btree",
                fields: "age",
            }]
        }
    }

    #[test]
    fn test_reflect_flattens_and_excludes() {
        let table = Table::reflect::<Student>().unwrap();
        // id, full_name, age, city; zip skipped by the embed's sub-skip
        // list, cached excluded by the `-` annotation.
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "full_name", "age", "city"]);
    }

    #[test]
    fn test_reflect_primary_keys_and_flags() {
        let table = Table::reflect::<Student>().unwrap();
        let pks: Vec<&str> = table.primary_keys().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(pks, vec!["id"]);
        let id = table.column("id").unwrap();
        assert!(id.primary_key && !id.nullable);
        let full_name = table.column("full_name").unwrap();
        assert!(full_name.unique && !full_name.nullable);
        let age = table.column("age").unwrap();
        assert!(age.nullable);
        assert_eq!(
            age.constraints[0].statement.as_deref(),
            Some("(age>18)")
        );
    }

    #[test]
    fn test_reflect_type_declarations() {
        let table = Table::reflect::<Student>().unwrap();
        assert_eq!(table.column("id").unwrap().type_decl, "integer");
        assert_eq!(
            table.column("full_name").unwrap().type_decl,
            "character varying(80)"
        );
        assert_eq!(
            table.column("city").unwrap().type_decl,
            "character varying(48)"
        );
    }

    #[test]
    fn test_lookup_indices() {
        let table = Table::reflect::<Student>().unwrap();
        assert!(table.column("full_name").is_some());
        assert!(table.column("cached").is_none());
        assert!(table.column("zip").is_none());
    }

    #[test]
    fn test_composite_declarations() {
        let table = Table::reflect::<Student>().unwrap();
        assert_eq!(table.constraints().len(), 1);
        assert_eq!(
            table.constraints()[0].columns,
            vec!["full_name".to_string(), "age".to_string()]
        );
        assert_eq!(table.indexes().len(), 1);
        assert_eq!(table.indexes()[0].name, "students_age_idx");
    }

    #[test]
    fn test_qualified_name() {
        let table = Table::reflect_in::<Student>(Some("campus")).unwrap();
        assert_eq!(table.qualified_name(), "campus.students");
        assert_eq!(table.base_name(), "students");
    }

    #[derive(Default)]
    struct Dangling;

    impl Fields for Dangling {
        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::new(
                "id",
                "pk",
                <i32 as SqlKind>::kind(),
                <i32 as SqlKind>::declare,
            )]
        }

        fn get(&self, _field: &str) -> Option<Value> {
            None
        }

        fn set(&mut self, _field: &str, _value: Value) -> Result<(), Error> {
            Err(Error::query("unknown field"))
        }
    }

    impl Record for Dangling {
        fn table_name() -> &'static str {
            "dangling"
        }

        fn constraints() -> Vec<CompositeConstraint> {
            vec![
                CompositeConstraint {
                    kind: "unique",
                    fields: "missing",
                    statement: "",
                },
            ]
        }
    }

    #[test]
    fn test_dangling_composite_field_fails_loudly() {
        let err = Table::reflect::<Dangling>().unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[derive(Default)]
    struct OddKind;

    impl Fields for OddKind {
        fn fields() -> Vec<FieldDescriptor> {
            Dangling::fields()
        }

        fn get(&self, _field: &str) -> Option<Value> {
            None
        }

        fn set(&mut self, _field: &str, _value: Value) -> Result<(), Error> {
            Err(Error::query("unknown field"))
        }
    }

    impl Record for OddKind {
        fn table_name() -> &'static str {
            "odd"
        }

        fn constraints() -> Vec<CompositeConstraint> {
            vec![CompositeConstraint {
                kind: "fulltext",
                fields: "id",
                statement: "",
            }]
        }
    }

    #[test]
    fn test_unknown_composite_kind_skipped_silently() {
        let table = Table::reflect::<OddKind>().unwrap();
        assert!(table.constraints().is_empty());
    }
}
