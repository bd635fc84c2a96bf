//! PostgreSQL dialect compiler.
//!
//! Positional placeholders are `$1`, `$2`, ... (1-based). Column references
//! in DML (projections, WHERE, ORDER BY, SET, INSERT column lists, index
//! column lists) are uniformly quoted; DDL column definitions and
//! constraint column lists are quoted only when the name collides with a
//! reserved keyword or contains characters outside `[A-Za-z0-9_]`.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::error::Error;
use crate::query::filter::{
    is_pure_field, Conjunction, QueryColumn, QueryFilter, QueryOrder, OrderKind, UpdateColumn,
};
use crate::schema::constraint::{Constraint, ConstraintKind};
use crate::schema::index::Index;
use crate::schema::table::Table;
use crate::value::Value;

use super::{Dialect, Statement};

/// PostgreSQL reserved keywords that force identifier quoting in DDL.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
        "authorization", "binary", "both", "case", "cast", "check", "collate", "column",
        "constraint", "create", "cross", "current_date", "current_role", "current_time",
        "current_timestamp", "current_user", "default", "deferrable", "desc", "distinct",
        "do", "else", "end", "except", "false", "for", "foreign", "freeze", "from", "full",
        "grant", "group", "having", "ilike", "in", "initially", "inner", "intersect",
        "into", "is", "isnull", "join", "lateral", "leading", "left", "like", "limit",
        "localtime", "localtimestamp", "natural", "not", "notnull", "null", "offset",
        "on", "only", "or", "order", "outer", "overlaps", "placing", "primary",
        "references", "returning", "right", "select", "session_user", "similar", "some",
        "symmetric", "table", "then", "to", "trailing", "true", "union", "unique", "user",
        "using", "variadic", "verbose", "when", "where", "window", "with",
    ]
    .into_iter()
    .collect()
});

/// Quote unconditionally, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote only reserved keywords and non-plain identifiers.
fn escape_keyword(name: &str) -> String {
    if !is_pure_field(name) || RESERVED.contains(name.to_lowercase().as_str()) {
        quote_ident(name)
    } else {
        name.to_string()
    }
}

/// `CHECK (...)` without double-wrapping an already parenthesized
/// expression.
fn check_fragment(expr: &str) -> String {
    let expr = expr.trim();
    if expr.starts_with('(') && expr.ends_with(')') {
        format!("CHECK {expr}")
    } else {
        format!("CHECK ({expr})")
    }
}

/// `REFERENCES target (column)` from a dotted foreign-key target, with the
/// referential actions appended.
fn references_fragment(constraint: &Constraint) -> String {
    let target = constraint.statement.as_deref().unwrap_or_default();
    let mut fragment = match target.rsplit_once('.') {
        Some((table, column)) => {
            format!("REFERENCES {} ({})", table, escape_keyword(column))
        }
        None => format!("REFERENCES {target}"),
    };
    if let Some(action) = &constraint.on_update {
        fragment.push_str(&format!(" ON UPDATE {action}"));
    }
    if let Some(action) = &constraint.on_delete {
        fragment.push_str(&format!(" ON DELETE {action}"));
    }
    fragment
}

/// Inline (single-column) constraints in their fixed order: NOT NULL,
/// UNIQUE, CHECK, REFERENCES, PRIMARY KEY. Exclusion constraints have no
/// inline form and render in the table-level block instead.
fn inline_constraints(constraints: &[Constraint]) -> String {
    const ORDER: [ConstraintKind; 5] = [
        ConstraintKind::NotNull,
        ConstraintKind::Unique,
        ConstraintKind::Check,
        ConstraintKind::ForeignKey,
        ConstraintKind::PrimaryKey,
    ];
    let mut parts = Vec::new();
    for kind in ORDER {
        for constraint in constraints.iter().filter(|c| c.kind == kind) {
            match kind {
                ConstraintKind::NotNull => parts.push("NOT NULL".to_string()),
                ConstraintKind::Unique => parts.push("UNIQUE".to_string()),
                ConstraintKind::Check => {
                    if let Some(expr) = &constraint.statement {
                        parts.push(check_fragment(expr));
                    }
                }
                ConstraintKind::ForeignKey => parts.push(references_fragment(constraint)),
                ConstraintKind::PrimaryKey => parts.push("PRIMARY KEY".to_string()),
                ConstraintKind::Exclude => {}
            }
        }
    }
    parts.join(" ")
}

/// Table-level constraint definitions, named
/// `{table}_{f1}_{f2}..._{suffix}`.
fn table_constraints(base_name: &str, constraints: &[&Constraint]) -> Vec<String> {
    let mut definitions = Vec::new();
    for constraint in constraints {
        let name = format!(
            "{}_{}_{}",
            base_name,
            constraint.columns.join("_"),
            constraint.kind.suffix()
        );
        let fields = constraint
            .columns
            .iter()
            .map(|c| escape_keyword(c))
            .collect::<Vec<_>>()
            .join(",");
        match constraint.kind {
            ConstraintKind::Unique => {
                definitions.push(format!("CONSTRAINT {name} UNIQUE ({fields})"));
            }
            ConstraintKind::Check => {
                if let Some(expr) = &constraint.statement {
                    definitions.push(format!("CONSTRAINT {name} {}", check_fragment(expr)));
                }
            }
            ConstraintKind::Exclude => {
                if let Some(expr) = &constraint.statement {
                    definitions.push(format!("CONSTRAINT {name} EXCLUDE USING {expr}"));
                }
            }
            ConstraintKind::ForeignKey => {
                let mut fragment = format!(
                    "CONSTRAINT {name} FOREIGN KEY ({fields}) REFERENCES {}",
                    constraint.statement.as_deref().unwrap_or_default()
                );
                if let Some(action) = &constraint.on_update {
                    fragment.push_str(&format!(" ON UPDATE {action}"));
                }
                if let Some(action) = &constraint.on_delete {
                    fragment.push_str(&format!(" ON DELETE {action}"));
                }
                definitions.push(fragment);
            }
            ConstraintKind::PrimaryKey => {
                definitions.push(format!("CONSTRAINT {name} PRIMARY KEY ({fields})"));
            }
            ConstraintKind::NotNull => {}
        }
    }
    definitions
}

fn index_statement(table: &Table, index: &Index) -> String {
    let columns = index
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} USING {} ({});",
        index.name,
        table.base_name(),
        index.kind.method(),
        columns
    )
}

/// Append WHERE predicates. The first filter always renders as `WHERE`;
/// later filters use their declared conjunction. `counter` is the
/// statement-local positional-parameter counter, shared with any
/// placeholders already emitted (e.g. UPDATE set columns).
fn push_filters(
    sql: &mut String,
    args: &mut Vec<Value>,
    counter: &mut usize,
    filters: &[QueryFilter],
) {
    for (i, filter) in filters.iter().enumerate() {
        let conjunction = if i == 0 {
            "WHERE"
        } else {
            match filter.conjunction {
                Conjunction::And => "AND",
                Conjunction::Or => "OR",
            }
        };
        if filter.operator.is_empty() {
            sql.push_str(&format!(" {} {}", conjunction, filter.field));
        } else if filter.reversed {
            *counter += 1;
            if !filter.function.is_empty() {
                sql.push_str(&format!(
                    " {} {}(${}) {} {}",
                    conjunction,
                    filter.function,
                    counter,
                    filter.operator,
                    quote_ident(&filter.field)
                ));
            } else {
                sql.push_str(&format!(
                    " {} ${} {} {}",
                    conjunction,
                    counter,
                    filter.operator,
                    quote_ident(&filter.field)
                ));
            }
            args.push(filter.value.clone());
        } else {
            *counter += 1;
            if !filter.function.is_empty() {
                sql.push_str(&format!(
                    " {} {} {} {}(${})",
                    conjunction,
                    quote_ident(&filter.field),
                    filter.operator,
                    filter.function,
                    counter
                ));
            } else {
                sql.push_str(&format!(
                    " {} {} {} ${}",
                    conjunction,
                    quote_ident(&filter.field),
                    filter.operator,
                    counter
                ));
            }
            args.push(filter.value.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        PostgresDialect
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn create(&self, table: &Table) -> Result<Statement, Error> {
        let mut definitions = Vec::new();
        let mut indexes: Vec<&Index> = Vec::new();
        let mut excludes: Vec<&Constraint> = Vec::new();

        for column in table.columns() {
            let mut parts = vec![format!(
                "{} {}",
                escape_keyword(&column.name),
                column.type_decl
            )];
            if let Some(default) = &column.default {
                parts.push(format!("DEFAULT {default}"));
            }
            let inline = inline_constraints(&column.constraints);
            if !inline.is_empty() {
                parts.push(inline);
            }
            definitions.push(parts.join(" "));
            indexes.extend(column.indexes.iter());
            excludes.extend(
                column
                    .constraints
                    .iter()
                    .filter(|c| c.kind == ConstraintKind::Exclude),
            );
        }

        let mut composite: Vec<&Constraint> = excludes;
        composite.extend(table.constraints().iter());
        definitions.extend(table_constraints(table.base_name(), &composite));

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ( {} );",
            table.qualified_name(),
            definitions.join(", ")
        );
        indexes.extend(table.indexes().iter());
        for index in indexes {
            sql.push('\n');
            sql.push_str(&index_statement(table, index));
        }
        Ok(Statement::new(sql))
    }

    fn drop(&self, table: &Table, if_exists: bool) -> Result<Statement, Error> {
        let guard = if if_exists { "IF EXISTS " } else { "" };
        let mut statements = Vec::new();
        for column in table.columns() {
            for index in &column.indexes {
                statements.push(format!("DROP INDEX {}{};", guard, index.name));
            }
        }
        for index in table.indexes() {
            statements.push(format!("DROP INDEX {}{};", guard, index.name));
        }
        statements.push(format!("DROP TABLE {}{};", guard, table.qualified_name()));
        Ok(Statement::new(statements.join("\n")))
    }

    fn select(
        &self,
        table: &Table,
        columns: &[QueryColumn],
        filters: &[QueryFilter],
        orders: &[QueryOrder],
        lock: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Statement, Error> {
        if columns.is_empty() {
            return Err(Error::compile("select with an empty projection"));
        }
        let projection = columns
            .iter()
            .map(|c| c.render(true))
            .collect::<Vec<_>>()
            .join(",");
        let mut sql = format!("SELECT {} FROM {}", projection, table.qualified_name());
        let mut args = Vec::new();
        let mut counter = 0usize;
        push_filters(&mut sql, &mut args, &mut counter, filters);

        if !orders.is_empty() {
            let rendered = orders
                .iter()
                .map(|o| match o.kind {
                    OrderKind::Asc => format!("{} ASC", quote_ident(&o.field)),
                    OrderKind::Desc => format!("{} DESC", quote_ident(&o.field)),
                })
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(&format!(" ORDER BY {rendered}"));
        }
        if offset >= 0 {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        if limit >= 0 {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(mode) = lock {
            sql.push_str(&format!(" FOR {mode}"));
        }
        Ok(Statement { sql, args })
    }

    /// Generate an INSERT.
    ///
    /// A field whose value equals its zero value is omitted unless its
    /// column defines a default, in which case the default expression is
    /// emitted in place of a placeholder. This lets database-side defaults
    /// (sequences, `now()`) apply when the caller leaves a field unset; it
    /// is a value-equality heuristic, not a presence check.
    fn insert(&self, table: &Table, values: &[(String, Value)]) -> Result<Statement, Error> {
        let (sql, args) = build_insert(table, values)?;
        Ok(Statement { sql, args })
    }

    fn insert_returning(
        &self,
        table: &Table,
        values: &[(String, Value)],
        key: &str,
    ) -> Result<Statement, Error> {
        let (mut sql, args) = build_insert(table, values)?;
        sql.push_str(&format!(" RETURNING {}", escape_keyword(key)));
        Ok(Statement { sql, args })
    }

    fn update(
        &self,
        table: &Table,
        filters: &[QueryFilter],
        sets: &[UpdateColumn],
    ) -> Result<Statement, Error> {
        if sets.is_empty() {
            return Err(Error::compile("update with no set columns"));
        }
        let mut sql = format!("UPDATE {}", table.qualified_name());
        let mut args = Vec::new();
        let mut counter = 0usize;
        let mut fragments = Vec::new();
        for set in sets {
            if set.operator.is_empty() {
                fragments.push(set.field.clone());
            } else {
                counter += 1;
                fragments.push(format!(
                    "{}{}${}",
                    quote_ident(&set.field),
                    set.operator,
                    counter
                ));
                args.push(set.value.clone());
            }
        }
        sql.push_str(&format!(" SET {}", fragments.join(", ")));
        push_filters(&mut sql, &mut args, &mut counter, filters);
        Ok(Statement { sql, args })
    }

    fn delete(&self, table: &Table, filters: &[QueryFilter]) -> Result<Statement, Error> {
        let mut sql = format!("DELETE FROM {}", table.qualified_name());
        let mut args = Vec::new();
        let mut counter = 0usize;
        push_filters(&mut sql, &mut args, &mut counter, filters);
        Ok(Statement { sql, args })
    }
}

fn build_insert(
    table: &Table,
    values: &[(String, Value)],
) -> Result<(String, Vec<Value>), Error> {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut args = Vec::new();
    let mut counter = 0usize;
    for (field, value) in values {
        let Some(column) = table.column(field) else {
            continue;
        };
        if value.is_zero() {
            match &column.default {
                Some(default) => {
                    columns.push(quote_ident(&column.name));
                    placeholders.push(default.clone());
                }
                None => continue,
            }
        } else {
            counter += 1;
            columns.push(quote_ident(&column.name));
            placeholders.push(format!("${counter}"));
            args.push(value.clone());
        }
    }
    if columns.is_empty() {
        return Err(Error::compile(format!(
            "insert into '{}' with no usable columns",
            table.base_name()
        )));
    }
    let sql = format!(
        "INSERT INTO {} ({}) VALUES({})",
        table.qualified_name(),
        columns.join(","),
        placeholders.join(",")
    );
    Ok((sql, args))
}
