//! SQLite dialect compiler.
//!
//! Differences from the Postgres backend: placeholders are `?` (argument
//! order is appearance order), indexes have no access method, row-lock
//! clauses and exclusion constraints are unsupported and refused at
//! compile time, and `OFFSET` without `LIMIT` is emitted as
//! `LIMIT -1 OFFSET n`.

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

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abort", "action", "add", "after", "all", "alter", "and", "as", "asc", "attach",
        "autoincrement", "before", "begin", "between", "by", "cascade", "case", "cast",
        "check", "collate", "column", "commit", "conflict", "constraint", "create",
        "cross", "current_date", "current_time", "current_timestamp", "database",
        "default", "deferrable", "deferred", "delete", "desc", "detach", "distinct",
        "drop", "each", "else", "end", "escape", "except", "exclusive", "exists",
        "explain", "fail", "for", "foreign", "from", "full", "glob", "group", "having",
        "if", "ignore", "immediate", "in", "index", "indexed", "initially", "inner",
        "insert", "instead", "intersect", "into", "is", "isnull", "join", "key", "left",
        "like", "limit", "match", "natural", "no", "not", "notnull", "null", "of",
        "offset", "on", "or", "order", "outer", "plan", "pragma", "primary", "query",
        "raise", "recursive", "references", "regexp", "reindex", "release", "rename",
        "replace", "restrict", "right", "rollback", "row", "savepoint", "select", "set",
        "table", "temp", "temporary", "then", "to", "transaction", "trigger", "union",
        "unique", "update", "using", "vacuum", "values", "view", "virtual", "when",
        "where", "with", "without",
    ]
    .into_iter()
    .collect()
});

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn escape_keyword(name: &str) -> String {
    if !is_pure_field(name) || RESERVED.contains(name.to_lowercase().as_str()) {
        quote_ident(name)
    } else {
        name.to_string()
    }
}

fn check_fragment(expr: &str) -> String {
    let expr = expr.trim();
    if expr.starts_with('(') && expr.ends_with(')') {
        format!("CHECK {expr}")
    } else {
        format!("CHECK ({expr})")
    }
}

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

fn inline_constraints(constraints: &[Constraint]) -> Result<String, Error> {
    const ORDER: [ConstraintKind; 5] = [
        ConstraintKind::NotNull,
        ConstraintKind::Unique,
        ConstraintKind::Check,
        ConstraintKind::ForeignKey,
        ConstraintKind::PrimaryKey,
    ];
    let mut parts = Vec::new();
    if constraints.iter().any(|c| c.kind == ConstraintKind::Exclude) {
        return Err(Error::compile("sqlite does not support EXCLUDE constraints"));
    }
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
    Ok(parts.join(" "))
}

fn table_constraints(
    base_name: &str,
    constraints: &[&Constraint],
) -> Result<Vec<String>, Error> {
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
                return Err(Error::compile(
                    "sqlite does not support EXCLUDE constraints",
                ));
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
    Ok(definitions)
}

fn index_statement(table: &Table, index: &Index) -> String {
    let columns = index
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
        index.name,
        table.base_name(),
        columns
    )
}

fn push_filters(sql: &mut String, args: &mut Vec<Value>, filters: &[QueryFilter]) {
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
            if !filter.function.is_empty() {
                sql.push_str(&format!(
                    " {} {}(?) {} {}",
                    conjunction,
                    filter.function,
                    filter.operator,
                    quote_ident(&filter.field)
                ));
            } else {
                sql.push_str(&format!(
                    " {} ? {} {}",
                    conjunction,
                    filter.operator,
                    quote_ident(&filter.field)
                ));
            }
            args.push(filter.value.clone());
        } else {
            if !filter.function.is_empty() {
                sql.push_str(&format!(
                    " {} {} {} {}(?)",
                    conjunction,
                    quote_ident(&filter.field),
                    filter.operator,
                    filter.function
                ));
            } else {
                sql.push_str(&format!(
                    " {} {} {} ?",
                    conjunction,
                    quote_ident(&filter.field),
                    filter.operator
                ));
            }
            args.push(filter.value.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        SqliteDialect
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create(&self, table: &Table) -> Result<Statement, Error> {
        let mut definitions = Vec::new();
        let mut indexes: Vec<&Index> = Vec::new();

        for column in table.columns() {
            let mut parts = vec![format!(
                "{} {}",
                escape_keyword(&column.name),
                column.type_decl
            )];
            if let Some(default) = &column.default {
                parts.push(format!("DEFAULT {default}"));
            }
            let inline = inline_constraints(&column.constraints)?;
            if !inline.is_empty() {
                parts.push(inline);
            }
            definitions.push(parts.join(" "));
            indexes.extend(column.indexes.iter());
        }

        let composite: Vec<&Constraint> = table.constraints().iter().collect();
        definitions.extend(table_constraints(table.base_name(), &composite)?);

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
        if lock.is_some() {
            return Err(Error::compile("sqlite does not support row-lock clauses"));
        }
        let projection = columns
            .iter()
            .map(|c| c.render(true))
            .collect::<Vec<_>>()
            .join(",");
        let mut sql = format!("SELECT {} FROM {}", projection, table.qualified_name());
        let mut args = Vec::new();
        push_filters(&mut sql, &mut args, filters);

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
        if limit >= 0 {
            sql.push_str(&format!(" LIMIT {limit}"));
        } else if offset >= 0 {
            sql.push_str(" LIMIT -1");
        }
        if offset >= 0 {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        Ok(Statement { sql, args })
    }

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
        let mut fragments = Vec::new();
        for set in sets {
            if set.operator.is_empty() {
                fragments.push(set.field.clone());
            } else {
                fragments.push(format!("{}{}?", quote_ident(&set.field), set.operator));
                args.push(set.value.clone());
            }
        }
        sql.push_str(&format!(" SET {}", fragments.join(", ")));
        push_filters(&mut sql, &mut args, filters);
        Ok(Statement { sql, args })
    }

    fn delete(&self, table: &Table, filters: &[QueryFilter]) -> Result<Statement, Error> {
        let mut sql = format!("DELETE FROM {}", table.qualified_name());
        let mut args = Vec::new();
        push_filters(&mut sql, &mut args, filters);
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
            columns.push(quote_ident(&column.name));
            placeholders.push("?".to_string());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_cfg::students_table;

    #[test]
    fn test_select_uses_question_placeholders() {
        let table = students_table();
        let st = SqliteDialect::new()
            .select(
                &table,
                &[QueryColumn::named("id")],
                &[
                    QueryFilter::new("region", "US"),
                    QueryFilter::with_op("age", 30, ">").or(),
                ],
                &[],
                None,
                -1,
                -1,
            )
            .unwrap();
        assert_eq!(
            st.sql,
            "SELECT \"id\" FROM students WHERE \"region\" = ? OR \"age\" > ?"
        );
        assert_eq!(
            st.args,
            vec![Value::Text("US".to_string()), Value::Int(30)]
        );
    }

    #[test]
    fn test_offset_without_limit_gets_limit_minus_one() {
        let table = students_table();
        let st = SqliteDialect::new()
            .select(&table, &[QueryColumn::named("id")], &[], &[], None, 20, -1)
            .unwrap();
        assert!(st.sql.ends_with("LIMIT -1 OFFSET 20"));
    }

    #[test]
    fn test_lock_clause_refused() {
        let table = students_table();
        let err = SqliteDialect::new()
            .select(
                &table,
                &[QueryColumn::named("id")],
                &[],
                &[],
                Some("UPDATE"),
                -1,
                -1,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn test_create_index_has_no_access_method() {
        let table = students_table();
        let st = SqliteDialect::new().create(&table).unwrap();
        assert!(st.sql.contains(
            "CREATE INDEX IF NOT EXISTS students_full_name_idx ON students (\"full_name\");"
        ));
        assert!(!st.sql.contains("USING"));
    }

    #[test]
    fn test_update_and_delete_placeholders() {
        let table = students_table();
        let st = SqliteDialect::new()
            .update(
                &table,
                &[QueryFilter::new("id", 7)],
                &[UpdateColumn::set("age", 30)],
            )
            .unwrap();
        assert_eq!(st.sql, "UPDATE students SET \"age\"=? WHERE \"id\" = ?");
        assert_eq!(st.args, vec![Value::Int(30), Value::Int(7)]);

        let st = SqliteDialect::new()
            .delete(&table, &[QueryFilter::new("id", 7)])
            .unwrap();
        assert_eq!(st.sql, "DELETE FROM students WHERE \"id\" = ?");
    }
}
