//! The chainable query description.
//!
//! Every chain method takes the description by value and returns a new one
//! with a single field appended or overridden, so a cloned intermediate
//! builder is never affected by later chaining — two threads refining
//! clones of the same base never observe each other's state. Terminal
//! operations freeze the description, compile it through the session's
//! dialect, execute it, and translate rows back into records.

use crate::error::Error;
use crate::query::filter::{
    FilterArg, OrderArg, QueryColumn, QueryFilter, QueryOrder, SetArg, UpdateColumn,
};
use crate::schema::reflect::{Hooks, Record};
use crate::schema::table::Table;
use crate::session::Session;
use crate::value::{FromValue, Value};

/// An immutable, chainable query description bound to a session and a
/// table. Offsets and limits are negative (unset) until given; unbounded
/// queries emit neither clause.
#[derive(Clone)]
pub struct QuerySet<'a> {
    session: &'a Session,
    table: &'a Table,
    queries: Vec<QueryColumn>,
    filters: Vec<QueryFilter>,
    orders: Vec<QueryOrder>,
    lock_for: Option<String>,
    offset: i64,
    limit: i64,
}

impl<'a> QuerySet<'a> {
    pub(crate) fn new(session: &'a Session, table: &'a Table) -> Self {
        QuerySet {
            session,
            table,
            queries: Vec::new(),
            filters: Vec::new(),
            orders: Vec::new(),
            lock_for: None,
            offset: -1,
            limit: -1,
        }
    }

    pub(crate) fn with_projection(mut self, queries: Vec<QueryColumn>) -> Self {
        self.queries = queries;
        self
    }

    /// Override the projection. Names are resolved through the table's
    /// lookup indices; unresolved names are kept as raw expressions.
    pub fn columns(mut self, names: &[&str]) -> Self {
        self.queries = names
            .iter()
            .map(|name| match self.table.column(name) {
                Some(column) => QueryColumn::named(column.name.clone()),
                None => QueryColumn::named(name.to_string()),
            })
            .collect();
        self
    }

    /// Append an equality predicate joined with AND.
    pub fn where_(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(QueryFilter::new(field, value));
        self
    }

    /// Append a predicate with an explicit operator, joined with AND.
    pub fn where_op(
        mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
        operator: impl Into<String>,
    ) -> Self {
        self.filters.push(QueryFilter::with_op(field, value, operator));
        self
    }

    /// Alias for [`where_`](QuerySet::where_); reads better mid-chain.
    pub fn and(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_(field, value)
    }

    /// Append an equality predicate joined with OR.
    pub fn or(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(QueryFilter::new(field, value).or());
        self
    }

    /// Append a predicate with an explicit operator, joined with OR.
    pub fn or_op(
        mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
        operator: impl Into<String>,
    ) -> Self {
        self.filters
            .push(QueryFilter::with_op(field, value, operator).or());
        self
    }

    /// Append filters from a polymorphic input: a raw predicate fragment,
    /// a key/value mapping (each pair an equality filter), or pre-built
    /// filters.
    pub fn filter(mut self, arg: impl Into<FilterArg>) -> Self {
        match arg.into() {
            FilterArg::Raw(fragment) => self.filters.push(QueryFilter::raw(fragment)),
            FilterArg::Pairs(pairs) => {
                for (field, value) in pairs {
                    self.filters.push(QueryFilter::new(field, value));
                }
            }
            FilterArg::Filters(filters) => self.filters.extend(filters),
        }
        self
    }

    /// Append an ordering; the string form `"-field"` orders descending.
    pub fn order_by(mut self, arg: impl Into<OrderArg>) -> Self {
        match arg.into() {
            OrderArg::Name(name) => self.orders.push(QueryOrder::parse(&name)),
            OrderArg::Order(order) => self.orders.push(order),
        }
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Request a row-lock clause (`FOR <mode>`), appended last.
    pub fn lock_for(mut self, mode: impl Into<String>) -> Self {
        self.lock_for = Some(mode.into());
        self
    }

    fn projection(&self) -> Vec<QueryColumn> {
        if !self.queries.is_empty() {
            return self.queries.clone();
        }
        self.table
            .columns()
            .iter()
            .map(|c| QueryColumn::named(c.name.clone()))
            .collect()
    }

    fn hydrate<R: Record>(
        table: &Table,
        queries: &[QueryColumn],
        row: crate::executor::Row,
    ) -> Result<R, Error> {
        let mut record = R::default();
        for (qc, value) in queries.iter().zip(row.into_values()) {
            if let Some(column) = table.column(&qc.field) {
                record.set(&column.ident, value)?;
            }
        }
        Ok(record)
    }

    /// Count rows matching the filters, over the first primary-key column
    /// (or the first column when the table has no primary key).
    pub fn count(self) -> Result<i64, Error> {
        let field = match self.table.primary_keys().first() {
            Some(pk) => pk.name.clone(),
            None => match self.table.columns().first() {
                Some(c) => c.name.clone(),
                None => return Err(Error::query("count on a table with no columns")),
            },
        };
        let statement = self.session.dialect().select(
            self.table,
            &[QueryColumn::function("COUNT", field)],
            &self.filters,
            &[],
            self.lock_for.as_deref(),
            -1,
            -1,
        )?;
        let rows = self.session.query(&statement)?;
        let value = rows
            .first()
            .and_then(|row| row.get(0))
            .ok_or_else(|| Error::decode("count returned no rows"))?;
        i64::from_value(value.clone())
    }

    /// Execute the query and hydrate every row.
    pub fn all<R: Record>(self) -> Result<Vec<R>, Error> {
        let queries = self.projection();
        let statement = self.session.dialect().select(
            self.table,
            &queries,
            &self.filters,
            &self.orders,
            self.lock_for.as_deref(),
            self.offset,
            self.limit,
        )?;
        let rows = self.session.query(&statement)?;
        rows.into_iter()
            .map(|row| Self::hydrate(self.table, &queries, row))
            .collect()
    }

    /// Execute the query with `LIMIT 1` and hydrate the row, if any.
    pub fn one<R: Record>(self) -> Result<Option<R>, Error> {
        let queries = self.projection();
        let statement = self.session.dialect().select(
            self.table,
            &queries,
            &self.filters,
            &self.orders,
            self.lock_for.as_deref(),
            self.offset,
            1,
        )?;
        let rows = self.session.query(&statement)?;
        rows.into_iter()
            .next()
            .map(|row| Self::hydrate(self.table, &queries, row))
            .transpose()
    }

    /// Fetch one record by primary key. The key count must match the
    /// table's primary-key column count; a mismatch fails before any SQL
    /// is generated. Any filters accumulated so far are replaced.
    pub fn get<R: Record>(mut self, keys: Vec<Value>) -> Result<Option<R>, Error> {
        let primary_keys = self.table.primary_keys();
        if keys.len() != primary_keys.len() {
            return Err(Error::query(format!(
                "table '{}' has {} primary key column(s), got {} value(s)",
                self.table.base_name(),
                primary_keys.len(),
                keys.len()
            )));
        }
        let fields: Vec<String> = primary_keys.iter().map(|c| c.name.clone()).collect();
        self.filters = fields
            .into_iter()
            .zip(keys)
            .map(|(field, key)| QueryFilter::new(field, key))
            .collect();
        self.one()
    }

    /// Compile and run an UPDATE from a column/value mapping or a
    /// pre-built set-column list. Mapping keys are resolved through the
    /// table's lookup indices; an unknown key is a query error.
    pub fn update(self, sets: impl Into<SetArg>) -> Result<u64, Error> {
        let columns = match sets.into() {
            SetArg::Pairs(pairs) => {
                let mut columns = Vec::new();
                for (key, value) in pairs {
                    let column = self.table.column(&key).ok_or_else(|| {
                        Error::query(format!(
                            "invalid column '{}' for table '{}'",
                            key,
                            self.table.base_name()
                        ))
                    })?;
                    columns.push(UpdateColumn::set(column.name.clone(), value));
                }
                columns
            }
            SetArg::Columns(columns) => columns,
        };
        let statement = self
            .session
            .dialect()
            .update(self.table, &self.filters, &columns)?;
        self.session.execute(&statement)
    }

    /// UPDATE from a record: every non-primary-key, non-zero field becomes
    /// a set column. Runs the record's update hooks around execution.
    pub fn update_record<R: Record + Hooks>(self, record: &mut R) -> Result<u64, Error> {
        record.before_update(self.table, self.session)?;
        let mut columns = Vec::new();
        for column in self.table.columns() {
            if column.primary_key {
                continue;
            }
            let Some(value) = record.get(&column.ident) else {
                continue;
            };
            if value.is_zero() {
                continue;
            }
            columns.push(UpdateColumn::set(column.name.clone(), value));
        }
        let statement = self
            .session
            .dialect()
            .update(self.table, &self.filters, &columns)?;
        let affected = self.session.execute(&statement)?;
        record.after_update(self.table, self.session)?;
        Ok(affected)
    }

    /// Compile and run a DELETE with the accumulated filters.
    pub fn delete(self) -> Result<u64, Error> {
        let statement = self.session.dialect().delete(self.table, &self.filters)?;
        self.session.execute(&statement)
    }

    /// DELETE one record by its primary-key values, running the record's
    /// delete hooks around execution. Any filters accumulated so far are
    /// replaced.
    pub fn delete_record<R: Record + Hooks>(mut self, record: &mut R) -> Result<u64, Error> {
        let primary_keys = self.table.primary_keys();
        if primary_keys.is_empty() {
            return Err(Error::query(format!(
                "table '{}' has no primary key to delete by",
                self.table.base_name()
            )));
        }
        let mut filters = Vec::new();
        for column in primary_keys {
            let value = record.get(&column.ident).unwrap_or(Value::Null);
            filters.push(QueryFilter::new(column.name.clone(), value));
        }
        self.filters = filters;
        record.before_delete(self.table, self.session)?;
        let statement = self.session.dialect().delete(self.table, &self.filters)?;
        let affected = self.session.execute(&statement)?;
        record.after_delete(self.table, self.session)?;
        Ok(affected)
    }

    fn insert_values<R: Record>(&self, record: &R) -> Vec<(String, Value)> {
        let columns: Vec<&crate::schema::column::Column> = if self.queries.is_empty() {
            self.table.columns().iter().collect()
        } else {
            self.queries
                .iter()
                .filter_map(|qc| self.table.column(&qc.field))
                .collect()
        };
        columns
            .into_iter()
            .map(|c| {
                let value = record.get(&c.ident).unwrap_or(Value::Null);
                (c.name.clone(), value)
            })
            .collect()
    }

    /// INSERT one statement per record, running each record's insert hooks.
    /// A non-empty projection restricts the field subset considered.
    pub fn insert<R: Record + Hooks>(self, records: &mut [R]) -> Result<u64, Error> {
        let mut inserted = 0u64;
        for record in records.iter_mut() {
            record.before_insert(self.table, self.session)?;
            let values = self.insert_values(record);
            let statement = self.session.dialect().insert(self.table, &values)?;
            self.session.execute(&statement)?;
            record.after_insert(self.table, self.session)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// INSERT one record and read back a database-generated key column.
    /// The returned value is also stored into the record's field.
    pub fn insert_returning<R: Record + Hooks>(
        self,
        record: &mut R,
        key: &str,
    ) -> Result<Value, Error> {
        let column = self.table.column(key).ok_or_else(|| {
            Error::query(format!(
                "invalid key column '{}' for table '{}'",
                key,
                self.table.base_name()
            ))
        })?;
        let key_name = column.name.clone();
        let key_ident = column.ident.clone();
        record.before_insert(self.table, self.session)?;
        let values = self.insert_values(record);
        let statement = self
            .session
            .dialect()
            .insert_returning(self.table, &values, &key_name)?;
        let rows = self.session.query(&statement)?;
        let value = rows
            .first()
            .and_then(|row| row.get(0))
            .cloned()
            .ok_or_else(|| Error::decode("insert returned no generated key"))?;
        record.set(&key_ident, value.clone())?;
        record.after_insert(self.table, self.session)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::executor::Row;
    use crate::test_support::MockExecutor;
    use crate::tests_cfg::{postgres_session, students_table, Student};
    use crate::value::Value;

    use super::*;

    #[test]
    fn test_chain_clones_never_alias() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let base = session.table(&table).where_("region", "US");
        let branched = base.clone().or_op("age", 30, ">");

        branched.delete().unwrap();
        let (sql, _) = executor.last_statement().unwrap();
        assert_eq!(
            sql,
            "DELETE FROM students WHERE \"region\" = $1 OR \"age\" > $2"
        );

        // The base description is unaffected by the branch.
        base.delete().unwrap();
        let (sql, args) = executor.last_statement().unwrap();
        assert_eq!(sql, "DELETE FROM students WHERE \"region\" = $1");
        assert_eq!(args, vec![Value::Text("US".to_string())]);
    }

    #[test]
    fn test_filter_map_then_or_yields_two_predicates() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let _rows: Vec<Student> = session
            .table(&table)
            .columns(&["id"])
            .filter(vec![("region", "US")])
            .or_op("age", 30, ">")
            .all()
            .unwrap();
        let (sql, args) = executor.last_statement().unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\" FROM students WHERE \"region\" = $1 OR \"age\" > $2"
        );
        assert_eq!(
            args,
            vec![Value::Text("US".to_string()), Value::Int(30)]
        );
    }

    #[test]
    fn test_get_key_count_mismatch_fails_before_sql() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let err = session
            .table(&table)
            .get::<Student>(vec![Value::Int(1), Value::Int(2)])
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_get_hydrates_by_primary_key() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![Row::new(vec![
            Value::Int(1),
            Value::Text("Ada Lovelace".to_string()),
            Value::Int(36),
            Value::Null,
            Value::Null,
        ])]);
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let student: Student = session
            .table(&table)
            .get(vec![Value::Int(1)])
            .unwrap()
            .unwrap();
        assert_eq!(student.id, 1);
        assert_eq!(student.full_name, "Ada Lovelace");
        assert_eq!(student.region, None);

        let (sql, args) = executor.last_statement().unwrap();
        assert!(sql.contains("WHERE \"id\" = $1"));
        assert!(sql.ends_with("LIMIT 1"));
        assert_eq!(args, vec![Value::Int(1)]);
    }

    #[test]
    fn test_count_over_primary_key() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![Row::new(vec![Value::BigInt(42)])]);
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let count = session.table(&table).where_("region", "US").count().unwrap();
        assert_eq!(count, 42);
        let (sql, _) = executor.last_statement().unwrap();
        assert!(sql.starts_with("SELECT COUNT(\"id\") FROM students"));
    }

    #[test]
    fn test_update_map_resolves_columns() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let affected = session
            .table(&table)
            .where_("id", 7)
            .update(vec![("age", 30)])
            .unwrap();
        assert_eq!(affected, 1);
        let (sql, args) = executor.last_statement().unwrap();
        assert_eq!(sql, "UPDATE students SET \"age\"=$1 WHERE \"id\" = $2");
        assert_eq!(args, vec![Value::Int(30), Value::Int(7)]);
    }

    #[test]
    fn test_update_unknown_column_is_query_error() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let err = session
            .table(&table)
            .update(vec![("nonexistent", 1)])
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_insert_one_statement_per_record() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let mut records = vec![
            Student {
                id: 1,
                full_name: "Ada Lovelace".to_string(),
                age: 36,
                ..Student::default()
            },
            Student {
                id: 2,
                full_name: "Alan Turing".to_string(),
                age: 41,
                ..Student::default()
            },
        ];
        let inserted = session.table(&table).insert(&mut records).unwrap();
        assert_eq!(inserted, 2);

        let statements = executor.statements();
        assert_eq!(statements.len(), 2);
        // Zero-valued region is omitted; zero-valued created falls back to
        // its default expression.
        assert_eq!(
            statements[0].0,
            "INSERT INTO students (\"id\",\"full_name\",\"age\",\"created\") VALUES($1,$2,$3,now())"
        );
        assert_eq!(
            statements[0].1,
            vec![
                Value::Int(1),
                Value::Text("Ada Lovelace".to_string()),
                Value::Int(36)
            ]
        );
    }

    #[test]
    fn test_update_record_skips_primary_key_and_zero_fields() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let mut record = Student {
            id: 7,
            full_name: "Ada Lovelace".to_string(),
            age: 0,
            ..Student::default()
        };
        session
            .table(&table)
            .where_("id", 7)
            .update_record(&mut record)
            .unwrap();
        let (sql, args) = executor.last_statement().unwrap();
        // age is zero and the primary key never appears in SET.
        assert_eq!(
            sql,
            "UPDATE students SET \"full_name\"=$1 WHERE \"id\" = $2"
        );
        assert_eq!(
            args,
            vec![Value::Text("Ada Lovelace".to_string()), Value::Int(7)]
        );
    }

    #[test]
    fn test_delete_record_filters_on_primary_key() {
        let executor = Arc::new(MockExecutor::new());
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let mut record = Student {
            id: 7,
            ..Student::default()
        };
        session
            .table(&table)
            .delete_record(&mut record)
            .unwrap();
        let (sql, args) = executor.last_statement().unwrap();
        assert_eq!(sql, "DELETE FROM students WHERE \"id\" = $1");
        assert_eq!(args, vec![Value::Int(7)]);
    }

    #[test]
    fn test_insert_returning_sets_key_back() {
        let executor = Arc::new(MockExecutor::new());
        executor.push_rows(vec![Row::new(vec![Value::Int(99)])]);
        let session = postgres_session(Arc::clone(&executor));
        let table = students_table();

        let mut record = Student {
            full_name: "Grace Hopper".to_string(),
            age: 52,
            ..Student::default()
        };
        let value = session
            .table(&table)
            .insert_returning(&mut record, "id")
            .unwrap();
        assert_eq!(value, Value::Int(99));
        assert_eq!(record.id, 99);
        let (sql, _) = executor.last_statement().unwrap();
        assert!(sql.ends_with("RETURNING id"));
    }
}

