//! Engine and session: binding an executor to a dialect.
//!
//! The [`Engine`] owns the executor handle, the dialect registry and the
//! driver name; [`Engine::session`] resolves the dialect once — using an
//! unregistered driver name is a configuration error surfaced immediately.
//! The [`Session`] compiles and runs statements, logging each one at debug
//! level and annotating execution errors with the SQL text that produced
//! them.

use std::sync::Arc;

use log::debug;

use crate::dialect::{Dialect, DialectRegistry, Statement};
use crate::error::Error;
use crate::executor::{Executor, Row};
use crate::query::filter::QueryColumn;
use crate::query::queryset::QuerySet;
use crate::schema::table::Table;

/// Entry point tying together a driver name, an executor and a dialect
/// registry. Construct once at process start.
pub struct Engine {
    driver: String,
    executor: Arc<dyn Executor>,
    registry: DialectRegistry,
}

impl Engine {
    pub fn new(
        driver: impl Into<String>,
        executor: Arc<dyn Executor>,
        registry: DialectRegistry,
    ) -> Self {
        Engine {
            driver: driver.into(),
            executor,
            registry,
        }
    }

    pub fn driver_name(&self) -> &str {
        &self.driver
    }

    /// Open a session, resolving the dialect for this engine's driver.
    pub fn session(&self) -> Result<Session, Error> {
        let dialect = self.registry.get(&self.driver).ok_or_else(|| {
            Error::query(format!("dialect '{}' is not registered", self.driver))
        })?;
        Ok(Session {
            dialect,
            executor: Arc::clone(&self.executor),
        })
    }
}

/// A dialect-resolved handle for compiling and executing statements.
#[derive(Clone)]
pub struct Session {
    dialect: Arc<dyn Dialect>,
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.dialect.name())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Compile and run the table's CREATE statement block.
    pub fn create_table(&self, table: &Table) -> Result<(), Error> {
        let statement = self.dialect.create(table)?;
        self.execute(&statement)?;
        Ok(())
    }

    /// Compile and run the table's DROP statement block.
    pub fn drop_table(&self, table: &Table, if_exists: bool) -> Result<(), Error> {
        let statement = Dialect::drop(self.dialect.as_ref(), table, if_exists)?;
        self.execute(&statement)?;
        Ok(())
    }

    /// Start a query description against a table, selecting all columns by
    /// default.
    pub fn table<'a>(&'a self, table: &'a Table) -> QuerySet<'a> {
        QuerySet::new(self, table)
    }

    /// Start a query description with an initial projection. Names are
    /// resolved through the table's lookup indices; an unresolved name is
    /// kept as a raw expression with a synthesized alias.
    pub fn table_with<'a>(&'a self, table: &'a Table, columns: &[&str]) -> QuerySet<'a> {
        let mut queries = Vec::new();
        for (i, name) in columns.iter().enumerate() {
            match table.column(name) {
                Some(column) => queries.push(QueryColumn::named(column.name.clone())),
                None => queries.push(QueryColumn::aliased(name.to_string(), format!("aa{i}"))),
            }
        }
        QuerySet::new(self, table).with_projection(queries)
    }

    pub(crate) fn execute(&self, statement: &Statement) -> Result<u64, Error> {
        debug!(
            "executing: {} ({} args)",
            statement.sql,
            statement.args.len()
        );
        self.executor
            .execute(&statement.sql, &statement.args)
            .map_err(|e| annotate(e, &statement.sql))
    }

    pub(crate) fn query(&self, statement: &Statement) -> Result<Vec<Row>, Error> {
        debug!(
            "querying: {} ({} args)",
            statement.sql,
            statement.args.len()
        );
        self.executor
            .query(&statement.sql, &statement.args)
            .map_err(|e| annotate(e, &statement.sql))
    }
}

/// Attach the SQL text to an execution error that lacks it.
fn annotate(error: Error, sql: &str) -> Error {
    match error {
        Error::Execute { message, sql: s } if s.is_empty() => Error::execute(message, sql),
        other => other,
    }
}
