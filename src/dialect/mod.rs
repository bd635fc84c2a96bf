//! Dialect compilers: backend-specific translation from a table descriptor
//! plus a query description into SQL text and an ordered argument list.
//!
//! Compilers are pure and stateless; the positional-parameter counter is
//! local to each statement being built and never shared across
//! invocations. Dialects are looked up by driver name through an explicit
//! [`DialectRegistry`] constructed once at process start.

pub mod postgres;
pub mod sqlite;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::query::filter::{QueryColumn, QueryFilter, QueryOrder, UpdateColumn};
use crate::schema::table::Table;
use crate::value::Value;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// A compiled statement: SQL text plus its ordered argument list. The
/// argument order matches the left-to-right appearance of placeholders in
/// the text.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
}

/// Backend-specific SQL compiler.
///
/// Every method either returns a complete statement or an error; no partial
/// SQL is ever produced. For `insert`/`insert_returning` the values are the
/// record's fields in column order, already restricted to the caller's
/// field subset; the zero-value omission rule is applied here (see
/// [`PostgresDialect::insert`]).
pub trait Dialect: Send + Sync {
    /// Driver name this dialect registers under.
    fn name(&self) -> &'static str;

    fn create(&self, table: &Table) -> Result<Statement, Error>;

    fn drop(&self, table: &Table, if_exists: bool) -> Result<Statement, Error>;

    #[allow(clippy::too_many_arguments)]
    fn select(
        &self,
        table: &Table,
        columns: &[QueryColumn],
        filters: &[QueryFilter],
        orders: &[QueryOrder],
        lock: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Statement, Error>;

    fn insert(&self, table: &Table, values: &[(String, Value)]) -> Result<Statement, Error>;

    fn insert_returning(
        &self,
        table: &Table,
        values: &[(String, Value)],
        key: &str,
    ) -> Result<Statement, Error>;

    fn update(
        &self,
        table: &Table,
        filters: &[QueryFilter],
        sets: &[UpdateColumn],
    ) -> Result<Statement, Error>;

    fn delete(&self, table: &Table, filters: &[QueryFilter]) -> Result<Statement, Error>;
}

/// Named registry of dialect compilers, consulted by
/// [`Engine::session`](crate::session::Engine::session) at dialect-resolution
/// time. Constructed explicitly and passed into the engine rather than
/// living in process-global state.
#[derive(Clone, Default)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        DialectRegistry {
            dialects: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in backends.
    pub fn with_builtins() -> Self {
        let mut registry = DialectRegistry::new();
        registry.register(Arc::new(PostgresDialect::new()));
        registry.register(Arc::new(SqliteDialect::new()));
        registry
    }

    pub fn register(&mut self, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(dialect.name().to_string(), dialect);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        self.dialects.get(name).cloned()
    }
}
