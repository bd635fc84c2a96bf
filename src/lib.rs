//! # Ballast
//!
//! Ballast maps plain Rust record types to relational table schemas and
//! compiles fluent query descriptions into parameterized SQL for multiple
//! database backends. It is a mapping core, not a driver: statement
//! execution goes through an [`Executor`] the application supplies.
//!
//! A record type describes its columns with per-field annotations; the
//! schema reflector turns those into a [`Table`] once, at startup, and the
//! dialect compilers turn a table plus a query description into SQL text
//! and an ordered argument list.
//!
//! ```
//! use ballast::{Dialect, PostgresDialect, QueryColumn, QueryFilter, Record, Table};
//!
//! #[derive(Default, Record)]
//! #[record(table = "students")]
//! struct Student {
//!     #[sql("pk")]
//!     id: i32,
//!     #[sql("size=80,unique,nullable=false")]
//!     full_name: String,
//!     #[sql("check=(age>18)")]
//!     age: i32,
//! }
//!
//! # fn main() -> Result<(), ballast::Error> {
//! let table = Table::reflect::<Student>()?;
//! let statement = PostgresDialect::new().select(
//!     &table,
//!     &[QueryColumn::named("id"), QueryColumn::named("full_name")],
//!     &[QueryFilter::new("age", 21)],
//!     &[],
//!     None,
//!     -1,
//!     10,
//! )?;
//! assert_eq!(
//!     statement.sql,
//!     "SELECT \"id\",\"full_name\" FROM students WHERE \"age\" = $1 LIMIT 10"
//! );
//! # Ok(())
//! # }
//! ```

pub mod dialect;
pub mod error;
pub mod executor;
pub mod properties;
pub mod query;
pub mod schema;
pub mod session;
pub mod value;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;

#[cfg(test)]
mod tests_cfg;

pub use ballast_derive::{Embedded, Record};

pub use dialect::{
    Dialect, DialectRegistry, PostgresDialect, SqliteDialect, Statement,
};
pub use error::Error;
pub use executor::{Executor, Row};
pub use properties::PropertySet;
pub use query::{
    Conjunction, FilterArg, OrderArg, OrderKind, QueryColumn, QueryFilter, QueryOrder,
    QuerySet, SetArg, UpdateColumn,
};
pub use schema::{
    Column, Constraint, ConstraintKind, FieldDescriptor, FieldKind, Fields, Hooks, Index,
    IndexKind, Record, SqlKind, Table,
};
pub use schema::reflect::{CompositeConstraint, CompositeIndex};
pub use session::{Engine, Session};
pub use value::{FromValue, Value};
