//! Crate-wide error type.
//!
//! One enum covers the four failure classes of the mapping core: schema
//! reflection, query construction, statement compilation, and execution.
//! Execution errors carry the SQL text that produced them for diagnostics.

use std::fmt;

/// Error type for schema reflection, compilation and execution
#[derive(Debug)]
pub enum Error {
    /// Schema-build failure: malformed annotation, unresolvable type,
    /// dangling composite-constraint field reference. Aborts `Table`
    /// construction.
    Schema(String),
    /// Query-construction misuse: primary-key count mismatch, unknown
    /// column, unregistered dialect. Surfaced before any SQL is generated.
    Query(String),
    /// A dialect compiler refusing a structurally invalid request.
    Compile(String),
    /// Row-to-record translation failure.
    Decode(String),
    /// Error surfaced from the external executor, annotated with the SQL
    /// text that produced it.
    Execute { message: String, sql: String },
}

impl Error {
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Error::Query(msg.into())
    }

    pub fn compile(msg: impl Into<String>) -> Self {
        Error::Compile(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    pub fn execute(msg: impl Into<String>, sql: impl Into<String>) -> Self {
        Error::Execute {
            message: msg.into(),
            sql: sql.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(s) => {
                write!(f, "schema error: {s}")
            }
            Error::Query(s) => {
                write!(f, "query error: {s}")
            }
            Error::Compile(s) => {
                write!(f, "compile error: {s}")
            }
            Error::Decode(s) => {
                write!(f, "decode error: {s}")
            }
            Error::Execute { message, sql } => {
                write!(f, "execution error: {message} (sql: {sql})")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_sql_text() {
        let err = Error::execute("connection reset", "SELECT 1");
        let text = err.to_string();
        assert!(text.contains("connection reset"));
        assert!(text.contains("SELECT 1"));
    }

    #[test]
    fn test_schema_error_display() {
        let err = Error::schema("unknown type for field 'age'");
        assert_eq!(
            err.to_string(),
            "schema error: unknown type for field 'age'"
        );
    }
}
