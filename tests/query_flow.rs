//! End-to-end query flow through the engine, session and mock executor.

use std::sync::Arc;

use ballast::test_support::MockExecutor;
use ballast::{
    DialectRegistry, Engine, Error, Hooks, Record, Row, Session, Table, Value,
};

#[derive(Debug, Default, Clone, PartialEq, Record)]
#[record(table = "students")]
struct Student {
    #[sql("pk")]
    id: i32,
    #[sql("size=80,unique,nullable=false")]
    full_name: String,
    #[sql("check=(age>18)")]
    age: i32,
    #[sql("size=24")]
    region: Option<String>,
}

fn postgres_engine(executor: Arc<MockExecutor>) -> Engine {
    Engine::new("postgres", executor, DialectRegistry::with_builtins())
}

#[test]
fn test_unregistered_dialect_is_fatal_configuration_error() {
    let executor = Arc::new(MockExecutor::new());
    let engine = Engine::new("oracle", executor, DialectRegistry::with_builtins());
    let err = engine.session().unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert!(err.to_string().contains("oracle"));
}

#[test]
fn test_create_table_statement_shape() {
    let executor = Arc::new(MockExecutor::new());
    let engine = postgres_engine(Arc::clone(&executor));
    let session = engine.session().unwrap();
    let table = Table::reflect::<Student>().unwrap();

    session.create_table(&table).unwrap();
    let (sql, args) = executor.last_statement().unwrap();
    assert!(sql.contains("id integer NOT NULL PRIMARY KEY"));
    assert!(sql.contains("full_name character varying(80) NOT NULL UNIQUE"));
    assert!(sql.contains("age integer CHECK (age>18)"));
    assert!(args.is_empty());
}

#[test]
fn test_insert_then_select_round_trip() {
    let executor = Arc::new(MockExecutor::new());
    let engine = postgres_engine(Arc::clone(&executor));
    let session = engine.session().unwrap();
    let table = Table::reflect::<Student>().unwrap();

    let mut records = vec![Student {
        id: 1,
        full_name: "Ada Lovelace".to_string(),
        age: 36,
        region: Some("UK".to_string()),
    }];
    session.table(&table).insert(&mut records).unwrap();

    // Serve back exactly what was inserted, in column order.
    executor.push_rows(vec![Row::new(vec![
        Value::Int(1),
        Value::Text("Ada Lovelace".to_string()),
        Value::Int(36),
        Value::Text("UK".to_string()),
    ])]);
    let fetched: Vec<Student> = session.table(&table).all().unwrap();
    assert_eq!(fetched, records);
}

#[test]
fn test_argument_order_matches_placeholders() {
    let executor = Arc::new(MockExecutor::new());
    let engine = postgres_engine(Arc::clone(&executor));
    let session = engine.session().unwrap();
    let table = Table::reflect::<Student>().unwrap();

    session
        .table(&table)
        .where_("region", "US")
        .where_op("age", 18, ">=")
        .update(vec![("age", 30)])
        .unwrap();
    let (sql, args) = executor.last_statement().unwrap();
    assert_eq!(
        sql,
        "UPDATE students SET \"age\"=$1 WHERE \"region\" = $2 AND \"age\" >= $3"
    );
    assert_eq!(
        args,
        vec![
            Value::Int(30),
            Value::Text("US".to_string()),
            Value::Int(18)
        ]
    );
    assert_eq!(sql.matches('$').count(), args.len());
}

#[test]
fn test_sqlite_engine_uses_question_placeholders() {
    let executor = Arc::new(MockExecutor::new());
    let engine = Engine::new("sqlite", executor.clone(), DialectRegistry::with_builtins());
    let session = engine.session().unwrap();
    let table = Table::reflect::<Student>().unwrap();

    session
        .table(&table)
        .where_("region", "US")
        .delete()
        .unwrap();
    let (sql, args) = executor.last_statement().unwrap();
    assert_eq!(sql, "DELETE FROM students WHERE \"region\" = ?");
    assert_eq!(args, vec![Value::Text("US".to_string())]);
}

#[derive(Debug, Default, Record)]
#[record(table = "enrollments")]
struct Enrollment {
    #[sql("pk")]
    student_id: i32,
    #[sql("pk")]
    course_id: i32,
    #[sql("size=2")]
    grade: String,
}

#[test]
fn test_get_composite_key_requires_both_values() {
    let executor = Arc::new(MockExecutor::new());
    let engine = postgres_engine(Arc::clone(&executor));
    let session = engine.session().unwrap();
    let table = Table::reflect::<Enrollment>().unwrap();

    let err = session
        .table(&table)
        .get::<Enrollment>(vec![Value::Int(1)])
        .unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert!(executor.statements().is_empty());

    executor.push_rows(vec![Row::new(vec![
        Value::Int(1),
        Value::Int(2),
        Value::Text("A".to_string()),
    ])]);
    let found: Option<Enrollment> = session
        .table(&table)
        .get(vec![Value::Int(1), Value::Int(2)])
        .unwrap();
    assert_eq!(found.unwrap().grade, "A");
    let (sql, _) = executor.last_statement().unwrap();
    assert!(sql.contains("WHERE \"student_id\" = $1 AND \"course_id\" = $2"));
}

#[derive(Debug, Default, Record)]
#[record(table = "events", custom_hooks)]
struct Event {
    #[sql("pk")]
    id: i32,
    #[sql("size=64,nullable=false")]
    name: String,
}

impl Hooks for Event {
    fn before_insert(&mut self, _table: &Table, _session: &Session) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::query("event name is required"));
        }
        self.name = self.name.to_uppercase();
        Ok(())
    }
}

#[test]
fn test_insert_hooks_run_and_can_abort() {
    let executor = Arc::new(MockExecutor::new());
    let engine = postgres_engine(Arc::clone(&executor));
    let session = engine.session().unwrap();
    let table = Table::reflect::<Event>().unwrap();

    let mut ok = vec![Event {
        id: 1,
        name: "launch".to_string(),
    }];
    session.table(&table).insert(&mut ok).unwrap();
    let (_, args) = executor.last_statement().unwrap();
    assert!(args.contains(&Value::Text("LAUNCH".to_string())));

    let mut bad = vec![Event {
        id: 2,
        name: String::new(),
    }];
    let before = executor.statements().len();
    let err = session.table(&table).insert(&mut bad).unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert_eq!(executor.statements().len(), before);
}
