//! Shared fixtures for the crate's own tests.
//!
//! `Student` is implemented by hand here; applications get the same impls
//! from `#[derive(Record)]`.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::dialect::DialectRegistry;
use crate::error::Error;
use crate::schema::reflect::{FieldDescriptor, Fields, Hooks, Record};
use crate::schema::table::Table;
use crate::schema::types::SqlKind;
use crate::session::{Engine, Session};
use crate::test_support::MockExecutor;
use crate::value::{FromValue, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Student {
    pub id: i32,
    pub full_name: String,
    pub age: i32,
    pub region: Option<String>,
    pub created: Option<NaiveDateTime>,
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
                "size=80,unique,nullable=false,index",
                <String as SqlKind>::kind(),
                <String as SqlKind>::declare,
            ),
            FieldDescriptor::new(
                "age",
                "check=(age>18)",
                <i32 as SqlKind>::kind(),
                <i32 as SqlKind>::declare,
            ),
            FieldDescriptor::new(
                "region",
                "size=24",
                <Option<String> as SqlKind>::kind(),
                <Option<String> as SqlKind>::declare,
            ),
            FieldDescriptor::new(
                "created",
                "type=timestamp,default=now()",
                <Option<NaiveDateTime> as SqlKind>::kind(),
                <Option<NaiveDateTime> as SqlKind>::declare,
            ),
        ]
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::from(self.id)),
            "full_name" => Some(Value::from(self.full_name.clone())),
            "age" => Some(Value::from(self.age)),
            "region" => Some(Value::from(self.region.clone())),
            "created" => Some(Value::from(self.created)),
            _ => None,
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
            "region" => {
                self.region = FromValue::from_value(value)?;
                Ok(())
            }
            "created" => {
                self.created = FromValue::from_value(value)?;
                Ok(())
            }
            _ => Err(Error::query(format!("unknown field '{field}'"))),
        }
    }
}

impl Record for Student {
    fn table_name() -> &'static str {
        "students"
    }
}

impl Hooks for Student {}

pub fn students_table() -> Table {
    Table::reflect::<Student>().expect("fixture table reflects")
}

pub fn postgres_session(executor: Arc<MockExecutor>) -> Session {
    Engine::new("postgres", executor, DialectRegistry::with_builtins())
        .session()
        .expect("postgres dialect registered")
}
