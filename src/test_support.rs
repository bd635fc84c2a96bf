//! Test-support executors.
//!
//! [`MockExecutor`] records every statement it receives and serves scripted
//! result rows, so tests can assert on exact SQL text, argument lists and
//! row translation without a live database. Compiled for the crate's own
//! tests and for downstream tests via the `test-helpers` feature.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::Error;
use crate::executor::{Executor, Row};
use crate::value::Value;

/// Recording executor with scripted query results.
pub struct MockExecutor {
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    results: Mutex<VecDeque<Vec<Row>>>,
    affected: Mutex<u64>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        MockExecutor {
            statements: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
            affected: Mutex::new(1),
        }
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Queue one result set; each `query` call consumes the front of the
    /// queue (an empty result when the queue is exhausted).
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.results.lock().expect("mock executor lock").push_back(rows);
    }

    /// Rows-affected count returned by subsequent `execute` calls.
    pub fn set_affected(&self, affected: u64) {
        *self.affected.lock().expect("mock executor lock") = affected;
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().expect("mock executor lock").clone()
    }

    pub fn last_statement(&self) -> Option<(String, Vec<Value>)> {
        self.statements
            .lock()
            .expect("mock executor lock")
            .last()
            .cloned()
    }

    fn record(&self, sql: &str, args: &[Value]) {
        self.statements
            .lock()
            .expect("mock executor lock")
            .push((sql.to_string(), args.to_vec()));
    }
}

impl Executor for MockExecutor {
    fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, Error> {
        self.record(sql, args);
        Ok(*self.affected.lock().expect("mock executor lock"))
    }

    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, Error> {
        self.record(sql, args);
        Ok(self
            .results
            .lock()
            .expect("mock executor lock")
            .pop_front()
            .unwrap_or_default())
    }
}
