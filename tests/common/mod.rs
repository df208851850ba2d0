//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use pricing_analytics::catalog::Catalog;
use pricing_analytics::compile::{CompileOptions, CompiledQuery, QueryCompiler};
use pricing_analytics::error::AnalyticsResult;
use pricing_analytics::executor::{QueryExecutor, Row};

/// Executor that records every statement and replays queued responses.
///
/// An empty queue answers with no rows.
#[derive(Default)]
pub struct StubExecutor {
    executed: Mutex<Vec<CompiledQuery>>,
    responses: Mutex<VecDeque<AnalyticsResult<Vec<Row>>>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response; each value must be a JSON object.
    pub fn with_rows(self, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => panic!("row must be an object, got {other}"),
            })
            .collect();
        self.push(Ok(rows));
        self
    }

    pub fn with_error(self, error: pricing_analytics::AnalyticsError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: AnalyticsResult<Vec<Row>>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn executed(&self) -> Vec<CompiledQuery> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn execute(&self, query: &CompiledQuery) -> AnalyticsResult<Vec<Row>> {
        self.executed.lock().unwrap().push(query.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ping(&self) -> AnalyticsResult<()> {
        Ok(())
    }
}

pub fn compiler() -> QueryCompiler {
    QueryCompiler::new(Arc::new(Catalog::standard()), CompileOptions::default())
}

/// Parse `sql` with sqlparser's PostgreSQL dialect.
pub fn assert_valid_postgres(sql: &str) {
    if let Err(e) = Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        panic!("invalid SQL: {e}\n{sql}");
    }
}

/// Number of distinct `$n` placeholders in `sql`.
pub fn placeholder_count(sql: &str) -> usize {
    let mut n = 0;
    while sql.contains(&format!("${}", n + 1)) {
        n += 1;
    }
    n
}
