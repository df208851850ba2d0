//! Execution collaborator.
//!
//! The core never talks to a database directly: compiled statements are
//! handed to a [`QueryExecutor`], which returns rows keyed by output column.

mod postgres;

pub use postgres::{PgExecutor, PoolOptions};

use async_trait::async_trait;

use crate::compile::CompiledQuery;
use crate::error::AnalyticsResult;

/// One result row: output column name to JSON value, in select-list order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Runs compiled statements against the backing store.
///
/// Implementations must fail the whole call on connection loss rather than
/// return a partial row set.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a statement with its bound parameters.
    async fn execute(&self, query: &CompiledQuery) -> AnalyticsResult<Vec<Row>>;

    /// Check that the store is reachable.
    async fn ping(&self) -> AnalyticsResult<()>;
}
