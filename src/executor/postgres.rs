//! PostgreSQL executor backed by a `sqlx` connection pool.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, warn};

use super::{QueryExecutor, Row};
use crate::compile::CompiledQuery;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::sql::Param;

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Executes statements on PostgreSQL.
///
/// Each statement runs as `SELECT row_to_json(q) FROM (<sql>) AS q`, so
/// rows arrive as JSON objects keyed by output column, whatever the
/// column types.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Build a pool without connecting; connections open on first use.
    pub fn connect_lazy(url: &str, options: PoolOptions) -> AnalyticsResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_lazy(url)
            .map_err(map_db_error)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn wrap_as_json(sql: &str) -> String {
    format!("SELECT row_to_json(q) FROM (\n{sql}\n) AS q")
}

/// Connectivity failures become `ExecutionUnavailable`, everything else
/// `Execution`.
fn map_db_error(e: sqlx::Error) -> AnalyticsError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => AnalyticsError::ExecutionUnavailable(e.to_string()),
        sqlx::Error::Database(db) => AnalyticsError::Execution(db.message().to_string()),
        other => AnalyticsError::Execution(other.to_string()),
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute(&self, query: &CompiledQuery) -> AnalyticsResult<Vec<Row>> {
        let sql = wrap_as_json(&query.sql);
        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        for param in &query.params {
            statement = match param {
                Param::Int(n) => statement.bind(*n),
                Param::Float(f) => statement.bind(*f),
                Param::Text(s) => statement.bind(s.clone()),
                Param::Date(d) => statement.bind(*d),
            };
        }

        let values = statement.fetch_all(&self.pool).await.map_err(|e| {
            let err = map_db_error(e);
            warn!(error = %err, "statement failed");
            err
        })?;
        debug!(rows = values.len(), "statement executed");

        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect())
    }

    async fn ping(&self) -> AnalyticsResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_db_error)
    }
}
