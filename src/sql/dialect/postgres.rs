//! PostgreSQL SQL dialect.
//!
//! The production target for the analytics service:
//! - ANSI identifier quoting (`"`)
//! - Numbered bind placeholders (`$1`, `$2`, ...)
//! - FILTER clause for aggregates
//! - `unaccent` extension for accent-insensitive matching

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_numbered(index)
    }

    fn supports_aggregate_filter(&self) -> bool {
        true
    }
}
