//! SQL Dialect definitions and formatting rules.
//!
//! A trait-based abstraction over the handful of syntax differences the
//! analytics statements run into:
//!
//! - Bind placeholders: `$n` (PostgreSQL) vs `?` (DuckDB, ANSI)
//! - Row cap: `LIMIT n` vs `FETCH FIRST n ROWS ONLY`
//! - Aggregate `FILTER (WHERE ...)` vs a CASE fallback
//! - Function names (`unaccent` vs `strip_accents`)
//!
//! # Usage
//!
//! ```ignore
//! use pricing_analytics::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("cliente");  // "cliente"
//! let slot = dialect.placeholder(2);                  // $2
//! ```

mod ansi;
mod duckdb;
pub mod helpers;
mod postgres;

pub use ansi::Ansi;
pub use duckdb::DuckDb;
pub use postgres::Postgres;

use std::str::FromStr;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal, doubling embedded single quotes.
    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    // =========================================================================
    // Bind Parameters
    // =========================================================================

    /// Render the placeholder for the 1-based parameter `index`.
    ///
    /// Anonymous placeholders bind in textual order, so statements must be
    /// assembled in the same order their parameters are collected.
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".into()
    }

    // =========================================================================
    // Row cap
    // =========================================================================

    /// Emit the row cap clause around an already-rendered operand.
    fn emit_limit(&self, limit: &TokenStream) -> TokenStream {
        helpers::emit_limit_standard(limit)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Whether this dialect supports the FILTER clause for aggregates.
    ///
    /// PostgreSQL and DuckDB support `COUNT(*) FILTER (WHERE ...)`.
    fn supports_aggregate_filter(&self) -> bool {
        false
    }

    // =========================================================================
    // Function Remapping
    // =========================================================================

    /// Remap a function name for this dialect.
    ///
    /// Returns `Some(new_name)` if the function should be remapped, `None` to
    /// keep the original. The input is matched case-insensitively.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    DuckDb,
    Ansi,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
            Dialect::Ansi => &Ansi,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn emit_limit(&self, limit: &TokenStream) -> TokenStream {
        self.dialect().emit_limit(limit)
    }

    fn supports_aggregate_filter(&self) -> bool {
        self.dialect().supports_aggregate_filter()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Error for dialect names that don't match any supported dialect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown SQL dialect '{0}' (expected postgres, duckdb or ansi)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            "ansi" => Ok(Dialect::Ansi),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}
