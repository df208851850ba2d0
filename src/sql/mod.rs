//! SQL generation module.
//!
//! A type-safe SQL builder for the analytics statements:
//!
//! - [`query`] - SELECT query builder (CTEs, grouping, HAVING, LIMIT)
//! - [`expr`] - Expression AST and builder DSL
//! - [`param`] - Typed bind parameters and their collector
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod param;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect, UnknownDialect};
pub use expr::{
    case_when, cast, coalesce, col, count_distinct, count_star, count_where, date_trunc, lit_int,
    lit_null, lower, paren, sum, unaccent, BinaryOperator, Expr, ExprExt, Literal, SortDir,
    SqlType,
};
pub use param::{Param, Params};
pub use query::{Cte, OrderByExpr, Query, SelectExpr, TableRef};
pub use token::{Token, TokenStream};
