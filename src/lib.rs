//! # Pricing Analytics
//!
//! A query-compilation service over order-item sales data: callers describe
//! an aggregation declaratively and get back a safe, parameterized SQL
//! statement and its rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        HTTP request (AnalyticsQuery, CompareRequest,     │
//! │        segment and recurring-client reports)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [normalize]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Canonical names (field / metric aliases resolved)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [time + compile, against catalog]
//! ┌─────────────────────────────────────────────────────────┐
//! │        CompiledQuery { sql, params, start, end }         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │                Rows (column → JSON value)                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Only identifiers from the [`catalog`] whitelists are written into SQL
//! text; every caller value travels as a bind parameter.

pub mod catalog;
pub mod compare;
pub mod compile;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod normalize;
pub mod segments;
pub mod sql;
pub mod time;
pub mod web;

pub use catalog::Catalog;
pub use compile::{CompileOptions, CompiledQuery, QueryCompiler};
pub use error::{AnalyticsError, AnalyticsResult};
pub use executor::{QueryExecutor, Row};
pub use sql::{Dialect, Param};
