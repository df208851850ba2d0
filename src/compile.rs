//! Query Compiler: from a normalized request to a parameterized statement.
//!
//! ```text
//! AnalyticsQuery → normalize → resolve window → compile → CompiledQuery
//! ```
//!
//! Only registry-validated identifiers are written into SQL text. Every value
//! that came from the request travels in the parameter list.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pricing_analytics::catalog::Catalog;
//! use pricing_analytics::compile::{CompileOptions, QueryCompiler};
//! use pricing_analytics::model::{AnalyticsQuery, TimeWindow};
//!
//! let compiler = QueryCompiler::new(Arc::new(Catalog::standard()), CompileOptions::default());
//! let query = AnalyticsQuery {
//!     time: TimeWindow::range("2024-01-01", "2024-01-31"),
//!     metrics: vec!["receita".into()],
//!     ..AnalyticsQuery::default()
//! };
//! let prepared = compiler.prepare(query, pricing_analytics::time::today())?;
//! println!("{}", prepared.compiled.sql);
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog::{Catalog, FieldDefinition, FieldKind, MetricDefinition, DEFAULT_METRICS};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::model::{AnalyticsQuery, ComparisonOp, FilterSpec, SortOrder};
use crate::normalize::normalize;
use crate::sql::{
    col, lower, unaccent, Dialect, Expr, ExprExt, OrderByExpr, Param, Params, Query, SelectExpr,
    TableRef,
};
use crate::time::{self, ResolvedWindow};

// ============================================================================
// Options
// ============================================================================

/// Where and how statements are generated.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,
    /// The order-item fact table.
    pub table: TableRef,
    /// Date column the time window applies to.
    pub date_column: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            table: TableRef::new("pedido_item"),
            date_column: "emissao".into(),
        }
    }
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the fact table, `schema.table` or `table`.
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = TableRef::parse(table);
        self
    }

    pub fn with_date_column(mut self, column: &str) -> Self {
        self.date_column = column.into();
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A parameterized statement ready for execution.
///
/// Pure function of the request; never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// SQL text containing placeholders only.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<Param>,
    /// Resolved window start.
    pub start: String,
    /// Resolved window end.
    pub end: String,
    #[serde(skip)]
    pub dialect: Dialect,
}

/// A normalized request together with its compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub query: AnalyticsQuery,
    pub compiled: CompiledQuery,
}

// ============================================================================
// Filter predicates
// ============================================================================

/// A filter after shape validation, one variant per operator family.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `col op ?`
    Compare { op: ComparisonOp, value: Value },
    /// `col IN (?, ...)`, never empty.
    In(Vec<Value>),
    /// `col BETWEEN ? AND ?`
    Between { low: Value, high: Value },
    /// Accent- and case-insensitive `LIKE`.
    Like {
        pattern: String,
        case_insensitive: bool,
    },
}

impl Predicate {
    /// Check the operator and the shape of the value it was given.
    pub fn parse(filter: &FilterSpec) -> AnalyticsResult<Self> {
        let field = &filter.field;
        match filter.op.as_str() {
            "in" => match &filter.value {
                Value::Array(items) if !items.is_empty() => Ok(Predicate::In(items.clone())),
                _ => Err(AnalyticsError::invalid_request(format!(
                    "'in' filter on {field} requires a non-empty list"
                ))),
            },
            "between" => match &filter.value {
                Value::Array(items) if items.len() == 2 => Ok(Predicate::Between {
                    low: items[0].clone(),
                    high: items[1].clone(),
                }),
                _ => Err(AnalyticsError::invalid_request(format!(
                    "'between' filter on {field} requires [min, max]"
                ))),
            },
            op @ ("like" | "ilike") => match &filter.value {
                Value::String(pattern) => Ok(Predicate::Like {
                    pattern: pattern.clone(),
                    case_insensitive: op == "ilike",
                }),
                _ => Err(AnalyticsError::invalid_request(format!(
                    "'{op}' filter on {field} requires a string pattern"
                ))),
            },
            op => ComparisonOp::parse(op).map(|op| Predicate::Compare {
                op,
                value: filter.value.clone(),
            }),
        }
    }
}

/// Convert a JSON scalar into a bind value matching the column's kind.
pub fn coerce_value(field: &FieldDefinition, value: &Value) -> AnalyticsResult<Param> {
    let mismatch = || {
        AnalyticsError::invalid_request(format!(
            "value {value} is not valid for field {} ({:?})",
            field.name, field.kind
        ))
    };
    let number = |n: &serde_json::Number| {
        n.as_i64()
            .map(Param::Int)
            .or_else(|| n.as_f64().map(Param::Float))
            .ok_or_else(mismatch)
    };

    match (field.kind, value) {
        // `col = NULL` never matches, and an untyped NULL doesn't bind
        (_, Value::Null) => Err(AnalyticsError::invalid_request(format!(
            "filter on {} requires a value, got null",
            field.name
        ))),
        (_, Value::Array(_) | Value::Object(_)) => Err(AnalyticsError::invalid_request(format!(
            "filter on {} expects scalar values",
            field.name
        ))),
        (FieldKind::Text, Value::String(s)) => Ok(Param::Text(s.clone())),
        (FieldKind::Text, Value::Number(n)) => Ok(Param::Text(n.to_string())),
        (FieldKind::Text, Value::Bool(b)) => Ok(Param::Text(b.to_string())),
        (FieldKind::Integer | FieldKind::Decimal, Value::Number(n)) => number(n),
        (FieldKind::Integer, Value::String(s)) => {
            s.trim().parse().map(Param::Int).map_err(|_| mismatch())
        }
        (FieldKind::Decimal, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Param::Float)
            .ok_or_else(mismatch),
        (FieldKind::Date, Value::String(s)) => time::parse_date(s).map(Param::Date),
        _ => Err(mismatch()),
    }
}

/// The metric list a request actually selects: defaults when it names none.
pub fn effective_metrics(metrics: &[String]) -> Vec<String> {
    if metrics.is_empty() {
        DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
    } else {
        metrics.to_vec()
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles requests against the shared registries.
///
/// Cheap to clone; the catalog is shared.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    catalog: Arc<Catalog>,
    options: CompileOptions,
}

impl QueryCompiler {
    pub fn new(catalog: Arc<Catalog>, options: CompileOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Normalize, resolve the window against `today`, and compile.
    pub fn prepare(&self, query: AnalyticsQuery, today: NaiveDate) -> AnalyticsResult<PreparedQuery> {
        let query = normalize(query, &self.catalog);
        let window = time::resolve_window(&query.time, today)?;
        let compiled = self.compile(&query, &window)?;
        Ok(PreparedQuery { query, compiled })
    }

    /// Compile a normalized request over a resolved window.
    ///
    /// Clause order is fixed: select list, WHERE (window then filters),
    /// GROUP BY, HAVING, ORDER BY, LIMIT. Parameters are numbered in the
    /// same order.
    pub fn compile(
        &self,
        query: &AnalyticsQuery,
        window: &ResolvedWindow,
    ) -> AnalyticsResult<CompiledQuery> {
        let mut params = Params::new();
        let mut select = Vec::new();
        let mut group_by = Vec::new();

        // 1. group-by columns
        for name in &query.group_by {
            let field = self.field(name)?;
            select.push(SelectExpr::new(col(field.name)));
            group_by.push(col(field.name));
        }

        // 2. metrics
        for name in effective_metrics(&query.metrics) {
            select.push(self.metric(&name)?.select_expr());
        }

        // 3. time window
        let mut sql_query = Query::new()
            .select(select)
            .from(self.options.table.clone())
            .filter(self.window_predicate(window, &mut params)?);

        // 4. filters
        for filter in &query.filters {
            sql_query = sql_query.filter(self.filter_clause(filter, &mut params)?);
        }

        // 5. GROUP BY
        if !group_by.is_empty() {
            sql_query = sql_query.group_by(group_by);
        }

        // 6. HAVING
        for having in &query.having {
            let metric = self.metric(&having.metric)?;
            let op = ComparisonOp::parse(&having.op)?;
            let threshold = params.push(Param::Float(having.value));
            sql_query = sql_query.having(metric.expr.clone().binary(op.as_binary(), threshold));
        }

        // 7. ORDER BY
        if !query.order_by.is_empty() {
            let mut order = Vec::with_capacity(query.order_by.len());
            for entry in &query.order_by {
                let expr = self.metric(&entry.metric)?.expr.clone();
                order.push(match entry.dir {
                    SortOrder::Asc => OrderByExpr::asc(expr),
                    SortOrder::Desc => OrderByExpr::desc(expr),
                });
            }
            sql_query = sql_query.order_by(order);
        }

        // 8. LIMIT
        if query.limit == 0 {
            return Err(AnalyticsError::invalid_request("limit must be at least 1"));
        }
        sql_query = sql_query.limit(params.push(Param::Int(i64::from(query.limit))));

        Ok(self.finish(&sql_query, params, window))
    }

    // ========================================================================
    // Shared building blocks
    // ========================================================================

    /// Whitelisted field, or `InvalidField`.
    pub(crate) fn field(&self, name: &str) -> AnalyticsResult<&FieldDefinition> {
        self.catalog
            .fields
            .get(name)
            .ok_or_else(|| AnalyticsError::InvalidField(name.to_string()))
    }

    /// Registered metric, or `InvalidMetric`.
    pub(crate) fn metric(&self, name: &str) -> AnalyticsResult<&MetricDefinition> {
        self.catalog
            .metrics
            .get(name)
            .ok_or_else(|| AnalyticsError::InvalidMetric(name.to_string()))
    }

    /// `<date_column> BETWEEN ? AND ?`, binding the window bounds as dates.
    pub(crate) fn window_predicate(
        &self,
        window: &ResolvedWindow,
        params: &mut Params,
    ) -> AnalyticsResult<Expr> {
        let start = time::parse_date(&window.start)?;
        let end = time::parse_date(&window.end)?;
        Ok(col(&self.options.date_column).between(params.push(start), params.push(end)))
    }

    /// Compile one filter into a clause, appending its values to `params`.
    pub(crate) fn filter_clause(
        &self,
        filter: &FilterSpec,
        params: &mut Params,
    ) -> AnalyticsResult<Expr> {
        let field = self.field(&filter.field)?;
        let column = col(field.name);

        let clause = match Predicate::parse(filter)? {
            Predicate::Compare { op, value } => {
                let value = params.push(coerce_value(field, &value)?);
                column.binary(op.as_binary(), value)
            }
            Predicate::In(values) => {
                let mut slots = Vec::with_capacity(values.len());
                for value in &values {
                    slots.push(params.push(coerce_value(field, value)?));
                }
                column.in_list(slots)
            }
            Predicate::Between { low, high } => {
                let low = params.push(coerce_value(field, &low)?);
                let high = params.push(coerce_value(field, &high)?);
                column.between(low, high)
            }
            // Both operators fold case and accents; `ilike` is kept for callers.
            Predicate::Like { pattern, .. } => {
                if field.kind != FieldKind::Text {
                    return Err(AnalyticsError::invalid_request(format!(
                        "pattern filters apply to text fields only, {} is {:?}",
                        field.name, field.kind
                    )));
                }
                let pattern = params.push(Param::Text(pattern));
                unaccent(lower(column)).like(unaccent(lower(pattern)))
            }
        };

        Ok(clause)
    }

    /// Render `query` and package it with its parameters.
    pub(crate) fn finish(
        &self,
        query: &Query,
        params: Params,
        window: &ResolvedWindow,
    ) -> CompiledQuery {
        let dialect = self.options.dialect;
        let sql = query.to_sql(dialect);
        debug!(%dialect, params = params.len(), sql = %sql, "compiled statement");

        CompiledQuery {
            sql,
            params: params.into_vec(),
            start: window.start.clone(),
            end: window.end.clone(),
            dialect,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
