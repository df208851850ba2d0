//! Analytics query request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::executor::Row;
use crate::sql::BinaryOperator;
use crate::time::ResolvedWindow;

/// Row cap applied when a request doesn't set one.
pub const DEFAULT_LIMIT: u32 = 200;

// =============================================================================
// Time window
// =============================================================================

/// How the reporting period is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// The last `days` days up to today.
    #[default]
    Rolling,
    /// Explicit inclusive `start`..`end` dates.
    Range,
}

/// Declarative time specification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindow {
    pub mode: WindowMode,
    pub days: Option<u32>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl TimeWindow {
    pub fn rolling(days: u32) -> Self {
        Self {
            mode: WindowMode::Rolling,
            days: Some(days),
            ..Self::default()
        }
    }

    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            mode: WindowMode::Range,
            days: None,
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }
}

// =============================================================================
// Filters, HAVING, ORDER BY
// =============================================================================

/// A caller-supplied predicate on a raw column, as received on the wire.
///
/// The operator stays a string here so unknown operators surface as
/// `InvalidOperator` rather than a generic decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub op: String,
    #[serde(default)]
    pub value: Value,
}

impl FilterSpec {
    pub fn new(field: impl Into<String>, op: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value,
        }
    }

    /// `like` and `ilike` filters.
    pub fn is_pattern(&self) -> bool {
        matches!(self.op.as_str(), "like" | "ilike")
    }
}

/// Scalar comparison operators shared by filters and HAVING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    /// Parse a wire operator; `None` for anything outside `= != > >= < <=`.
    pub fn from_symbol(op: &str) -> Option<Self> {
        match op {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn parse(op: &str) -> AnalyticsResult<Self> {
        Self::from_symbol(op).ok_or_else(|| AnalyticsError::InvalidOperator(op.to_string()))
    }

    pub fn as_binary(self) -> BinaryOperator {
        match self {
            Self::Eq => BinaryOperator::Eq,
            Self::Ne => BinaryOperator::Ne,
            Self::Gt => BinaryOperator::Gt,
            Self::Gte => BinaryOperator::Gte,
            Self::Lt => BinaryOperator::Lt,
            Self::Lte => BinaryOperator::Lte,
        }
    }
}

/// Post-aggregation predicate on a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Having {
    pub metric: String,
    pub op: String,
    pub value: f64,
}

/// Sort direction for ORDER BY entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Ordering on a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub metric: String,
    #[serde(default)]
    pub dir: SortOrder,
}

// =============================================================================
// AnalyticsQuery
// =============================================================================

/// A structured aggregate query over the order-item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsQuery {
    pub time: TimeWindow,
    pub filters: Vec<FilterSpec>,
    pub group_by: Vec<String>,
    pub metrics: Vec<String>,
    pub having: Vec<Having>,
    pub order_by: Vec<OrderBy>,
    pub limit: u32,
}

impl Default for AnalyticsQuery {
    fn default() -> Self {
        Self {
            time: TimeWindow::default(),
            filters: Vec::new(),
            group_by: Vec::new(),
            metrics: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Response body for `POST /analytics/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub time_resolved: ResolvedWindow,
    pub group_by: Vec<String>,
    pub metrics: Vec<String>,
    pub rows: Vec<Row>,
}
