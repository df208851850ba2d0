//! Period Comparison Engine.
//!
//! Compares one metric over two adjacent windows of equal length, the
//! current one ending on the last day of an anchor month:
//!
//! ```text
//! CompareRequest → plan (validate, windows, two range queries)
//!                → compile both → execute current, then previous
//!                → scalar delta/trend  |  grouped rows + per-group deltas
//! ```
//!
//! Both statements are compiled before either is executed, so a request that
//! fails validation never reaches the database.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::Catalog;
use crate::compile::{CompiledQuery, QueryCompiler};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::executor::{QueryExecutor, Row};
use crate::model::{
    AnalyticsQuery, AnchorMonth, CompareRequest, ComparisonOutcome, GroupDelta, GroupedComparison,
    PeriodRows, PeriodValue, ScalarComparison, TimeWindow, Trend,
};
use crate::normalize::normalize;
use crate::time::{comparison_windows, ComparisonWindows, ResolvedWindow};

/// Row cap for each side of a comparison.
pub const COMPARE_LIMIT: u32 = 1000;

// ============================================================================
// Planning
// ============================================================================

/// A validated comparison: the windows and one normalized query per window.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPlan {
    pub anchor: AnchorMonth,
    /// Canonical metric name, also its output column.
    pub metric: String,
    /// Canonical group-by columns.
    pub group_by: Vec<String>,
    pub windows: ComparisonWindows,
    pub current: AnalyticsQuery,
    pub previous: AnalyticsQuery,
}

/// Validate a comparison request and derive its two queries.
pub fn plan_comparison(request: &CompareRequest, catalog: &Catalog) -> AnalyticsResult<ComparisonPlan> {
    let metric = catalog.metrics.resolve_alias(request.metric.trim());
    if !catalog.metrics.is_known(metric) {
        return Err(AnalyticsError::InvalidMetric(request.metric.clone()));
    }
    let metric = metric.to_string();

    let windows = comparison_windows(&request.anchor, request.window_days)?;

    let query_for = |window: ResolvedWindow| {
        let query = AnalyticsQuery {
            time: TimeWindow::range(window.start, window.end),
            filters: request.filters.clone(),
            group_by: request.group_by.clone(),
            metrics: vec![metric.clone()],
            limit: COMPARE_LIMIT,
            ..AnalyticsQuery::default()
        };
        normalize(query, catalog)
    };
    let current = query_for(windows.current());
    let previous = query_for(windows.previous());

    Ok(ComparisonPlan {
        anchor: request.anchor,
        group_by: current.group_by.clone(),
        metric,
        windows,
        current,
        previous,
    })
}

impl ComparisonPlan {
    /// Compile both sides: `(current, previous)`.
    pub fn compile(&self, compiler: &QueryCompiler) -> AnalyticsResult<(CompiledQuery, CompiledQuery)> {
        let current = compiler.compile(&self.current, &self.windows.current())?;
        let previous = compiler.compile(&self.previous, &self.windows.previous())?;
        Ok((current, previous))
    }

    /// Shape the executed row sets into the response.
    pub fn outcome(&self, current_rows: Vec<Row>, previous_rows: Vec<Row>) -> ComparisonOutcome {
        let current = self.windows.current();
        let previous = self.windows.previous();

        if self.group_by.is_empty() {
            let current_value = metric_value(&current_rows, &self.metric);
            let previous_value = metric_value(&previous_rows, &self.metric);
            let delta = Delta::between(current_value, previous_value);

            return ComparisonOutcome::Scalar(ScalarComparison {
                anchor: self.anchor.label(),
                metric: self.metric.clone(),
                current: PeriodValue {
                    start: current.start,
                    end: current.end,
                    value: current_value,
                },
                previous: PeriodValue {
                    start: previous.start,
                    end: previous.end,
                    value: previous_value,
                },
                delta_abs: delta.abs,
                delta_pct: delta.pct,
                trend: delta.trend,
            });
        }

        let groups = reconcile_groups(&current_rows, &previous_rows, &self.group_by, &self.metric);
        ComparisonOutcome::Grouped(GroupedComparison {
            anchor: self.anchor.label(),
            metric: self.metric.clone(),
            current: PeriodRows {
                start: current.start,
                end: current.end,
                rows: current_rows,
            },
            previous: PeriodRows {
                start: previous.start,
                end: previous.end,
                rows: previous_rows,
            },
            groups,
        })
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Plan, compile, and run a comparison.
///
/// The two statements run one after the other; an executor failure on
/// either side fails the whole request.
pub async fn run_comparison(
    compiler: &QueryCompiler,
    executor: &dyn QueryExecutor,
    request: &CompareRequest,
) -> AnalyticsResult<ComparisonOutcome> {
    let plan = plan_comparison(request, compiler.catalog())?;
    let (current, previous) = plan.compile(compiler)?;

    debug!(
        anchor = %plan.anchor.label(),
        metric = %plan.metric,
        grouped = !plan.group_by.is_empty(),
        "running comparison"
    );

    let current_rows = executor.execute(&current).await?;
    let previous_rows = executor.execute(&previous).await?;

    Ok(plan.outcome(current_rows, previous_rows))
}

// ============================================================================
// Delta math
// ============================================================================

/// Absolute and relative change between two values, with its trend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub abs: Option<f64>,
    /// `abs / previous`; `None` when previous is missing or zero.
    pub pct: Option<f64>,
    pub trend: Trend,
}

impl Delta {
    pub fn between(current: Option<f64>, previous: Option<f64>) -> Self {
        let (Some(current), Some(previous)) = (current, previous) else {
            return Self {
                abs: None,
                pct: None,
                trend: Trend::Undefined,
            };
        };

        let abs = current - previous;
        // previous == 0 with current != 0 keeps a signed trend but no ratio
        let pct = (previous != 0.0).then(|| abs / previous);
        let trend = if abs > 0.0 {
            Trend::Up
        } else if abs < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        };

        Self {
            abs: Some(abs),
            pct,
            trend,
        }
    }
}

/// Numeric value of `column` in the first row, if any.
///
/// JSON numbers and numeric strings count; anything else is absent.
pub fn metric_value(rows: &[Row], column: &str) -> Option<f64> {
    rows.first().and_then(|row| row.get(column)).and_then(as_number)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Grouped reconciliation
// ============================================================================

fn group_key(row: &Row, group_by: &[String]) -> Map<String, Value> {
    group_by
        .iter()
        .map(|column| (column.clone(), row.get(column).cloned().unwrap_or(Value::Null)))
        .collect()
}

/// Full outer join of the two row sets on the group-by columns.
///
/// Groups appear in current-window order, followed by groups only seen in the
/// previous window in their own order.
pub fn reconcile_groups(
    current: &[Row],
    previous: &[Row],
    group_by: &[String],
    metric: &str,
) -> Vec<GroupDelta> {
    let mut order: Vec<Map<String, Value>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut values: Vec<(Option<f64>, Option<f64>)> = Vec::new();

    let mut visit = |row: &Row, is_current: bool| {
        let key = group_key(row, group_by);
        let signature = Value::Object(key.clone()).to_string();
        let slot = *index.entry(signature).or_insert_with(|| {
            order.push(key);
            values.push((None, None));
            order.len() - 1
        });
        let value = row.get(metric).and_then(as_number);
        if is_current {
            values[slot].0 = value;
        } else {
            values[slot].1 = value;
        }
    };

    for row in current {
        visit(row, true);
    }
    for row in previous {
        visit(row, false);
    }

    order
        .into_iter()
        .zip(values)
        .map(|(key, (current, previous))| {
            let delta = Delta::between(current, previous);
            GroupDelta {
                key,
                current,
                previous,
                delta_abs: delta.abs,
                delta_pct: delta.pct,
                trend: delta.trend,
            }
        })
        .collect()
}
