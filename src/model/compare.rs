//! Period comparison request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query::FilterSpec;
use crate::executor::Row;

/// Window length used when a comparison doesn't set one.
pub const DEFAULT_WINDOW_DAYS: u32 = 90;

/// Metric compared when a request doesn't name one.
pub const DEFAULT_COMPARE_METRIC: &str = "mc_percentual_ponderado";

/// Anchor granularity. Only calendar months are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    #[default]
    Month,
}

/// The month whose last day ends the current comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorMonth {
    #[serde(rename = "type", default)]
    pub kind: AnchorKind,
    pub year: i32,
    pub month: u32,
}

impl AnchorMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            kind: AnchorKind::Month,
            year,
            month,
        }
    }

    /// `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn default_metric() -> String {
    DEFAULT_COMPARE_METRIC.to_string()
}

/// Compare one metric across two adjacent windows ending at an anchor month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub anchor: AnchorMonth,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default = "default_metric")]
    pub metric: String,
}

impl CompareRequest {
    pub fn new(anchor: AnchorMonth) -> Self {
        Self {
            anchor,
            window_days: DEFAULT_WINDOW_DAYS,
            filters: Vec::new(),
            group_by: Vec::new(),
            metric: default_metric(),
        }
    }
}

/// Sign of the change between the two windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
    /// One of the two values is missing.
    Undefined,
}

/// One window's bounds and scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodValue {
    pub start: String,
    pub end: String,
    pub value: Option<f64>,
}

/// One window's bounds and full row set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRows {
    pub start: String,
    pub end: String,
    pub rows: Vec<Row>,
}

/// Ungrouped comparison result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarComparison {
    pub anchor: String,
    pub metric: String,
    pub current: PeriodValue,
    pub previous: PeriodValue,
    pub delta_abs: Option<f64>,
    pub delta_pct: Option<f64>,
    pub trend: Trend,
}

/// Per-group line of a grouped comparison, matched on the group-by values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDelta {
    /// Group-by column values identifying the group.
    pub key: serde_json::Map<String, Value>,
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub delta_abs: Option<f64>,
    pub delta_pct: Option<f64>,
    pub trend: Trend,
}

/// Grouped comparison result.
///
/// `current` and `previous` carry the raw row sets; `groups` matches them by
/// group key with a full outer join (a group missing on one side has a null
/// value there and an undefined trend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedComparison {
    pub anchor: String,
    pub metric: String,
    pub current: PeriodRows,
    pub previous: PeriodRows,
    pub groups: Vec<GroupDelta>,
}

/// Response body for `POST /analytics/compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonOutcome {
    Grouped(GroupedComparison),
    Scalar(ScalarComparison),
}
