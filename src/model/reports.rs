//! Request and response types for the client reports.

use serde::{Deserialize, Serialize};

use super::query::TimeWindow;
use crate::time::ResolvedWindow;

/// Monthly revenue threshold used when a segment request doesn't set one.
pub const DEFAULT_MIN_MONTHLY_REVENUE: f64 = 40_000.0;

/// Brazilian federative unit codes accepted as region filters.
pub const UF_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

pub fn is_valid_uf(code: &str) -> bool {
    UF_CODES.contains(&code)
}

fn default_min_monthly_revenue() -> f64 {
    DEFAULT_MIN_MONTHLY_REVENUE
}

/// Clients whose revenue reached a threshold in at least one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSegmentRequest {
    #[serde(default)]
    pub time: TimeWindow,
    #[serde(default = "default_min_monthly_revenue")]
    pub min_monthly_revenue: f64,
    #[serde(default)]
    pub uf: Option<String>,
}

impl Default for ClientSegmentRequest {
    fn default() -> Self {
        Self {
            time: TimeWindow::default(),
            min_monthly_revenue: DEFAULT_MIN_MONTHLY_REVENUE,
            uf: None,
        }
    }
}

/// Response body for `POST /segments/clients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSegmentResponse {
    pub time_resolved: ResolvedWindow,
    pub min_monthly_revenue: f64,
    pub uf: Option<String>,
    pub clientes: Vec<String>,
}

/// Clients that bought in every one of the listed months of a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringClientsRequest {
    pub year: i32,
    pub months: Vec<u32>,
    #[serde(default)]
    pub uf: Option<String>,
    #[serde(default)]
    pub min_total_revenue: Option<f64>,
}

/// One qualifying client and its revenue over the selected months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringClient {
    pub cliente: String,
    pub faturamento_total: f64,
}

/// Response body for `POST /clients/recurring`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringClientsResponse {
    pub year: i32,
    pub months: Vec<u32>,
    pub clientes: Vec<RecurringClient>,
}

/// Empty strings count as "not provided", like an absent field.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
