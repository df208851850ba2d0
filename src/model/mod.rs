//! Wire types for the analytics API.
//!
//! Requests are plain `serde` structs decoded from JSON bodies; validation
//! against the registries happens later, in the normalizer and compiler.

pub mod compare;
pub mod query;
pub mod reports;

pub use compare::{
    AnchorKind, AnchorMonth, CompareRequest, ComparisonOutcome, GroupDelta, GroupedComparison,
    PeriodRows, PeriodValue, ScalarComparison, Trend, DEFAULT_COMPARE_METRIC, DEFAULT_WINDOW_DAYS,
};
pub use query::{
    AnalyticsQuery, ComparisonOp, FilterSpec, Having, OrderBy, QueryResponse, SortOrder,
    TimeWindow, WindowMode, DEFAULT_LIMIT,
};
pub use reports::{
    is_valid_uf, ClientSegmentRequest, ClientSegmentResponse, RecurringClient,
    RecurringClientsRequest, RecurringClientsResponse, DEFAULT_MIN_MONTHLY_REVENUE, UF_CODES,
};
