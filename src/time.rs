//! Time Window Resolver.
//!
//! Turns declarative time specifications into concrete date bounds and
//! derives the pair of adjacent windows used by period comparisons.

use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::model::{AnchorMonth, TimeWindow, WindowMode};

/// Rolling window length when a request omits `days` (or sends 0).
pub const DEFAULT_ROLLING_DAYS: u32 = 90;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Concrete inclusive bounds, as `YYYY-MM-DD` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedWindow {
    pub start: String,
    pub end: String,
}

impl ResolvedWindow {
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: format_date(start),
            end: format_date(end),
        }
    }
}

/// Today's date in the server's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` bound.
pub fn parse_date(value: &str) -> AnalyticsResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        AnalyticsError::invalid_request(format!("invalid date '{value}', expected YYYY-MM-DD"))
    })
}

fn days_before(date: NaiveDate, days: u32) -> AnalyticsResult<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(days))).ok_or_else(|| {
        AnalyticsError::invalid_request(format!("{days} days before {date} is out of range"))
    })
}

/// Resolve a window against `today`.
///
/// Rolling windows end today and start `days` earlier. Range bounds are
/// returned verbatim; both must be present and non-empty.
pub fn resolve_window(window: &TimeWindow, today: NaiveDate) -> AnalyticsResult<ResolvedWindow> {
    match window.mode {
        WindowMode::Rolling => {
            let days = match window.days {
                Some(0) | None => DEFAULT_ROLLING_DAYS,
                Some(d) => d,
            };
            let start = days_before(today, days)?;
            Ok(ResolvedWindow::from_dates(start, today))
        }
        WindowMode::Range => {
            let bound = |b: &Option<String>| {
                b.as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            };
            match (bound(&window.start), bound(&window.end)) {
                (Some(start), Some(end)) => Ok(ResolvedWindow { start, end }),
                _ => Err(AnalyticsError::invalid_request(
                    "range mode requires time.start and time.end (YYYY-MM-DD)",
                )),
            }
        }
    }
}

fn check_month(month: u32) -> AnalyticsResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(AnalyticsError::invalid_request(format!(
            "month must be between 1 and 12, got {month}"
        )))
    }
}

/// First day of the given month.
pub fn month_start(year: i32, month: u32) -> AnalyticsResult<NaiveDate> {
    check_month(month)?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AnalyticsError::invalid_request(format!("year {year} is out of range")))
}

/// Last calendar day of the given month.
pub fn month_end(year: i32, month: u32) -> AnalyticsResult<NaiveDate> {
    let first = month_start(year, month)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        first.with_month(month + 1)
    };
    next.and_then(|d| d.pred_opt())
        .ok_or_else(|| AnalyticsError::invalid_request(format!("year {year} is out of range")))
}

/// Current and previous windows for a period comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonWindows {
    pub current_start: NaiveDate,
    pub current_end: NaiveDate,
    pub previous_start: NaiveDate,
    pub previous_end: NaiveDate,
}

impl ComparisonWindows {
    pub fn current(&self) -> ResolvedWindow {
        ResolvedWindow::from_dates(self.current_start, self.current_end)
    }

    pub fn previous(&self) -> ResolvedWindow {
        ResolvedWindow::from_dates(self.previous_start, self.previous_end)
    }
}

/// Two back-to-back windows of equal length, the current one ending on the
/// anchor month's last day.
///
/// The previous window ends the day before the current one starts.
pub fn comparison_windows(
    anchor: &AnchorMonth,
    window_days: u32,
) -> AnalyticsResult<ComparisonWindows> {
    let current_end = month_end(anchor.year, anchor.month)?;
    let current_start = days_before(current_end, window_days)?;
    let previous_end = days_before(current_start, 1)?;
    let previous_start = days_before(previous_end, window_days)?;

    Ok(ComparisonWindows {
        current_start,
        current_end,
        previous_start,
        previous_end,
    })
}
