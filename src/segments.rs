//! Client reports built on monthly revenue per client.
//!
//! Both reports share one CTE, `mensal`, holding one row per client and
//! calendar month:
//!
//! ```text
//! WITH mensal AS (cliente, mes, faturamento_mes)
//!   segment:   clients with any month >= threshold
//!   recurring: clients present in every requested month
//! ```

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::compile::{CompiledQuery, QueryCompiler};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::executor::{QueryExecutor, Row};
use crate::model::reports::non_empty;
use crate::model::{
    is_valid_uf, ClientSegmentRequest, ClientSegmentResponse, RecurringClient,
    RecurringClientsRequest, RecurringClientsResponse,
};
use crate::sql::{
    cast, col, count_distinct, date_trunc, sum, Cte, Expr, ExprExt, OrderByExpr, Param, Params,
    Query, SelectExpr, SqlType, TableRef,
};
use crate::time::{self, ResolvedWindow};

const MONTHLY_CTE: &str = "mensal";
const CLIENT: &str = "cliente";
const MONTH: &str = "mes";
const MONTHLY_REVENUE: &str = "faturamento_mes";
const TOTAL_REVENUE: &str = "faturamento_total";

/// Upper-cased state code, `None` when absent or blank.
pub fn validate_uf(uf: &Option<String>) -> AnalyticsResult<Option<String>> {
    match non_empty(uf) {
        None => Ok(None),
        Some(code) => {
            let code = code.to_uppercase();
            if is_valid_uf(&code) {
                Ok(Some(code))
            } else {
                Err(AnalyticsError::invalid_request(format!(
                    "invalid uf '{code}', expected a Brazilian state code"
                )))
            }
        }
    }
}

/// Sorted, deduplicated months; each must be within 1..=12.
pub fn recurring_months(months: &[u32]) -> AnalyticsResult<Vec<u32>> {
    let mut months = months.to_vec();
    months.sort_unstable();
    months.dedup();
    if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
        return Err(AnalyticsError::invalid_request(format!(
            "month must be between 1 and 12, got {bad}"
        )));
    }
    Ok(months)
}

impl QueryCompiler {
    /// `CAST(DATE_TRUNC('month', <date_column>) AS DATE)`
    fn month_of_date(&self) -> Expr {
        cast(
            date_trunc("month", col(&self.options().date_column)),
            SqlType::Date,
        )
    }

    /// Revenue per client and month over `window`, optionally restricted to
    /// the months starting on `months`.
    fn monthly_revenue(
        &self,
        window: &ResolvedWindow,
        months: &[NaiveDate],
        uf: Option<&str>,
        params: &mut Params,
    ) -> AnalyticsResult<Cte> {
        let mut query = Query::new()
            .select(vec![
                SelectExpr::new(col(CLIENT)),
                SelectExpr::new(self.month_of_date()).with_alias(MONTH),
                SelectExpr::new(sum(col("faturamento"))).with_alias(MONTHLY_REVENUE),
            ])
            .from(self.options().table.clone())
            .filter(self.window_predicate(window, params)?);

        if !months.is_empty() {
            let slots: Vec<Expr> = months.iter().map(|&m| params.push(m)).collect();
            query = query.filter(self.month_of_date().in_list(slots));
        }
        if let Some(uf) = uf {
            query = query.filter(col("uf").eq(params.push(uf)));
        }

        Ok(Cte::new(
            MONTHLY_CTE,
            query.group_by(vec![col(CLIENT), self.month_of_date()]),
        ))
    }

    /// Clients whose revenue reached `min_monthly_revenue` in at least one
    /// month of the window.
    pub fn compile_client_segment(
        &self,
        request: &ClientSegmentRequest,
        today: NaiveDate,
    ) -> AnalyticsResult<CompiledQuery> {
        let uf = validate_uf(&request.uf)?;
        let window = time::resolve_window(&request.time, today)?;

        let mut params = Params::new();
        let monthly = self.monthly_revenue(&window, &[], uf.as_deref(), &mut params)?;
        let threshold = params.push(Param::Float(request.min_monthly_revenue));

        let query = Query::new()
            .with_cte(monthly)
            .select(vec![col(CLIENT)])
            .distinct()
            .from(TableRef::new(MONTHLY_CTE))
            .filter(col(MONTHLY_REVENUE).gte(threshold))
            .order_by(vec![OrderByExpr::asc(col(CLIENT))]);

        Ok(self.finish(&query, params, &window))
    }

    /// Clients with revenue in every requested month of `year`.
    ///
    /// `None` when no months are requested; there is nothing to run.
    pub fn compile_recurring_clients(
        &self,
        request: &RecurringClientsRequest,
    ) -> AnalyticsResult<Option<CompiledQuery>> {
        let months = recurring_months(&request.months)?;
        let uf = validate_uf(&request.uf)?;
        let (Some(&first), Some(&last)) = (months.first(), months.last()) else {
            return Ok(None);
        };

        let window = ResolvedWindow::from_dates(
            time::month_start(request.year, first)?,
            time::month_end(request.year, last)?,
        );

        let month_starts = months
            .iter()
            .map(|&month| time::month_start(request.year, month))
            .collect::<AnalyticsResult<Vec<_>>>()?;

        let mut params = Params::new();
        let monthly = self.monthly_revenue(&window, &month_starts, uf.as_deref(), &mut params)?;

        let month_count = params.push(Param::Int(months.len() as i64));
        let mut query = Query::new()
            .with_cte(monthly)
            .select(vec![
                SelectExpr::new(col(CLIENT)),
                SelectExpr::new(sum(col(MONTHLY_REVENUE))).with_alias(TOTAL_REVENUE),
            ])
            .from(TableRef::new(MONTHLY_CTE))
            .group_by(vec![col(CLIENT)])
            .having(count_distinct(col(MONTH)).eq(month_count));

        if let Some(min_total) = request.min_total_revenue {
            let threshold = params.push(Param::Float(min_total));
            query = query.having(sum(col(MONTHLY_REVENUE)).gte(threshold));
        }

        let query = query.order_by(vec![OrderByExpr::desc(col(TOTAL_REVENUE))]);
        Ok(Some(self.finish(&query, params, &window)))
    }
}

// ============================================================================
// Execution
// ============================================================================

fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn number(row: &Row, column: &str) -> f64 {
    match row.get(column) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}

pub async fn run_client_segment(
    compiler: &QueryCompiler,
    executor: &dyn QueryExecutor,
    request: &ClientSegmentRequest,
    today: NaiveDate,
) -> AnalyticsResult<ClientSegmentResponse> {
    let uf = validate_uf(&request.uf)?;
    let compiled = compiler.compile_client_segment(request, today)?;
    let rows = executor.execute(&compiled).await?;
    debug!(clients = rows.len(), "client segment");

    Ok(ClientSegmentResponse {
        time_resolved: ResolvedWindow {
            start: compiled.start,
            end: compiled.end,
        },
        min_monthly_revenue: request.min_monthly_revenue,
        uf,
        clientes: rows.iter().filter_map(|row| text(row, CLIENT)).collect(),
    })
}

pub async fn run_recurring_clients(
    compiler: &QueryCompiler,
    executor: &dyn QueryExecutor,
    request: &RecurringClientsRequest,
) -> AnalyticsResult<RecurringClientsResponse> {
    let months = recurring_months(&request.months)?;
    let clientes = match compiler.compile_recurring_clients(request)? {
        Some(compiled) => executor
            .execute(&compiled)
            .await?
            .iter()
            .filter_map(|row| {
                Some(RecurringClient {
                    cliente: text(row, CLIENT)?,
                    faturamento_total: number(row, TOTAL_REVENUE),
                })
            })
            .collect(),
        None => Vec::new(),
    };
    debug!(clients = clientes.len(), "recurring clients");

    Ok(RecurringClientsResponse {
        year: request.year,
        months,
        clientes,
    })
}
