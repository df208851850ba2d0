//! Route handlers and the error-to-response mapping.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::server::AppState;
use crate::compare::run_comparison;
use crate::compile::effective_metrics;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::model::{
    AnalyticsQuery, ClientSegmentRequest, ClientSegmentResponse, CompareRequest,
    ComparisonOutcome, QueryResponse, RecurringClientsRequest, RecurringClientsResponse,
};
use crate::segments::{run_client_segment, run_recurring_clients};
use crate::time::ResolvedWindow;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

impl IntoResponse for AnalyticsError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            debug!(error = %self, "request rejected");
        } else {
            error!(error = %self, "request failed");
        }
        let body = json!({ "error": self.code(), "detail": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Malformed bodies are request errors, not axum's 422.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AnalyticsResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AnalyticsError::invalid_request(rejection.body_text()))
}

/// Reject requests without the configured API key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AnalyticsError> {
    if let Some(expected) = &state.api_key {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            warn!(path = %request.uri().path(), "missing or wrong API key");
            return Err(AnalyticsError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// POST /analytics/query
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyticsQuery>, JsonRejection>,
) -> AnalyticsResult<Json<QueryResponse>> {
    let query = body(payload)?;
    let prepared = state.compiler.prepare(query, (state.today)())?;
    let rows = state.executor.execute(&prepared.compiled).await?;

    Ok(Json(QueryResponse {
        time_resolved: ResolvedWindow {
            start: prepared.compiled.start,
            end: prepared.compiled.end,
        },
        metrics: effective_metrics(&prepared.query.metrics),
        group_by: prepared.query.group_by,
        rows,
    }))
}

/// POST /analytics/compare
pub async fn compare(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> AnalyticsResult<Json<ComparisonOutcome>> {
    let request = body(payload)?;
    let outcome = run_comparison(&state.compiler, state.executor.as_ref(), &request).await?;
    Ok(Json(outcome))
}

/// POST /segments/clients
pub async fn client_segment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClientSegmentRequest>, JsonRejection>,
) -> AnalyticsResult<Json<ClientSegmentResponse>> {
    let request = body(payload)?;
    let response = run_client_segment(
        &state.compiler,
        state.executor.as_ref(),
        &request,
        (state.today)(),
    )
    .await?;
    Ok(Json(response))
}

/// POST /clients/recurring
pub async fn recurring_clients(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecurringClientsRequest>, JsonRejection>,
) -> AnalyticsResult<Json<RecurringClientsResponse>> {
    let request = body(payload)?;
    let response = run_recurring_clients(&state.compiler, state.executor.as_ref(), &request).await?;
    Ok(Json(response))
}
