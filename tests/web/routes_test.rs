//! Integration tests for the HTTP routes.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{compiler, StubExecutor};
use pricing_analytics::error::AnalyticsError;
use pricing_analytics::web::{router, AppState, API_KEY_HEADER};

const KEY: &str = "s3cret";

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn app(executor: Arc<StubExecutor>, api_key: Option<&str>) -> Router {
    let state = AppState::new(compiler(), executor, api_key.map(str::to_string))
        .with_clock(fixed_today);
    router(Arc::new(state))
}

fn post(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(API_KEY_HEADER, KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(Arc::default(), Some(KEY)), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_missing_or_wrong_key() {
    let executor = Arc::new(StubExecutor::new());

    let request = Request::post("/analytics/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(app(executor.clone(), Some(KEY)), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("unauthorized"));

    let request = Request::post("/segments/clients")
        .header(header::CONTENT_TYPE, "application/json")
        .header(API_KEY_HEADER, "guess")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(app(executor.clone(), Some(KEY)), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_no_configured_key_allows_requests() {
    let request = Request::post("/analytics/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(app(Arc::default(), None), request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_query_defaults() {
    let executor = Arc::new(StubExecutor::new().with_rows(vec![json!({
        "faturamento_total": 1500.0,
        "mc_total": 300.0,
        "mc_percentual_ponderado": 0.2
    })]));

    let (status, body) = send(app(executor.clone(), Some(KEY)), post("/analytics/query", "{}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "time_resolved": {"start": "2024-04-01", "end": "2024-06-30"},
            "group_by": [],
            "metrics": ["faturamento_total", "mc_total", "mc_percentual_ponderado"],
            "rows": [{
                "faturamento_total": 1500.0,
                "mc_total": 300.0,
                "mc_percentual_ponderado": 0.2
            }]
        })
    );
    assert_eq!(executor.executed().len(), 1);
}

#[tokio::test]
async fn test_query_reports_canonical_names() {
    let executor = Arc::new(StubExecutor::new());
    let payload = json!({
        "time": {"mode": "range", "start": "2024-01-01", "end": "2024-01-31"},
        "filters": [{"field": "estado", "op": "=", "value": "SP"}],
        "group_by": ["estado"],
        "metrics": ["receita"]
    });

    let (status, body) = send(
        app(executor.clone(), Some(KEY)),
        post("/analytics/query", &payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["group_by"], json!(["uf"]));
    assert_eq!(body["metrics"], json!(["faturamento_total"]));
    assert_eq!(body["rows"], json!([]));
    assert!(executor.executed()[0].sql.contains(r#"GROUP BY "uf""#));
}

#[tokio::test]
async fn test_request_errors() {
    let cases = [
        ("{not json", "invalid_request"),
        (r#"{"group_by": ["regiao"]}"#, "invalid_field"),
        (r#"{"metrics": ["ebitda"]}"#, "invalid_metric"),
        (
            r#"{"filters": [{"field": "uf", "op": "~", "value": "SP"}]}"#,
            "invalid_operator",
        ),
        (r#"{"time": {"mode": "range", "start": "2024-01-01"}}"#, "invalid_request"),
    ];

    for (payload, code) in cases {
        let executor = Arc::new(StubExecutor::new());
        let (status, body) = send(app(executor.clone(), Some(KEY)), post("/analytics/query", payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["error"], json!(code), "{payload}");
        assert!(body["detail"].is_string());
        assert!(executor.executed().is_empty());
    }
}

#[tokio::test]
async fn test_execution_errors() {
    let executor = Arc::new(
        StubExecutor::new().with_error(AnalyticsError::ExecutionUnavailable("pool timed out".into())),
    );
    let (status, body) = send(app(executor, Some(KEY)), post("/analytics/query", "{}")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], json!("database_unavailable"));

    let executor = Arc::new(
        StubExecutor::new().with_error(AnalyticsError::Execution("division by zero".into())),
    );
    let (status, body) = send(app(executor, Some(KEY)), post("/analytics/query", "{}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("execution_failed"));
}

#[tokio::test]
async fn test_compare_route() {
    let executor = Arc::new(
        StubExecutor::new()
            .with_rows(vec![json!({"faturamento_total": 200})])
            .with_rows(vec![json!({"faturamento_total": 250})]),
    );
    let payload = json!({
        "anchor": {"type": "month", "year": 2024, "month": 2},
        "window_days": 28,
        "metric": "receita"
    });

    let (status, body) = send(
        app(executor.clone(), Some(KEY)),
        post("/analytics/compare", &payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "anchor": "2024-02",
            "metric": "faturamento_total",
            "current": {"start": "2024-02-01", "end": "2024-02-29", "value": 200.0},
            "previous": {"start": "2024-01-03", "end": "2024-01-31", "value": 250.0},
            "delta_abs": -50.0,
            "delta_pct": -0.2,
            "trend": "down"
        })
    );
    assert_eq!(executor.executed().len(), 2);
}

#[tokio::test]
async fn test_compare_rejects_quarter_anchor() {
    let payload = json!({"anchor": {"type": "quarter", "year": 2024, "month": 1}});
    let (status, body) = send(
        app(Arc::default(), Some(KEY)),
        post("/analytics/compare", &payload.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_request"));
}

#[tokio::test]
async fn test_segment_routes() {
    let executor = Arc::new(
        StubExecutor::new()
            .with_rows(vec![json!({"cliente": "ACME LTDA"})])
            .with_rows(vec![json!({"cliente": "ACME LTDA", "faturamento_total": 90000})]),
    );

    let (status, body) = send(
        app(executor.clone(), Some(KEY)),
        post("/segments/clients", r#"{"uf": "sp"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "time_resolved": {"start": "2024-04-01", "end": "2024-06-30"},
            "min_monthly_revenue": 40000.0,
            "uf": "SP",
            "clientes": ["ACME LTDA"]
        })
    );

    let (status, body) = send(
        app(executor.clone(), Some(KEY)),
        post("/clients/recurring", r#"{"year": 2024, "months": [2, 1]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "year": 2024,
            "months": [1, 2],
            "clientes": [{"cliente": "ACME LTDA", "faturamento_total": 90000.0}]
        })
    );
    assert_eq!(executor.executed().len(), 2);
}
