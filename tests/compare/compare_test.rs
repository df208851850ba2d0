//! Integration tests for period comparisons.
//!
//! Statements run against a recording stub executor.

#[path = "../common/mod.rs"]
mod common;

use serde_json::json;

use common::{assert_valid_postgres, compiler, StubExecutor};
use pricing_analytics::compare::run_comparison;
use pricing_analytics::error::AnalyticsError;
use pricing_analytics::model::{
    AnchorMonth, CompareRequest, ComparisonOutcome, FilterSpec, Trend,
};
use pricing_analytics::sql::Param;

fn march_2024() -> CompareRequest {
    let mut request = CompareRequest::new(AnchorMonth::new(2024, 3));
    request.window_days = 30;
    request
}

#[tokio::test]
async fn test_scalar_comparison() {
    let executor = StubExecutor::new()
        .with_rows(vec![json!({"mc_percentual_ponderado": 0.25})])
        .with_rows(vec![json!({"mc_percentual_ponderado": 0.2})]);

    let outcome = run_comparison(&compiler(), &executor, &march_2024())
        .await
        .unwrap();
    let ComparisonOutcome::Scalar(result) = outcome else {
        panic!("expected a scalar comparison");
    };

    assert_eq!(result.anchor, "2024-03");
    assert_eq!(result.metric, "mc_percentual_ponderado");
    assert_eq!(
        (result.current.start.as_str(), result.current.end.as_str()),
        ("2024-03-01", "2024-03-31")
    );
    assert_eq!(
        (result.previous.start.as_str(), result.previous.end.as_str()),
        ("2024-01-30", "2024-02-29")
    );
    assert_eq!(result.trend, Trend::Up);
    assert!((result.delta_abs.unwrap() - 0.05).abs() < 1e-12);
    assert!((result.delta_pct.unwrap() - 0.25).abs() < 1e-12);
}

#[tokio::test]
async fn test_executes_current_then_previous() {
    let executor = StubExecutor::new();
    let mut request = march_2024();
    request.metric = "receita".into();
    request.filters = vec![FilterSpec::new("estado", "=", json!("SP"))];

    run_comparison(&compiler(), &executor, &request).await.unwrap();

    let executed = executor.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0].start, "2024-03-01");
    assert_eq!(executed[1].end, "2024-02-29");
    for query in &executed {
        assert!(query.sql.contains(r#"AS "faturamento_total""#));
        assert!(query.sql.contains(r#""uf" = $3"#));
        assert_eq!(query.params[2], Param::Text("SP".into()));
        assert_eq!(query.params.last(), Some(&Param::Int(1000)));
        assert_valid_postgres(&query.sql);
    }
}

#[tokio::test]
async fn test_missing_previous_row_is_undefined() {
    let executor = StubExecutor::new().with_rows(vec![json!({"mc_percentual_ponderado": 0.3})]);

    let outcome = run_comparison(&compiler(), &executor, &march_2024())
        .await
        .unwrap();
    let ComparisonOutcome::Scalar(result) = outcome else {
        panic!("expected a scalar comparison");
    };
    assert_eq!(result.previous.value, None);
    assert_eq!(result.delta_abs, None);
    assert_eq!(result.delta_pct, None);
    assert_eq!(result.trend, Trend::Undefined);
}

#[tokio::test]
async fn test_zero_previous_has_no_ratio() {
    let mut request = march_2024();
    request.metric = "faturamento_total".into();
    let executor = StubExecutor::new()
        .with_rows(vec![json!({"faturamento_total": 100})])
        .with_rows(vec![json!({"faturamento_total": 0})]);

    let outcome = run_comparison(&compiler(), &executor, &request).await.unwrap();
    let ComparisonOutcome::Scalar(result) = outcome else {
        panic!("expected a scalar comparison");
    };
    assert_eq!(result.delta_abs, Some(100.0));
    assert_eq!(result.delta_pct, None);
    assert_eq!(result.trend, Trend::Up);
}

#[tokio::test]
async fn test_grouped_comparison_wire_shape() {
    let mut request = march_2024();
    request.group_by = vec!["estado".into()];
    request.metric = "mc_total".into();
    let executor = StubExecutor::new()
        .with_rows(vec![
            json!({"uf": "SP", "mc_total": 10}),
            json!({"uf": "RJ", "mc_total": 5}),
        ])
        .with_rows(vec![json!({"uf": "SP", "mc_total": 10})]);

    let outcome = run_comparison(&compiler(), &executor, &request).await.unwrap();
    let body = serde_json::to_value(&outcome).unwrap();

    assert_eq!(body["anchor"], json!("2024-03"));
    assert_eq!(body["metric"], json!("mc_total"));
    assert_eq!(body["current"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["previous"]["start"], json!("2024-01-30"));
    assert_eq!(
        body["groups"],
        json!([
            {"key": {"uf": "SP"}, "current": 10.0, "previous": 10.0,
             "delta_abs": 0.0, "delta_pct": 0.0, "trend": "flat"},
            {"key": {"uf": "RJ"}, "current": 5.0, "previous": null,
             "delta_abs": null, "delta_pct": null, "trend": "undefined"}
        ])
    );
    assert!(body.get("trend").is_none());
}

#[tokio::test]
async fn test_invalid_requests_never_execute() {
    let executor = StubExecutor::new();

    let mut unknown_metric = march_2024();
    unknown_metric.metric = "ebitda".into();
    assert_eq!(
        run_comparison(&compiler(), &executor, &unknown_metric)
            .await
            .unwrap_err(),
        AnalyticsError::InvalidMetric("ebitda".into())
    );

    let mut bad_filter = march_2024();
    bad_filter.filters = vec![FilterSpec::new("uf", "~", json!("S"))];
    assert_eq!(
        run_comparison(&compiler(), &executor, &bad_filter)
            .await
            .unwrap_err(),
        AnalyticsError::InvalidOperator("~".into())
    );

    let mut bad_group = march_2024();
    bad_group.group_by = vec!["regiao".into()];
    assert!(matches!(
        run_comparison(&compiler(), &executor, &bad_group).await,
        Err(AnalyticsError::InvalidField(_))
    ));

    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_execution_failure_fails_request() {
    let executor = StubExecutor::new()
        .with_rows(vec![json!({"mc_percentual_ponderado": 0.1})])
        .with_error(AnalyticsError::ExecutionUnavailable("connection reset".into()));

    let err = run_comparison(&compiler(), &executor, &march_2024())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::ExecutionUnavailable(_)));
    assert_eq!(executor.executed().len(), 2);
}
