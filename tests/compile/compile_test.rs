//! Integration tests for request compilation to parameterized SQL.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use common::{assert_valid_postgres, compiler, placeholder_count};
use pricing_analytics::catalog::Catalog;
use pricing_analytics::compile::{CompileOptions, QueryCompiler};
use pricing_analytics::error::AnalyticsError;
use pricing_analytics::model::{AnalyticsQuery, FilterSpec, OrderBy, SortOrder, TimeWindow};
use pricing_analytics::sql::{Dialect, Param};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> Param {
    Param::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn request(body: serde_json::Value) -> AnalyticsQuery {
    serde_json::from_value(body).unwrap()
}

#[test]
fn test_range_revenue_scenario() {
    let query = request(json!({
        "time": {"mode": "range", "start": "2024-01-01", "end": "2024-01-31"},
        "metrics": ["faturamento_total"]
    }));
    let compiled = compiler().prepare(query, today()).unwrap().compiled;

    assert!(compiled
        .sql
        .contains(r#"COALESCE(SUM("faturamento"), 0) AS "faturamento_total""#));
    assert!(compiled.sql.contains(r#""emissao" BETWEEN $1 AND $2"#));
    assert_eq!(compiled.params[0], date(2024, 1, 1));
    assert_eq!(compiled.params[1], date(2024, 1, 31));
    assert_eq!(compiled.params.last(), Some(&Param::Int(200)));
    assert_valid_postgres(&compiled.sql);
}

#[test]
fn test_alias_filter_scenario() {
    let query = request(json!({
        "time": {"mode": "range", "start": "2024-01-01", "end": "2024-01-31"},
        "filters": [{"field": "nota", "op": "=", "value": 5}]
    }));
    let prepared = compiler().prepare(query, today()).unwrap();

    assert_eq!(prepared.query.filters[0].field, "nota_fiscal");
    assert!(prepared.compiled.sql.contains(r#""nota_fiscal" = $3"#));
    assert_eq!(prepared.compiled.params[2], Param::Int(5));
}

#[test]
fn test_rolling_window_uses_today() {
    let query = request(json!({"time": {"mode": "rolling", "days": 30}}));
    let compiled = compiler().prepare(query, today()).unwrap().compiled;
    assert_eq!(compiled.start, "2024-05-31");
    assert_eq!(compiled.end, "2024-06-30");
    assert_eq!(compiled.params[0], date(2024, 5, 31));
}

#[test]
fn test_empty_request_uses_defaults() {
    let compiled = compiler()
        .prepare(AnalyticsQuery::default(), today())
        .unwrap()
        .compiled;
    assert_eq!(compiled.start, "2024-04-01");
    assert_eq!(compiled.params.len(), 3);
    assert!(compiled.sql.contains(r#"AS "mc_percentual_ponderado""#));
}

#[test]
fn test_in_filter_placeholder_count() {
    for n in 1..=6 {
        let values: Vec<String> = (0..n).map(|i| format!("cliente {i}")).collect();
        let query = AnalyticsQuery {
            time: TimeWindow::range("2024-01-01", "2024-01-31"),
            filters: vec![FilterSpec::new("cliente", "in", json!(values))],
            ..AnalyticsQuery::default()
        };
        let compiled = compiler().prepare(query, today()).unwrap().compiled;

        // window bounds + IN values + LIMIT
        assert_eq!(compiled.params.len(), 2 + n + 1);
        assert_eq!(placeholder_count(&compiled.sql), compiled.params.len());
        for (i, value) in values.iter().enumerate() {
            assert_eq!(compiled.params[2 + i], Param::Text(value.clone()));
        }
    }
}

#[test]
fn test_between_length_must_be_two() {
    for value in [json!([]), json!([1]), json!([1, 2, 3])] {
        let query = AnalyticsQuery {
            filters: vec![FilterSpec::new("preco_unitario", "between", value)],
            ..AnalyticsQuery::default()
        };
        assert!(matches!(
            compiler().prepare(query, today()),
            Err(AnalyticsError::InvalidRequest(_))
        ));
    }
}

#[test]
fn test_like_values_are_wrapped() {
    let query = AnalyticsQuery {
        filters: vec![
            FilterSpec::new("produto", "ilike", json!("crio")),
            FilterSpec::new("marca", "like", json!("ACME%")),
        ],
        ..AnalyticsQuery::default()
    };
    let prepared = compiler().prepare(query, today()).unwrap();
    assert_eq!(prepared.compiled.params[2], Param::Text("%crio%".into()));
    assert_eq!(prepared.compiled.params[3], Param::Text("ACME%".into()));
    assert_valid_postgres(&prepared.compiled.sql);
}

#[test]
fn test_caller_values_never_reach_sql_text() {
    let hostile = "x'; DROP TABLE pedido_item; --";
    let query = AnalyticsQuery {
        filters: vec![
            FilterSpec::new("cliente", "=", json!(hostile)),
            FilterSpec::new("uf", "like", json!(hostile)),
        ],
        ..AnalyticsQuery::default()
    };
    let compiled = compiler().prepare(query, today()).unwrap().compiled;
    assert!(!compiled.sql.contains("DROP"));
    assert!(compiled.params.contains(&Param::Text(hostile.into())));
}

#[test]
fn test_unknown_group_by_fails_whole_request() {
    let query = request(json!({
        "group_by": ["uf", "regiao"],
        "metrics": ["receita"]
    }));
    assert_eq!(
        compiler().prepare(query, today()).unwrap_err(),
        AnalyticsError::InvalidField("regiao".into())
    );
}

#[test]
fn test_order_by_alias_and_direction() {
    let query = AnalyticsQuery {
        group_by: vec!["vendedor".into()],
        metrics: vec!["margem".into()],
        order_by: vec![OrderBy {
            metric: "lucro".into(),
            dir: SortOrder::Asc,
        }],
        ..AnalyticsQuery::default()
    };
    let compiled = compiler().prepare(query, today()).unwrap().compiled;
    assert!(compiled
        .sql
        .contains(r#"ORDER BY COALESCE(SUM("mc"), 0) ASC"#));
}

#[test]
fn test_schema_qualified_table() {
    let compiler = QueryCompiler::new(
        Arc::new(Catalog::standard()),
        CompileOptions::default().with_table("vendas.pedido_item"),
    );
    let compiled = compiler
        .prepare(AnalyticsQuery::default(), today())
        .unwrap()
        .compiled;
    assert!(compiled.sql.contains(r#"FROM "vendas"."pedido_item""#));
    assert_valid_postgres(&compiled.sql);
}

#[test]
fn test_duckdb_and_ansi_rendering() {
    let duckdb = QueryCompiler::new(
        Arc::new(Catalog::standard()),
        CompileOptions::default().with_dialect(Dialect::DuckDb),
    );
    let query = AnalyticsQuery {
        filters: vec![FilterSpec::new("cliente", "like", json!("são"))],
        ..AnalyticsQuery::default()
    };
    let compiled = duckdb.prepare(query.clone(), today()).unwrap().compiled;
    assert!(compiled
        .sql
        .contains(r#"STRIP_ACCENTS(LOWER("cliente")) LIKE STRIP_ACCENTS(LOWER(?))"#));
    assert!(compiled.sql.ends_with("LIMIT ?"));

    let ansi = QueryCompiler::new(
        Arc::new(Catalog::standard()),
        CompileOptions::default().with_dialect(Dialect::Ansi),
    );
    let compiled = ansi.prepare(query, today()).unwrap().compiled;
    assert!(compiled.sql.ends_with("FETCH FIRST ? ROWS ONLY"));
    assert_eq!(compiled.dialect, Dialect::Ansi);
}

#[test]
fn test_compiled_query_serializes_params() {
    let query = AnalyticsQuery {
        time: TimeWindow::range("2024-01-01", "2024-01-31"),
        filters: vec![FilterSpec::new("quantidade", ">", json!(2.5))],
        limit: 10,
        ..AnalyticsQuery::default()
    };
    let compiled = compiler().prepare(query, today()).unwrap().compiled;
    let value = serde_json::to_value(&compiled).unwrap();
    assert_eq!(
        value["params"],
        json!(["2024-01-01", "2024-01-31", 2.5, 10])
    );
    assert_eq!(value["start"], json!("2024-01-01"));
    assert!(value.get("dialect").is_none());
}
