//! Integration tests for the field and metric catalog.

#[path = "../common/mod.rs"]
mod common;

use common::{assert_valid_postgres, compiler};
use pricing_analytics::catalog::{Catalog, MetricKind, ZeroDenominator, DEFAULT_METRICS};
use pricing_analytics::model::{AnalyticsQuery, TimeWindow};
use pricing_analytics::sql::Dialect;
use pricing_analytics::time::ResolvedWindow;

#[test]
fn test_every_alias_targets_a_registered_name() {
    let catalog = Catalog::standard();

    for (alias, target) in catalog.fields.aliases() {
        assert!(catalog.fields.is_allowed(target), "{alias} -> {target}");
        assert!(!catalog.fields.is_allowed(alias), "alias {alias} shadows a field");
    }
    for (alias, target) in catalog.metrics.aliases() {
        assert!(catalog.metrics.is_known(target), "{alias} -> {target}");
        assert!(!catalog.metrics.is_known(alias), "alias {alias} shadows a metric");
    }
}

#[test]
fn test_alias_resolution_is_idempotent() {
    let catalog = Catalog::standard();
    let names = ["nota", "nf", "estado", "uf", "sku", "desconhecido", ""];
    for name in names {
        let once = catalog.fields.resolve_alias(name);
        assert_eq!(catalog.fields.resolve_alias(once), once);
    }

    let metrics = ["receita", "lucro", "mc%", "mc_total", "linhas", "ebitda"];
    for name in metrics {
        let once = catalog.metrics.resolve_alias(name);
        assert_eq!(catalog.metrics.resolve_alias(once), once);
    }
}

#[test]
fn test_default_metrics_are_registered() {
    let catalog = Catalog::standard();
    for name in DEFAULT_METRICS {
        assert!(catalog.metrics.is_known(name));
    }
}

#[test]
fn test_every_metric_expression_is_valid_sql() {
    let catalog = Catalog::standard();
    for metric in catalog.metrics.metrics() {
        let expr = catalog
            .metrics
            .expression_sql(metric.name, Dialect::Postgres)
            .unwrap();
        assert_valid_postgres(&format!("SELECT {expr} FROM pedido_item"));
    }
}

#[test]
fn test_weighted_ratios_guard_zero_denominators() {
    let catalog = Catalog::standard();
    for metric in catalog.metrics.metrics() {
        let MetricKind::WeightedRatio { on_zero } = metric.kind else {
            continue;
        };
        let sql = catalog
            .metrics
            .expression_sql(metric.name, Dialect::Postgres)
            .unwrap();
        let fallback = match on_zero {
            ZeroDenominator::Zero => "= 0 THEN 0 ELSE",
            ZeroDenominator::Null => "= 0 THEN NULL ELSE",
        };
        assert!(sql.starts_with("CASE WHEN SUM("), "{sql}");
        assert!(sql.contains(fallback), "{}: {sql}", metric.name);
    }
}

#[test]
fn test_all_metrics_in_one_statement() {
    let catalog = Catalog::standard();
    let query = AnalyticsQuery {
        time: TimeWindow::range("2024-01-01", "2024-12-31"),
        group_by: vec!["marca".into(), "categoria".into()],
        metrics: catalog
            .metrics
            .metrics()
            .iter()
            .map(|m| m.name.to_string())
            .collect(),
        ..AnalyticsQuery::default()
    };
    let window = ResolvedWindow {
        start: "2024-01-01".into(),
        end: "2024-12-31".into(),
    };
    let compiled = compiler().compile(&query, &window).unwrap();

    for metric in catalog.metrics.metrics() {
        assert!(compiled.sql.contains(&format!("AS \"{}\"", metric.name)));
    }
    assert_valid_postgres(&compiled.sql);
}

#[test]
fn test_field_kinds_cover_every_field() {
    let catalog = Catalog::standard();
    let fields = catalog.fields.fields();
    assert_eq!(fields.len(), 17);
    for field in fields {
        assert_eq!(catalog.fields.kind(field.name), Some(field.kind));
    }
}
