//! Metric Registry: named aggregate expressions and their synonyms.
//!
//! Metrics are stored as expression trees, not SQL strings, so the same
//! definition renders correctly for every dialect (aggregate FILTER support
//! and function names differ).

use std::collections::HashMap;

use serde::Serialize;

use crate::sql::{
    case_when, cast, coalesce, col, count_star, count_where, lit_int, lit_null, paren, sum,
    Dialect, Expr, ExprExt, SelectExpr, SqlType,
};

/// What a weighted ratio yields when its denominator sums to zero.
///
/// Part of each metric's contract; a division error is never surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroDenominator {
    Zero,
    Null,
}

/// Broad shape of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum MetricKind {
    /// Row or quantity count.
    Count,
    /// Plain sum, zero when no rows match.
    Total,
    /// sum(numerator) / sum(denominator).
    WeightedRatio { on_zero: ZeroDenominator },
    /// Count of rows matching a business rule.
    FilteredCount,
}

/// A registered metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    pub name: &'static str,
    pub expr: Expr,
    pub kind: MetricKind,
    pub description: &'static str,
}

impl MetricDefinition {
    /// Column name the metric's value is returned under.
    pub fn output_alias(&self) -> &'static str {
        self.name
    }

    /// Select-list entry: `<expr> AS <name>`.
    pub fn select_expr(&self) -> SelectExpr {
        SelectExpr::new(self.expr.clone()).with_alias(self.output_alias())
    }
}

/// Metrics returned when a request names none.
pub const DEFAULT_METRICS: [&str; 3] = ["faturamento_total", "mc_total", "mc_percentual_ponderado"];

const METRIC_ALIASES: &[(&str, &str)] = &[
    ("faturamento_bruto", "faturamento_total"),
    ("receita", "faturamento_total"),
    ("receita_bruta", "faturamento_total"),
    ("mc_reais", "mc_total"),
    ("margem_reais", "mc_total"),
    ("margem", "mc_total"),
    ("lucro", "mc_total"),
    ("mc_percentual", "mc_percentual_ponderado"),
    ("mc%", "mc_percentual_ponderado"),
    ("margem_percentual", "mc_percentual_ponderado"),
    ("margem_%", "mc_percentual_ponderado"),
];

// =============================================================================
// Expression helpers
// =============================================================================

/// COALESCE(SUM(expr), 0)
fn total(expr: Expr) -> Expr {
    coalesce(vec![sum(expr), lit_int(0)])
}

/// CASE WHEN SUM(den) = 0 THEN <fallback> ELSE (SUM(num) / SUM(den)) END
fn weighted_ratio(numerator: Expr, denominator: Expr, on_zero: ZeroDenominator) -> Expr {
    let fallback = match on_zero {
        ZeroDenominator::Zero => lit_int(0),
        ZeroDenominator::Null => lit_null(),
    };
    case_when(
        vec![(sum(denominator.clone()).eq(lit_int(0)), fallback)],
        Some(paren(sum(numerator).div(sum(denominator)))),
    )
}

fn times_quantity(column: &str) -> Expr {
    col(column).mul(col("quantidade"))
}

fn discount_per_line() -> Expr {
    paren(col("preco_cheio").sub(col("preco_unitario"))).mul(col("quantidade"))
}

fn standard_metrics() -> Vec<MetricDefinition> {
    use MetricKind::*;
    use ZeroDenominator as Z;

    vec![
        MetricDefinition {
            name: "linhas",
            expr: cast(count_star(), SqlType::Integer),
            kind: Count,
            description: "Number of order lines",
        },
        MetricDefinition {
            name: "qtde_total",
            expr: cast(total(col("quantidade")), SqlType::Integer),
            kind: Count,
            description: "Units sold",
        },
        MetricDefinition {
            name: "faturamento_total",
            expr: total(col("faturamento")),
            kind: Total,
            description: "Revenue",
        },
        MetricDefinition {
            name: "mc_total",
            expr: total(col("mc")),
            kind: Total,
            description: "Contribution margin",
        },
        MetricDefinition {
            name: "cmv_total",
            expr: total(col("cmv")),
            kind: Total,
            description: "Cost of goods sold",
        },
        MetricDefinition {
            name: "mc_percentual_ponderado",
            expr: weighted_ratio(col("mc"), col("faturamento"), Z::Zero),
            kind: WeightedRatio { on_zero: Z::Zero },
            description: "Margin over revenue; 0 when revenue is 0",
        },
        MetricDefinition {
            name: "preco_medio_ponderado",
            expr: weighted_ratio(col("faturamento"), col("quantidade"), Z::Zero),
            kind: WeightedRatio { on_zero: Z::Zero },
            description: "Revenue per unit; 0 when quantity is 0",
        },
        MetricDefinition {
            name: "faturamento_preco_cheio_total",
            expr: total(times_quantity("preco_cheio")),
            kind: Total,
            description: "Revenue at list price",
        },
        MetricDefinition {
            name: "desconto_total",
            expr: total(discount_per_line()),
            kind: Total,
            description: "Discount granted below list price",
        },
        MetricDefinition {
            name: "desconto_percentual_ponderado",
            expr: weighted_ratio(discount_per_line(), times_quantity("preco_cheio"), Z::Zero),
            kind: WeightedRatio { on_zero: Z::Zero },
            description: "Discount over list-price revenue; 0 when list-price revenue is 0",
        },
        MetricDefinition {
            name: "custo_reposicao_total",
            expr: total(times_quantity("custo_reposicao")),
            kind: Total,
            description: "Replacement cost",
        },
        MetricDefinition {
            name: "markup_medio_ponderado",
            expr: weighted_ratio(col("faturamento"), times_quantity("custo_reposicao"), Z::Null),
            kind: WeightedRatio { on_zero: Z::Null },
            description: "Revenue over replacement cost; null when replacement cost is 0",
        },
        MetricDefinition {
            name: "qtd_abaixo_custo_reposicao",
            expr: cast(
                count_where(col("preco_unitario").lt(col("custo_reposicao"))),
                SqlType::Integer,
            ),
            kind: FilteredCount,
            description: "Lines sold below replacement cost",
        },
    ]
}

// =============================================================================
// Registry
// =============================================================================

/// Immutable metric table plus single-hop synonyms.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    metrics: HashMap<&'static str, MetricDefinition>,
    aliases: HashMap<&'static str, &'static str>,
}

impl MetricRegistry {
    pub fn standard() -> Self {
        let metrics = standard_metrics()
            .into_iter()
            .map(|m| (m.name, m))
            .collect();
        let aliases = METRIC_ALIASES.iter().copied().collect();
        Self { metrics, aliases }
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Canonical name for `name`; identity when no alias exists.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).copied().unwrap_or(name)
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.get(name)
    }

    pub fn expression(&self, name: &str) -> Option<&Expr> {
        self.get(name).map(|m| &m.expr)
    }

    /// Expression rendered as SQL text for `dialect`.
    pub fn expression_sql(&self, name: &str, dialect: Dialect) -> Option<String> {
        self.expression(name).map(|e| e.to_sql(dialect))
    }

    pub fn output_alias(&self, name: &str) -> Option<&'static str> {
        self.get(name).map(MetricDefinition::output_alias)
    }

    /// All metrics, sorted by name.
    pub fn metrics(&self) -> Vec<&MetricDefinition> {
        let mut all: Vec<_> = self.metrics.values().collect();
        all.sort_by_key(|m| m.name);
        all
    }

    /// All `(alias, canonical)` pairs, sorted by alias.
    pub fn aliases(&self) -> Vec<(&'static str, &'static str)> {
        let mut all: Vec<_> = self.aliases.iter().map(|(a, c)| (*a, *c)).collect();
        all.sort();
        all
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
