//! Request Normalizer.
//!
//! Rewrites every caller-supplied field and metric name to its canonical
//! form and wraps bare pattern values in `%` wildcards. Names that don't
//! resolve are left alone; the compiler rejects them against the whitelist.

use serde_json::Value;

use crate::catalog::{Catalog, FieldRegistry};
use crate::model::{AnalyticsQuery, FilterSpec};

/// SQL LIKE wildcard.
pub const WILDCARD: char = '%';

/// Normalize a whole request. Applying it twice equals applying it once.
pub fn normalize(mut query: AnalyticsQuery, catalog: &Catalog) -> AnalyticsQuery {
    normalize_filters(&mut query.filters, &catalog.fields);

    for field in &mut query.group_by {
        *field = catalog.fields.resolve_alias(field).to_string();
    }

    for metric in &mut query.metrics {
        *metric = catalog.metrics.resolve_alias(metric).to_string();
    }

    for having in &mut query.having {
        having.metric = catalog.metrics.resolve_alias(&having.metric).to_string();
    }

    for order in &mut query.order_by {
        order.metric = catalog.metrics.resolve_alias(&order.metric).to_string();
    }

    query
}

/// Resolve filter field aliases and add substring wildcards to patterns.
pub fn normalize_filters(filters: &mut [FilterSpec], fields: &FieldRegistry) {
    for filter in filters {
        filter.field = fields.resolve_alias(&filter.field).to_string();

        if filter.is_pattern() {
            if let Value::String(pattern) = &filter.value {
                if !pattern.contains(WILDCARD) {
                    filter.value = Value::String(format!("{WILDCARD}{pattern}{WILDCARD}"));
                }
            }
        }
    }
}
