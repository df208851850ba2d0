//! Read-only registries of what callers may reference.
//!
//! Built once at startup and shared behind an `Arc`; nothing mutates them
//! afterwards.

pub mod fields;
pub mod metrics;

pub use fields::{FieldDefinition, FieldKind, FieldRegistry};
pub use metrics::{MetricDefinition, MetricKind, MetricRegistry, ZeroDenominator, DEFAULT_METRICS};

/// Field and metric registries bundled together.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub fields: FieldRegistry,
    pub metrics: MetricRegistry,
}

impl Catalog {
    pub fn standard() -> Self {
        Self {
            fields: FieldRegistry::standard(),
            metrics: MetricRegistry::standard(),
        }
    }
}
