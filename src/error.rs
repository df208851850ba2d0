//! Error taxonomy shared by every analytics operation.

use axum::http::StatusCode;
use thiserror::Error;

/// Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Errors surfaced to callers of the analytics service.
///
/// Validation errors are raised before any statement reaches the database.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Malformed request: bad dates, missing range bounds, wrong value shapes.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A field name outside the whitelist after alias resolution.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// A metric name outside the registry after alias resolution.
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    /// A filter or HAVING operator outside the supported set.
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    /// Missing or mismatched API key.
    #[error("invalid or missing API key")]
    Unauthorized,

    /// The backing database could not be reached.
    #[error("database unavailable: {0}")]
    ExecutionUnavailable(String),

    /// The database rejected or failed the statement.
    #[error("query execution failed: {0}")]
    Execution(String),
}

impl AnalyticsError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidField(_) => "invalid_field",
            Self::InvalidMetric(_) => "invalid_metric",
            Self::InvalidOperator(_) => "invalid_operator",
            Self::Unauthorized => "unauthorized",
            Self::ExecutionUnavailable(_) => "database_unavailable",
            Self::Execution(_) => "execution_failed",
        }
    }

    /// HTTP status surfaced for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_)
            | Self::InvalidField(_)
            | Self::InvalidMetric(_)
            | Self::InvalidOperator(_) => StatusCode::BAD_REQUEST,
            Self::ExecutionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::ExecutionUnavailable(_) | Self::Execution(_))
    }
}
