use std::time::Duration;

use super::strategy::Strategy;
use crate::domain::order::OrderId;
use crate::store::StoreError;

// ============================================================================
// Read Model Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("Order store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Order {order_id} has inconsistent header field `{field}` across flat rows")]
    AggregationInconsistency { order_id: OrderId, field: &'static str },

    #[error("Strategy {0} cannot honor pagination")]
    UnsupportedPagination(Strategy),

    #[error("Invalid pagination: offset={offset}, limit={limit} (offset must be >= 0, limit > 0)")]
    InvalidPaginationParams { offset: i64, limit: i64 },

    #[error("Invalid query configuration: {0}")]
    InvalidConfig(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

impl QueryError {
    /// Errors raised before any store call was made.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            QueryError::UnsupportedPagination(_)
                | QueryError::InvalidPaginationParams { .. }
                | QueryError::InvalidConfig(_)
        )
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::StoreUnavailable(_) => "store_unavailable",
            QueryError::AggregationInconsistency { .. } => "aggregation_inconsistency",
            QueryError::UnsupportedPagination(_) => "unsupported_pagination",
            QueryError::InvalidPaginationParams { .. } => "invalid_pagination",
            QueryError::InvalidConfig(_) => "invalid_config",
            QueryError::Timeout(_) => "timeout",
        }
    }
}
