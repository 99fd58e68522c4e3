use clap::Parser;
use std::time::Duration;

use crate::read_model::{Pagination, QueryConfig, QueryError, Strategy, DEFAULT_BATCH_SIZE, DEFAULT_LIMIT};

// ============================================================================
// Application Configuration
// ============================================================================
//
// Flags fall back to environment variables, then to defaults. Without a
// database URL the binary reads from the seeded in-memory store.
//
// ============================================================================

#[derive(Debug, Clone, Parser)]
#[command(name = "order-read-model", about = "Read order aggregates with a chosen fetch strategy")]
pub struct AppConfig {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// eager-all | to-one-join-per-item | to-one-join-batched |
    /// projection-per-item | projection-batched | flat-join
    #[arg(long, default_value = "flat-join")]
    pub strategy: Strategy,

    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<i64>,

    #[arg(long, allow_hyphen_values = true)]
    pub limit: Option<i64>,

    /// Max order ids per item-loading round trip
    #[arg(long, env = "ORDER_QUERY_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Abort a query after this many milliseconds
    #[arg(long, env = "ORDER_QUERY_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl AppConfig {
    pub fn query_config(&self) -> Result<QueryConfig, QueryError> {
        QueryConfig::new(self.batch_size, self.timeout_ms.map(Duration::from_millis))
    }

    /// Pagination is requested when either bound is given; the other
    /// takes its default.
    pub fn pagination(&self) -> Option<Pagination> {
        if self.offset.is_none() && self.limit.is_none() {
            return None;
        }
        Some(Pagination::new(
            self.offset.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        ))
    }
}
