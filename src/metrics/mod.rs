// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for order reads
// ============================================================================
//
// Per strategy:
// - query outcomes (ok or error kind)
// - store round trips issued
// - orders returned
// - end-to-end query latency
//
// Registered on a private registry, scraped via /metrics when the server
// is started.
// ============================================================================

pub struct QueryMetrics {
    registry: Registry,

    pub queries_total: IntCounterVec,
    pub store_round_trips: IntCounterVec,
    pub orders_returned: IntCounterVec,
    pub query_duration: HistogramVec,
}

impl QueryMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let queries_total = IntCounterVec::new(
            Opts::new("order_queries_total", "Order read queries by strategy and outcome"),
            &["strategy", "outcome"],
        )?;
        registry.register(Box::new(queries_total.clone()))?;

        let store_round_trips = IntCounterVec::new(
            Opts::new("order_store_round_trips_total", "Store calls issued by successful queries"),
            &["strategy"],
        )?;
        registry.register(Box::new(store_round_trips.clone()))?;

        let orders_returned = IntCounterVec::new(
            Opts::new("order_views_returned_total", "Order aggregates returned to callers"),
            &["strategy"],
        )?;
        registry.register(Box::new(orders_returned.clone()))?;

        let query_duration = HistogramVec::new(
            HistogramOpts::new("order_query_duration_seconds", "Order read query duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["strategy"],
        )?;
        registry.register(Box::new(query_duration.clone()))?;

        Ok(Self {
            registry,
            queries_total,
            store_round_trips,
            orders_returned,
            query_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_success(&self, strategy: &str, round_trips: usize, orders: usize, duration_secs: f64) {
        self.queries_total.with_label_values(&[strategy, "ok"]).inc();
        self.store_round_trips
            .with_label_values(&[strategy])
            .inc_by(round_trips as u64);
        self.orders_returned.with_label_values(&[strategy]).inc_by(orders as u64);
        self.query_duration.with_label_values(&[strategy]).observe(duration_secs);
    }

    pub fn record_failure(&self, strategy: &str, error_kind: &str) {
        self.queries_total.with_label_values(&[strategy, error_kind]).inc();
    }
}
