use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::errors::QueryError;
use super::pagination::Pagination;
use super::repository::AggregateRepository;
use super::strategy::Strategy;
use crate::domain::order::{OrderView, ResponseEnvelope};
use crate::metrics::QueryMetrics;
use crate::store::{OrderStore, Page};

// ============================================================================
// Query Service
// ============================================================================
//
// Orchestrates: validate request → open snapshot → strategy → release
//
// Pagination problems are rejected before the store is touched. Each call
// runs in its own snapshot and keeps no state between calls, so a failed
// query can simply be reissued.
//
// ============================================================================

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// Upper bound on order ids per item-loading round trip.
    pub batch_size: NonZeroUsize,
    /// Deadline for a whole `query` call, snapshot included.
    pub timeout: Option<Duration>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            timeout: None,
        }
    }
}

impl QueryConfig {
    pub fn new(batch_size: usize, timeout: Option<Duration>) -> Result<Self, QueryError> {
        let batch_size = NonZeroUsize::new(batch_size)
            .ok_or_else(|| QueryError::InvalidConfig("batch size must be greater than zero".to_string()))?;

        if timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(QueryError::InvalidConfig("timeout must be greater than zero".to_string()));
        }

        Ok(Self { batch_size, timeout })
    }
}

pub struct QueryService {
    store: Arc<dyn OrderStore>,
    config: QueryConfig,
    metrics: Option<Arc<QueryMetrics>>,
}

impl QueryService {
    pub fn new(store: Arc<dyn OrderStore>, config: QueryConfig) -> Self {
        Self {
            store,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<QueryMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Read order aggregates with the chosen strategy.
    pub async fn query(
        &self,
        strategy: Strategy,
        pagination: Option<Pagination>,
    ) -> Result<Vec<OrderView>, QueryError> {
        let query_id = Uuid::new_v4();
        let started = Instant::now();

        let result = match Self::validate(strategy, pagination) {
            Ok(page) => self.run_with_deadline(strategy, page).await,
            Err(error) => Err(error),
        };
        let elapsed = started.elapsed();

        match &result {
            Ok((views, round_trips)) => {
                tracing::info!(
                    query_id = %query_id,
                    strategy = %strategy,
                    round_trips = *round_trips,
                    orders = views.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Order query completed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_success(strategy.name(), *round_trips, views.len(), elapsed.as_secs_f64());
                }
            }
            Err(error) => {
                if error.is_rejected_request() {
                    tracing::warn!(query_id = %query_id, strategy = %strategy, error = %error, "Order query rejected");
                } else {
                    tracing::error!(query_id = %query_id, strategy = %strategy, error = %error, "Order query failed");
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(strategy.name(), error.kind());
                }
            }
        }

        result.map(|(views, _)| views)
    }

    /// Same as [`QueryService::query`], wrapped in the `{"data": ...}` envelope.
    pub async fn query_envelope(
        &self,
        strategy: Strategy,
        pagination: Option<Pagination>,
    ) -> Result<ResponseEnvelope<Vec<OrderView>>, QueryError> {
        self.query(strategy, pagination).await.map(ResponseEnvelope::new)
    }

    fn validate(strategy: Strategy, pagination: Option<Pagination>) -> Result<Option<Page>, QueryError> {
        match pagination {
            None => Ok(None),
            Some(_) if !strategy.supports_pagination() => Err(QueryError::UnsupportedPagination(strategy)),
            Some(pagination) => pagination.validate().map(Some),
        }
    }

    async fn run_with_deadline(
        &self,
        strategy: Strategy,
        page: Option<Page>,
    ) -> Result<(Vec<OrderView>, usize), QueryError> {
        match self.config.timeout {
            // on expiry the run future is dropped mid-flight, taking the
            // snapshot (and its transaction) with it
            Some(limit) => tokio::time::timeout(limit, self.run(strategy, page))
                .await
                .unwrap_or(Err(QueryError::Timeout(limit))),
            None => self.run(strategy, page).await,
        }
    }

    async fn run(&self, strategy: Strategy, page: Option<Page>) -> Result<(Vec<OrderView>, usize), QueryError> {
        let mut snapshot = self.store.snapshot().await?;

        let mut repo = AggregateRepository::new(snapshot.as_mut());
        let views = strategy.execute(&mut repo, page, self.config.batch_size).await?;
        let round_trips = repo.round_trips();

        snapshot.release().await?;
        Ok((views, round_trips))
    }
}
