// ============================================================================
// Order Read Model
// ============================================================================
//
// Reads the order aggregate (order + member + delivery + items) into nested
// views using one of six fetch strategies that trade store round trips
// against pagination support.
//
// Layout:
// - domain/     value objects, store entities, read views
// - store/      relational read port + PostgreSQL and in-memory adapters
// - read_model/ repository, strategies, flat-row assembler, query service
// - metrics/    Prometheus registry and scrape endpoint
// - config      command line / environment configuration
//
// ============================================================================

pub mod config;
pub mod domain;
pub mod metrics;
pub mod read_model;
pub mod store;

pub use domain::order::{FlatRow, OrderHeader, OrderItemView, OrderView};
pub use read_model::{Pagination, QueryConfig, QueryError, QueryService, Strategy};
