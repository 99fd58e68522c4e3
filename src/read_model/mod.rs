// ============================================================================
// Read Model - Order aggregate fetch engine
// ============================================================================
//
// - repository: store primitives over one snapshot, counts round trips
// - strategy:   six fetch strategies composed from those primitives
// - assembler:  flat join rows -> grouped, validated, sorted order views
// - service:    request validation, snapshot lifecycle, timeout, metrics
//
// ============================================================================

pub mod assembler;
pub mod errors;
pub mod pagination;
pub mod repository;
pub mod service;
pub mod strategy;

pub use assembler::{assemble, flatten};
pub use errors::QueryError;
pub use pagination::{Pagination, DEFAULT_LIMIT};
pub use repository::{AggregateRepository, ItemSource};
pub use service::{QueryConfig, QueryService, DEFAULT_BATCH_SIZE};
pub use strategy::Strategy;
