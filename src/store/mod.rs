// ============================================================================
// Order Store - Relational read port
// ============================================================================
//
// The read model never talks to a database directly. It opens one
// `OrderSnapshot` per query through `OrderStore::snapshot` and issues every
// read through it, so a header page and the items loaded for it always
// come from the same consistent view of the data.
//
// Adapters:
// - postgres: sqlx pool, one REPEATABLE READ / READ ONLY transaction per snapshot
// - memory:   cloned tables, used for fixtures, the demo binary and tests
//
// ============================================================================

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryOrderStore, StoreCall};
pub use postgres::PgOrderStore;

use async_trait::async_trait;

use crate::domain::order::{FlatRow, OrderHeader, OrderId, OrderLineRecord, OrderRecord, ProjectedItem};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// A validated offset/limit window over the order table.
///
/// Only `Pagination::validate` in the read model builds one, so adapters can
/// bind the values without re-checking them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    offset: i64,
    limit: i64,
}

impl Page {
    pub(crate) fn new_unchecked(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Apply the window to an already ordered sequence.
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        // offset and limit are non-negative once validated
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// One consistent read scope. All rows are returned in the store's defined
/// order: orders by id, lines by line id.
#[async_trait]
pub trait OrderSnapshot: Send {
    /// order ⋈ member ⋈ delivery ⟕ (order_item ⋈ item), one row per line.
    /// An order with no lines comes back once, with no line.
    async fn eager_join(&mut self) -> Result<Vec<(OrderRecord, Option<OrderLineRecord>)>, StoreError>;

    /// order ⋈ member ⋈ delivery. Never multiplies rows, so paging is exact.
    async fn to_one_join(&mut self, page: Option<Page>) -> Result<Vec<OrderRecord>, StoreError>;

    /// Order lines with their items for the given orders.
    async fn order_lines(&mut self, order_ids: &[OrderId]) -> Result<Vec<OrderLineRecord>, StoreError>;

    /// Header columns only, selected straight into the view shape.
    async fn header_projection(&mut self, page: Option<Page>) -> Result<Vec<OrderHeader>, StoreError>;

    /// Item view columns only, keyed by order.
    async fn item_projection(&mut self, order_ids: &[OrderId]) -> Result<Vec<ProjectedItem>, StoreError>;

    /// The wide header ⟕ item join as flat rows. Rows follow line id; orders
    /// without lines come last, in order id order.
    async fn flat_join(&mut self) -> Result<Vec<FlatRow>, StoreError>;

    /// End the scope. Dropping a snapshot without releasing it discards it.
    async fn release(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn snapshot(&self) -> Result<Box<dyn OrderSnapshot>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slice_past_end_is_empty() {
        let page = Page::new_unchecked(5, 2);
        let rows: Vec<i32> = (0..5).collect();
        assert!(page.slice(rows).is_empty());
    }

    #[test]
    fn test_page_slice_window() {
        let page = Page::new_unchecked(1, 2);
        assert_eq!(page.slice(vec![10, 20, 30, 40]), vec![20, 30]);
    }

    #[test]
    fn test_store_error_kind() {
        assert!(StoreError::Connection("refused".to_string()).is_connection());
        assert!(!StoreError::Query("syntax".to_string()).is_connection());
    }
}
