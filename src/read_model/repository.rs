use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use crate::domain::order::{FlatRow, OrderHeader, OrderId, OrderItemView, OrderRecord, OrderView};
use crate::store::{OrderSnapshot, Page, StoreError};

// ============================================================================
// Aggregate Repository
// ============================================================================
//
// Thin layer over one store snapshot. Each method maps to a fixed number
// of store round trips, which it counts; none of them assembles anything
// beyond what the query shape requires.
//
// ============================================================================

/// Which shape item collections are loaded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    /// Order lines joined with full item entities, mapped to views.
    Entity,
    /// View columns selected directly.
    Projection,
}

pub struct AggregateRepository<'s> {
    snapshot: &'s mut dyn OrderSnapshot,
    round_trips: usize,
}

impl<'s> AggregateRepository<'s> {
    pub fn new(snapshot: &'s mut dyn OrderSnapshot) -> Self {
        Self {
            snapshot,
            round_trips: 0,
        }
    }

    /// Store calls issued through this repository so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Full graph in one outer join. Header rows repeat once per line, so
    /// headers are deduplicated here, keeping first-seen order.
    pub async fn fetch_all_eager_join(&mut self) -> Result<Vec<OrderView>, StoreError> {
        self.round_trips += 1;
        let rows = self.snapshot.eager_join().await?;
        let row_count = rows.len();

        let mut index: HashMap<OrderId, usize> = HashMap::new();
        let mut views: Vec<OrderView> = Vec::new();

        for (record, line) in rows {
            let slot = *index.entry(record.id()).or_insert_with(|| {
                views.push(OrderView::new(record.header(), Vec::new()));
                views.len() - 1
            });
            if let Some(line) = line {
                views[slot].items.push(line.view());
            }
        }

        tracing::debug!(rows = row_count, orders = views.len(), "Deduplicated eager join");
        Ok(views)
    }

    pub async fn fetch_to_one_join_paged(&mut self, page: Page) -> Result<Vec<OrderRecord>, StoreError> {
        self.round_trips += 1;
        self.snapshot.to_one_join(Some(page)).await
    }

    pub async fn fetch_to_one_join_all(&mut self) -> Result<Vec<OrderRecord>, StoreError> {
        self.round_trips += 1;
        self.snapshot.to_one_join(None).await
    }

    pub async fn fetch_header_projection(&mut self, page: Option<Page>) -> Result<Vec<OrderHeader>, StoreError> {
        self.round_trips += 1;
        self.snapshot.header_projection(page).await
    }

    /// Load item collections in chunks of at most `batch_size` order ids,
    /// one store call per chunk: `ceil(ids / batch_size)` calls, none for
    /// an empty set. Duplicate ids are collapsed first.
    pub async fn batch_load_items(
        &mut self,
        order_ids: &[OrderId],
        batch_size: NonZeroUsize,
        source: ItemSource,
    ) -> Result<HashMap<OrderId, Vec<OrderItemView>>, StoreError> {
        let mut seen = HashSet::new();
        let ids: Vec<OrderId> = order_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut items: HashMap<OrderId, Vec<OrderItemView>> = HashMap::new();
        let mut chunks = 0;

        for chunk in ids.chunks(batch_size.get()) {
            self.round_trips += 1;
            chunks += 1;

            match source {
                ItemSource::Entity => {
                    for record in self.snapshot.order_lines(chunk).await? {
                        items.entry(record.order_id()).or_default().push(record.view());
                    }
                }
                ItemSource::Projection => {
                    for projected in self.snapshot.item_projection(chunk).await? {
                        items.entry(projected.order_id).or_default().push(projected.item);
                    }
                }
            }
        }

        tracing::debug!(
            orders = ids.len(),
            batch_size = batch_size.get(),
            chunks,
            ?source,
            "Loaded item collections"
        );
        Ok(items)
    }

    pub async fn fetch_flat_join(&mut self) -> Result<Vec<FlatRow>, StoreError> {
        self.round_trips += 1;
        self.snapshot.flat_join().await
    }
}

/// Pair each header with its loaded items, keeping header order.
pub fn attach_items(
    headers: Vec<OrderHeader>,
    mut items: HashMap<OrderId, Vec<OrderItemView>>,
) -> Vec<OrderView> {
    headers
        .into_iter()
        .map(|header| {
            let order_items = items.remove(&header.order_id).unwrap_or_default();
            OrderView::new(header, order_items)
        })
        .collect()
}
